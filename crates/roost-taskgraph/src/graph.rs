use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use crate::error::{GraphError, TaskError};

/// Resolved values of a task's declared dependencies, keyed by node name.
///
/// A task sees exactly the nodes it declared, never sibling or descendant
/// values.
pub type TaskInputs<T> = HashMap<String, T>;

/// Boxed future returned by a task's execution function.
pub type TaskFuture<T, E> = Pin<Box<dyn Future<Output = Result<T, TaskError<E>>> + Send>>;

type TaskFn<T, E> = Box<dyn Fn(TaskInputs<T>) -> TaskFuture<T, E> + Send + Sync>;

pub(crate) struct TaskNode<T, E> {
  pub(crate) name: String,
  pub(crate) deps: Vec<String>,
  pub(crate) exec: TaskFn<T, E>,
}

/// A declaration-ordered set of named tasks with dependencies.
///
/// `T` is the value a task resolves to, `E` the caller's error type.
/// Dependencies must reference earlier-declared nodes, so a valid graph is
/// acyclic by construction.
pub struct TaskGraph<T, E> {
  nodes: Vec<TaskNode<T, E>>,
  index: HashMap<String, usize>,
}

impl<T, E> TaskGraph<T, E> {
  pub fn new() -> Self {
    Self {
      nodes: Vec::new(),
      index: HashMap::new(),
    }
  }

  /// Declare a task.
  ///
  /// `deps` must name earlier-declared nodes; the execution function is
  /// called once, with the resolved values of exactly those nodes.
  pub fn add_node<F>(&mut self, name: &str, deps: &[&str], exec: F) -> Result<(), GraphError>
  where
    F: Fn(TaskInputs<T>) -> TaskFuture<T, E> + Send + Sync + 'static,
  {
    if self.index.contains_key(name) {
      return Err(GraphError::DuplicateNode(name.to_string()));
    }
    for dep in deps {
      if !self.index.contains_key(*dep) {
        return Err(GraphError::UnknownDependency {
          node: name.to_string(),
          dependency: (*dep).to_string(),
        });
      }
    }

    self.index.insert(name.to_string(), self.nodes.len());
    self.nodes.push(TaskNode {
      name: name.to_string(),
      deps: deps.iter().map(|dep| (*dep).to_string()).collect(),
      exec: Box::new(exec),
    });
    Ok(())
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  pub(crate) fn nodes(&self) -> &[TaskNode<T, E>] {
    &self.nodes
  }
}

impl<T, E> Default for TaskGraph<T, E> {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn done() -> TaskFuture<(), String> {
    Box::pin(async { Ok(()) })
  }

  #[test]
  fn rejects_duplicate_node_names() {
    let mut graph: TaskGraph<(), String> = TaskGraph::new();
    graph.add_node("a", &[], |_| done()).unwrap();
    let err = graph.add_node("a", &[], |_| done()).unwrap_err();
    assert_eq!(err, GraphError::DuplicateNode("a".to_string()));
  }

  #[test]
  fn rejects_dependencies_on_undeclared_nodes() {
    let mut graph: TaskGraph<(), String> = TaskGraph::new();
    let err = graph.add_node("b", &["a"], |_| done()).unwrap_err();
    assert_eq!(
      err,
      GraphError::UnknownDependency {
        node: "b".to_string(),
        dependency: "a".to_string(),
      }
    );
    assert!(graph.is_empty());
  }
}
