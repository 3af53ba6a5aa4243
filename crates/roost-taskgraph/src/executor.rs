//! Wave-based execution of a task graph.

use std::collections::HashMap;
use std::fmt::Display;

use futures::future::join_all;
use tracing::{debug, error, info};

use crate::error::TaskError;
use crate::graph::{TaskGraph, TaskInputs};
use crate::report::{NodeFailure, RunReport, TaskState};

/// Execute every eligible node of `graph`, honoring declared dependencies.
///
/// A node becomes eligible once all of its dependencies have succeeded;
/// eligible nodes of one wave run concurrently. When a node fails or halts,
/// every node that transitively depends on it is marked [`TaskState::Skipped`]
/// and never executes, while nodes reachable only through succeeded
/// dependencies continue normally. If several independent nodes fail, the
/// earliest-declared one is reported.
pub async fn run<T, E>(graph: TaskGraph<T, E>) -> RunReport<T, E>
where
  T: Clone,
  E: Display,
{
  let nodes = graph.nodes();
  let mut states: HashMap<String, TaskState> = nodes
    .iter()
    .map(|node| (node.name.clone(), TaskState::Pending))
    .collect();
  let mut values: HashMap<String, T> = HashMap::new();
  let mut failure: Option<(usize, NodeFailure<E>)> = None;

  loop {
    let ready: Vec<usize> = nodes
      .iter()
      .enumerate()
      .filter(|(_, node)| states.get(&node.name) == Some(&TaskState::Pending))
      .filter(|(_, node)| {
        node
          .deps
          .iter()
          .all(|dep| states.get(dep) == Some(&TaskState::Succeeded))
      })
      .map(|(position, _)| position)
      .collect();

    if ready.is_empty() {
      break;
    }

    for &position in &ready {
      states.insert(nodes[position].name.clone(), TaskState::Running);
      debug!(node = %nodes[position].name, "task started");
    }

    let wave: Vec<_> = ready
      .iter()
      .map(|&position| {
        let node = &nodes[position];
        let inputs: TaskInputs<T> = node
          .deps
          .iter()
          .filter_map(|dep| values.get(dep).map(|value| (dep.clone(), value.clone())))
          .collect();
        async move { (position, (node.exec)(inputs).await) }
      })
      .collect();

    for (position, result) in join_all(wave).await {
      let name = nodes[position].name.clone();
      match result {
        Ok(value) => {
          debug!(node = %name, "task succeeded");
          states.insert(name.clone(), TaskState::Succeeded);
          values.insert(name, value);
        }
        Err(err) => {
          match &err {
            TaskError::Halt { reason } => {
              info!(node = %name, %reason, "task halted the run");
            }
            TaskError::Fail(source) => {
              error!(node = %name, error = %source, "task failed");
            }
          }
          states.insert(name.clone(), TaskState::Failed);
          if failure.as_ref().is_none_or(|(held, _)| position < *held) {
            failure = Some((position, NodeFailure { node: name, error: err }));
          }
        }
      }
    }

    // Skip-propagate: a pending node with a failed or skipped dependency can
    // never become eligible.
    loop {
      let mut changed = false;
      for node in nodes {
        if states.get(&node.name) != Some(&TaskState::Pending) {
          continue;
        }
        let blocked = node.deps.iter().any(|dep| {
          matches!(
            states.get(dep),
            Some(TaskState::Failed) | Some(TaskState::Skipped)
          )
        });
        if blocked {
          debug!(node = %node.name, "task skipped");
          states.insert(node.name.clone(), TaskState::Skipped);
          changed = true;
        }
      }
      if !changed {
        break;
      }
    }
  }

  RunReport {
    states,
    values,
    failure: failure.map(|(_, node_failure)| node_failure),
  }
}
