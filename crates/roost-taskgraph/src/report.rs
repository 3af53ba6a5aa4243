use std::collections::HashMap;

use crate::error::TaskError;

/// Completion state of a single node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
  Pending,
  Running,
  Succeeded,
  Failed,
  /// Never executed because a transitive dependency failed or halted.
  Skipped,
}

/// The failure a run resolved with: the earliest-declared node whose
/// execution function returned an error.
#[derive(Debug)]
pub struct NodeFailure<E> {
  pub node: String,
  pub error: TaskError<E>,
}

/// Outcome of executing a task graph.
///
/// Produced exactly once per run, after all eligible work has finished —
/// including nodes downstream of a failure that still executed because they
/// depend only on succeeded nodes.
#[derive(Debug)]
pub struct RunReport<T, E> {
  /// Final state of every declared node.
  pub states: HashMap<String, TaskState>,
  /// Resolved values of the nodes that succeeded.
  pub values: HashMap<String, T>,
  /// `None` on full success.
  pub failure: Option<NodeFailure<E>>,
}

impl<T, E> RunReport<T, E> {
  pub fn is_success(&self) -> bool {
    self.failure.is_none()
  }

  pub fn state(&self, node: &str) -> Option<TaskState> {
    self.states.get(node).copied()
  }
}
