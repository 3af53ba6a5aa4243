use thiserror::Error;

/// Errors raised while declaring a task graph.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
  /// A node with this name is already declared.
  #[error("node '{0}' is already declared")]
  DuplicateNode(String),

  /// A dependency names a node that has not been declared yet.
  ///
  /// Dependencies may only reference earlier-declared nodes; this is what
  /// keeps the graph acyclic without a runtime cycle check.
  #[error("node '{node}' depends on undeclared node '{dependency}'")]
  UnknownDependency { node: String, dependency: String },
}

/// Failure returned by a task's execution function.
#[derive(Debug, Error)]
pub enum TaskError<E> {
  /// Expected short-circuit: the rest of the graph is skipped, but the
  /// caller should treat the run as successful.
  #[error("{reason}")]
  Halt { reason: String },

  /// Genuine failure; the run is reported as failed.
  #[error("{0}")]
  Fail(E),
}

impl<E> TaskError<E> {
  /// Build the distinguished non-fatal classification.
  pub fn halt(reason: impl Into<String>) -> Self {
    TaskError::Halt {
      reason: reason.into(),
    }
  }

  pub fn is_halt(&self) -> bool {
    matches!(self, TaskError::Halt { .. })
  }
}
