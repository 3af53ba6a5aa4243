//! Error types for installation runs.

use thiserror::Error;

/// Errors surfaced by a container runtime implementation.
#[derive(Debug, Error)]
pub enum RuntimeError {
  #[error("image pull failed for '{image}': {reason}")]
  Pull { image: String, reason: String },

  #[error("container run failed: {reason}")]
  Run { reason: String },

  #[error(transparent)]
  Io(#[from] std::io::Error),
}

/// Fatal failure of an installation run.
///
/// The missing-script case is not represented here: it is the distinguished
/// non-fatal classification, surfaced to callers as
/// [`InstallOutcome::NoScript`](crate::InstallOutcome::NoScript).
#[derive(Debug, Error)]
pub enum InstallError {
  /// The install container exited with a non-zero status.
  #[error("install script failed with code {0}")]
  ScriptExit(i64),

  #[error(transparent)]
  Runtime(#[from] RuntimeError),

  #[error("install workspace I/O failed: {0}")]
  Io(#[from] std::io::Error),

  #[error("ownership repair failed: {0}")]
  Ownership(#[source] std::io::Error),

  #[error(transparent)]
  Graph(#[from] roost_taskgraph::GraphError),
}
