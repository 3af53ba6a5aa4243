//! Container runtime contract consumed by the installer.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWrite;

use crate::error::RuntimeError;

/// A bind mount in a container run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
  pub source: PathBuf,
  pub destination: PathBuf,
  pub writable: bool,
}

/// Everything needed to launch one attached container run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRunSpec {
  pub image: String,
  /// Entrypoint command and arguments.
  pub command: Vec<String>,
  /// `KEY=VALUE` entries, order preserved.
  pub env: Vec<String>,
  pub mounts: Vec<Mount>,
  pub privileged: bool,
}

/// Outcome of an attached container run.
#[derive(Debug, Clone)]
pub struct ContainerExit {
  pub status_code: i64,
  /// Runtime-specific handle for best-effort removal, when the runtime
  /// leaves a container behind.
  pub handle: Option<String>,
}

/// Sink receiving the container's combined output.
pub type OutputSink = dyn AsyncWrite + Send + Unpin;

/// Image-pull and run-with-attached-output primitives.
///
/// A process-wide shared handle, safe for concurrent use across installation
/// runs for different workloads.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
  /// Ensure `image` is present locally, pulling it if missing.
  async fn pull_image(&self, image: &str) -> Result<(), RuntimeError>;

  /// Run the container attached, streaming its combined output into `sink`,
  /// and wait for it to exit.
  async fn run(
    &self,
    spec: ContainerRunSpec,
    sink: &mut OutputSink,
  ) -> Result<ContainerExit, RuntimeError>;

  /// Best-effort removal of a finished container.
  async fn remove(&self, handle: &str) -> Result<(), RuntimeError>;
}
