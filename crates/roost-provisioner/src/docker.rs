//! Docker CLI adapter for the container runtime contract.
//!
//! Shells out to the `docker` binary instead of speaking to the daemon
//! socket; install runs are infrequent and long-lived, so process spawn
//! overhead does not matter here.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::debug;

use crate::error::RuntimeError;
use crate::runtime::{ContainerExit, ContainerRunSpec, ContainerRuntime, OutputSink};

/// Container runtime backed by the `docker` command-line client.
pub struct DockerCli {
  binary: String,
}

impl DockerCli {
  pub fn new() -> Self {
    Self::with_binary("docker")
  }

  /// Use a different client binary, e.g. `podman`.
  pub fn with_binary(binary: impl Into<String>) -> Self {
    Self {
      binary: binary.into(),
    }
  }
}

impl Default for DockerCli {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
  async fn pull_image(&self, image: &str) -> Result<(), RuntimeError> {
    debug!(image = %image, "docker pull");
    let output = Command::new(&self.binary)
      .args(["pull", image])
      .stdin(Stdio::null())
      .output()
      .await?;

    if !output.status.success() {
      return Err(RuntimeError::Pull {
        image: image.to_string(),
        reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
      });
    }
    Ok(())
  }

  async fn run(
    &self,
    spec: ContainerRunSpec,
    sink: &mut OutputSink,
  ) -> Result<ContainerExit, RuntimeError> {
    let mut cmd = Command::new(&self.binary);
    cmd.arg("run").arg("--rm");
    if spec.privileged {
      cmd.arg("--privileged");
    }
    for env in &spec.env {
      cmd.arg("-e").arg(env);
    }
    for mount in &spec.mounts {
      let mode = if mount.writable { "rw" } else { "ro" };
      let binding = format!(
        "{}:{}:{}",
        mount.source.display(),
        mount.destination.display(),
        mode
      );
      cmd.arg("-v").arg(&binding);
    }
    cmd.arg(&spec.image);
    cmd.args(&spec.command);
    cmd
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true);

    debug!(image = %spec.image, "docker run");
    let mut child = cmd.spawn()?;
    let mut stdout = child.stdout.take().ok_or_else(|| RuntimeError::Run {
      reason: "stdout was not captured".to_string(),
    })?;
    let mut stderr = child.stderr.take().ok_or_else(|| RuntimeError::Run {
      reason: "stderr was not captured".to_string(),
    })?;

    // Interleave both pipes into the sink as chunks arrive.
    let mut out_buf = [0u8; 8192];
    let mut err_buf = [0u8; 8192];
    let mut out_open = true;
    let mut err_open = true;
    while out_open || err_open {
      tokio::select! {
        read = stdout.read(&mut out_buf), if out_open => {
          let n = read?;
          if n == 0 {
            out_open = false;
          } else {
            sink.write_all(&out_buf[..n]).await?;
          }
        }
        read = stderr.read(&mut err_buf), if err_open => {
          let n = read?;
          if n == 0 {
            err_open = false;
          } else {
            sink.write_all(&err_buf[..n]).await?;
          }
        }
      }
    }

    let status = child.wait().await?;
    Ok(ContainerExit {
      status_code: i64::from(status.code().unwrap_or(-1)),
      // `--rm` already removes the container, so there is nothing left to
      // hand back for removal.
      handle: None,
    })
  }

  async fn remove(&self, _handle: &str) -> Result<(), RuntimeError> {
    Ok(())
  }
}
