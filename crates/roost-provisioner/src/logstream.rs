//! File-backed sink for installer output.

use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// A scoped, file-backed sink for installer output.
///
/// Lifecycle is closed → open → closed. Closing a stream that was never
/// opened, or closing twice, is a no-op. An installation run cycles the
/// stream at most once before the container step.
pub struct LogStream {
  path: PathBuf,
  file: Option<File>,
}

impl LogStream {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      file: None,
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn is_open(&self) -> bool {
    self.file.is_some()
  }

  /// Truncate-or-create the log file (mode 0644) and bind the sink to it.
  pub async fn open(&mut self) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o644);
    self.file = Some(options.open(&self.path).await?);
    Ok(())
  }

  /// Append raw bytes to the log.
  pub async fn write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
    match self.file.as_mut() {
      Some(file) => file.write_all(bytes).await,
      None => Err(std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        "log stream is closed",
      )),
    }
  }

  /// Borrow the open sink, for attaching container output.
  pub fn sink(&mut self) -> Option<&mut File> {
    self.file.as_mut()
  }

  /// Flush and release the underlying handle.
  pub async fn close(&mut self) -> std::io::Result<()> {
    if let Some(mut file) = self.file.take() {
      file.shutdown().await?;
    }
    Ok(())
  }
}
