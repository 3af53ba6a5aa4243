//! Per-workload scratch directory for installation runs.

use std::path::{Path, PathBuf};

/// The ephemeral scratch area `<scratch-root>/<workload-id>/`, holding the
/// install script for the duration of one run. The directory is created on
/// first write; the script is always removed after a successful run.
pub struct Workspace {
  dir: PathBuf,
}

impl Workspace {
  pub fn new(scratch_root: &Path, workload_id: &str) -> Self {
    Self {
      dir: scratch_root.join(workload_id),
    }
  }

  /// The scratch directory, mounted at `/mnt/install` during the run.
  pub fn dir(&self) -> &Path {
    &self.dir
  }

  /// Host path of the install script for `template_id`.
  pub fn script_path(&self, template_id: i64) -> PathBuf {
    self.dir.join(format!("install-{template_id}.sh"))
  }

  /// Write the install script with mode 0644, creating the scratch
  /// directory and its parents if missing.
  pub async fn write_script(&self, template_id: i64, contents: &str) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(&self.dir).await?;
    let path = self.script_path(template_id);
    tokio::fs::write(&path, contents).await?;
    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).await?;
    }
    Ok(path)
  }

  /// Delete the install script.
  pub async fn remove_script(&self, template_id: i64) -> std::io::Result<()> {
    tokio::fs::remove_file(self.script_path(template_id)).await
  }
}
