//! Workload handle consumed by the installer.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Network and build parameters injected into the install environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildParams {
  pub memory: u64,
  pub ip: String,
  pub port: u16,
}

/// Opaque handle to a tenant workload.
///
/// Supplied by the surrounding daemon and outliving any single installation
/// run. The boot-block gate is a flag, not a lock: the caller must prevent
/// two concurrent installation runs for the same workload.
#[async_trait]
pub trait Workload: Send + Sync {
  fn id(&self) -> &str;

  /// Root of the workload's persistent storage, mounted at `/mnt/server`
  /// during an install run.
  fn storage_root(&self) -> &Path;

  fn build_params(&self) -> BuildParams;

  /// Set or clear the boot-block gate. While set, the workload must not be
  /// allowed to boot.
  fn set_boot_blocked(&self, blocked: bool);

  fn boot_blocked(&self) -> bool;

  /// Repair file ownership across the entire storage root after an install
  /// run has written into it.
  async fn repair_ownership(&self) -> std::io::Result<()>;
}

/// Filesystem-backed workload used by the binary and in tests.
pub struct LocalWorkload {
  id: String,
  storage_root: PathBuf,
  build: BuildParams,
  boot_blocked: AtomicBool,
}

impl LocalWorkload {
  pub fn new(id: impl Into<String>, storage_root: impl Into<PathBuf>, build: BuildParams) -> Self {
    Self {
      id: id.into(),
      storage_root: storage_root.into(),
      build,
      boot_blocked: AtomicBool::new(false),
    }
  }
}

#[async_trait]
impl Workload for LocalWorkload {
  fn id(&self) -> &str {
    &self.id
  }

  fn storage_root(&self) -> &Path {
    &self.storage_root
  }

  fn build_params(&self) -> BuildParams {
    self.build.clone()
  }

  fn set_boot_blocked(&self, blocked: bool) {
    self.boot_blocked.store(blocked, Ordering::SeqCst);
  }

  fn boot_blocked(&self) -> bool {
    self.boot_blocked.load(Ordering::SeqCst)
  }

  async fn repair_ownership(&self) -> std::io::Result<()> {
    // Ownership repair needs deployment knowledge (the runtime user the
    // daemon maps tenants to); the local workload leaves files as written.
    Ok(())
  }
}
