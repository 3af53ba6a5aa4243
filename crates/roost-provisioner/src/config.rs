//! Provisioner configuration.

use std::path::PathBuf;

use serde::Deserialize;

/// Defaults applied when a template leaves runner details unset, plus the
/// scratch location and the console-redirect switch.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProvisionerConfig {
  /// Base directory for per-workload scratch areas.
  pub scratch_root: PathBuf,
  /// Image used when the template does not name one.
  pub default_image: String,
  /// Interpreter used when the template does not name one.
  pub default_entrypoint: String,
  /// Mirror container output to the daemon console instead of the install
  /// log file.
  pub debug_output: bool,
}

impl Default for ProvisionerConfig {
  fn default() -> Self {
    Self {
      scratch_root: PathBuf::from("/tmp/roost"),
      default_image: "alpine:3.4".to_string(),
      default_entrypoint: "ash".to_string(),
      debug_output: false,
    }
  }
}
