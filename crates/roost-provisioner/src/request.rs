//! Installation request types supplied by the control plane.

use serde::{Deserialize, Serialize};

/// Template ("egg") definition: the install script plus the container image
/// and interpreter used to run it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSpec {
  pub id: i64,
  /// Install script text; `None` means the template has no installer.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub script: Option<String>,
  /// Image the script runs in; falls back to the configured runner image.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub container: Option<String>,
  /// Interpreter invoked inside the container; falls back to `ash`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub entrypoint: Option<String>,
}

/// A single key/value binding forwarded into the install container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableBinding {
  pub key: String,
  pub value: String,
}

impl VariableBinding {
  /// Render as a `KEY=VALUE` environment entry.
  pub fn render(&self) -> String {
    format!("{}={}", self.key, self.value)
  }
}

/// Everything needed for one installation run. Immutable once the run
/// starts; per-run state lives in the task graph's result table, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallationRequest {
  pub template: TemplateSpec,
  /// Bindings are injected in this order, after the server parameters.
  #[serde(default)]
  pub variables: Vec<VariableBinding>,
}
