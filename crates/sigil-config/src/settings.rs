use serde::{Deserialize, Serialize};

/// How the conditions gating one component are evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckMode {
  /// One after another in index order, stopping at the first failing check.
  #[default]
  Sequential,
  /// All checks awaited together; the result is still the logical AND in index order.
  Concurrent,
}

/// What happens to the remaining effects of a firing when one of them fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchPolicy {
  #[default]
  AbortOnFailure,
  ContinueOnFailure,
}

/// Settings for the built-in activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivitySettings {
  #[serde(default)]
  pub check_mode: CheckMode,
  #[serde(default)]
  pub dispatch_policy: DispatchPolicy,
}

/// Settings for the queue that serializes firings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
  /// Capacity of the pending-firing channel.
  #[serde(default = "default_buffer_size")]
  pub buffer_size: usize,
}

fn default_buffer_size() -> usize {
  100
}

impl Default for RunnerConfig {
  fn default() -> Self {
    Self {
      buffer_size: default_buffer_size(),
    }
  }
}
