use thiserror::Error;

/// Failure reported by an effect's action.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EffectError {
  /// A parameter had the right type tag but an unusable value.
  #[error("invalid parameter at slot {slot}: {message}")]
  InvalidParam { slot: usize, message: String },

  /// The action itself failed.
  #[error("effect failed: {message}")]
  Failed { message: String },
}

impl EffectError {
  pub fn failed(message: impl Into<String>) -> Self {
    Self::Failed {
      message: message.into(),
    }
  }
}
