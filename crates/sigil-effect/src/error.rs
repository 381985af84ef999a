use sigil_component::ComponentCategory;
use thiserror::Error;

/// Errors that can occur while restoring a graph from a record.
#[derive(Debug, Error)]
pub enum RecordError {
  /// No registry knows the implementation name.
  #[error("component type not registered: {name}")]
  UnknownComponentType { name: String },

  /// The registered implementation is of a different category than recorded.
  #[error("component '{name}' is a {found}, record says {expected}")]
  CategoryMismatch {
    name: String,
    expected: ComponentCategory,
    found: ComponentCategory,
  },

  /// A second trigger or activity.
  #[error("record holds more than one {category}")]
  DuplicateSingleton { category: ComponentCategory },

  /// The record has no trigger or no activity.
  #[error("record has no {category}")]
  Incomplete { category: ComponentCategory },

  /// No registry knows the combiner name.
  #[error("description combiner not registered: {name}")]
  UnknownCombiner { name: String },
}

/// Errors returned by [`EffectRunner`](crate::EffectRunner).
#[derive(Debug, Error)]
pub enum RunnerError {
  #[error("effect runner channel closed")]
  ChannelClosed,
}
