use sigil_component::ParamType;
use thiserror::Error;

/// Errors that can occur while populating a registry.
#[derive(Debug, Error)]
pub enum RegistryError {
  /// The parameter type was registered before.
  #[error("parameter type already registered: {ty}")]
  DuplicateType { ty: ParamType },

  /// The declared parent type has not been registered yet.
  #[error("parent type '{parent}' of '{ty}' is not registered")]
  UnknownParentType { ty: ParamType, parent: ParamType },

  /// A component implementation with this name exists.
  #[error("component type already registered: {name}")]
  DuplicateComponent { name: String },

  /// A description combiner with this name exists.
  #[error("description combiner already registered: {name}")]
  DuplicateCombiner { name: String },
}
