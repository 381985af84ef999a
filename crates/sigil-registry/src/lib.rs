mod error;
mod registry;

pub use error::RegistryError;
pub use registry::{CombinerFactory, ComponentFactory, TypeRegistry};
