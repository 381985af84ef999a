use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use sigil_component::{
  Component, ComponentCategory, ComponentKind, DescriptionCombiner, LineCombiner, ParamType,
  StandardActivity,
};
use tracing::debug;

use crate::error::RegistryError;

/// Builds a fresh instance of a registered component implementation.
pub type ComponentFactory = Arc<dyn Fn() -> ComponentKind + Send + Sync>;

/// Builds a registered description combiner.
pub type CombinerFactory = Arc<dyn Fn() -> Arc<dyn DescriptionCombiner> + Send + Sync>;

#[derive(Clone)]
struct ComponentEntry {
  category: ComponentCategory,
  factory: ComponentFactory,
}

/// The type universe of an application.
///
/// Holds three tables:
/// - parameter types and their parent, which defines subtyping
/// - component implementations by stable name, for reconstruction
/// - description combiners by stable name
///
/// A registry is built once at startup and shared (usually behind an `Arc`)
/// by every combination and every graph loader.
#[derive(Clone, Default)]
pub struct TypeRegistry {
  parents: HashMap<ParamType, Option<ParamType>>,
  components: HashMap<String, ComponentEntry>,
  combiners: HashMap<String, CombinerFactory>,
}

impl TypeRegistry {
  /// Create an empty registry.
  pub fn new() -> Self {
    Self::default()
  }

  /// Create a registry holding the components and combiners sigil ships with.
  pub fn with_builtins() -> Self {
    let mut registry = Self::new();
    registry.components.insert(
      StandardActivity::NAME.to_string(),
      ComponentEntry {
        category: ComponentCategory::Activity,
        factory: Arc::new(|| ComponentKind::Activity(Arc::new(StandardActivity::default()))),
      },
    );
    registry.combiners.insert(
      LineCombiner::NAME.to_string(),
      Arc::new(|| Arc::new(LineCombiner) as Arc<dyn DescriptionCombiner>),
    );
    registry
  }

  /// Register a parameter type. `parent`, if given, must already be registered.
  pub fn register_type(
    &mut self,
    ty: ParamType,
    parent: Option<ParamType>,
  ) -> Result<(), RegistryError> {
    if self.parents.contains_key(&ty) {
      return Err(RegistryError::DuplicateType { ty });
    }
    if let Some(parent) = &parent
      && !self.parents.contains_key(parent)
    {
      return Err(RegistryError::UnknownParentType {
        ty,
        parent: parent.clone(),
      });
    }
    debug!(ty = %ty, parent = ?parent.as_ref().map(ParamType::name), "registered type");
    self.parents.insert(ty, parent);
    Ok(())
  }

  pub fn is_registered(&self, ty: &ParamType) -> bool {
    self.parents.contains_key(ty)
  }

  pub fn parent_of(&self, ty: &ParamType) -> Option<&ParamType> {
    self.parents.get(ty).and_then(Option::as_ref)
  }

  /// Whether a value of type `provided` satisfies a requirement of type `required`.
  ///
  /// True when `provided` is `required` or a (transitive) subtype of it.
  /// Unregistered types are only compatible with themselves.
  pub fn is_assignable(&self, required: &ParamType, provided: &ParamType) -> bool {
    let mut current = Some(provided);
    // Parents are registered before their children, so chains end.
    for _ in 0..=self.parents.len() {
      match current {
        Some(ty) if ty == required => return true,
        Some(ty) => current = self.parent_of(ty),
        None => return false,
      }
    }
    false
  }

  /// Register a component implementation under a stable name.
  pub fn register_component<F>(
    &mut self,
    name: impl Into<String>,
    factory: F,
  ) -> Result<(), RegistryError>
  where
    F: Fn() -> ComponentKind + Send + Sync + 'static,
  {
    let name = name.into();
    if self.components.contains_key(&name) {
      return Err(RegistryError::DuplicateComponent { name });
    }
    let category = factory().category();
    debug!(name = %name, category = %category, "registered component");
    self.components.insert(
      name,
      ComponentEntry {
        category,
        factory: Arc::new(factory),
      },
    );
    Ok(())
  }

  /// Register a description combiner under a stable name.
  pub fn register_combiner<F>(
    &mut self,
    name: impl Into<String>,
    factory: F,
  ) -> Result<(), RegistryError>
  where
    F: Fn() -> Arc<dyn DescriptionCombiner> + Send + Sync + 'static,
  {
    let name = name.into();
    if self.combiners.contains_key(&name) {
      return Err(RegistryError::DuplicateCombiner { name });
    }
    self.combiners.insert(name, Arc::new(factory));
    Ok(())
  }

  /// Category of the implementation registered under `name`.
  pub fn category_of(&self, name: &str) -> Option<ComponentCategory> {
    self.components.get(name).map(|entry| entry.category)
  }

  /// Build a fresh, unowned component of the implementation registered under `name`.
  pub fn instantiate(&self, name: &str) -> Option<Component> {
    let entry = self.components.get(name)?;
    Some(Component::new(name, (entry.factory)()))
  }

  /// Build the combiner registered under `name`.
  pub fn combiner(&self, name: &str) -> Option<Arc<dyn DescriptionCombiner>> {
    self.combiners.get(name).map(|factory| factory())
  }

  /// Registered component names, sorted.
  pub fn component_names(&self) -> Vec<&str> {
    let mut names: Vec<&str> = self.components.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
  }
}

impl fmt::Debug for TypeRegistry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TypeRegistry")
      .field("types", &self.parents.len())
      .field("components", &self.component_names())
      .field("combiners", &self.combiners.len())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use sigil_component::{ConstantParam, Param, StaticTrigger};

  const UNIT: ParamType = ParamType::new("unit");
  const HERO: ParamType = ParamType::new("hero");
  const MAGE: ParamType = ParamType::new("mage");
  const NUMBER: ParamType = ParamType::new("number");

  fn universe() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry.register_type(UNIT, None).unwrap();
    registry.register_type(HERO, Some(UNIT)).unwrap();
    registry.register_type(MAGE, Some(HERO)).unwrap();
    registry.register_type(NUMBER, None).unwrap();
    registry
  }

  #[test]
  fn test_assignability_is_reflexive() {
    let registry = universe();
    assert!(registry.is_assignable(&UNIT, &UNIT));
    assert!(registry.is_assignable(&MAGE, &MAGE));
  }

  #[test]
  fn test_assignability_is_transitive() {
    let registry = universe();
    assert!(registry.is_assignable(&UNIT, &HERO));
    assert!(registry.is_assignable(&UNIT, &MAGE));
    assert!(registry.is_assignable(&HERO, &MAGE));
  }

  #[test]
  fn test_assignability_is_not_reversed() {
    let registry = universe();
    assert!(!registry.is_assignable(&MAGE, &UNIT));
    assert!(!registry.is_assignable(&HERO, &UNIT));
    assert!(!registry.is_assignable(&NUMBER, &UNIT));
  }

  #[test]
  fn test_unregistered_types_match_only_themselves() {
    let registry = universe();
    let loot = ParamType::new("loot");
    assert!(registry.is_assignable(&loot, &loot));
    assert!(!registry.is_assignable(&UNIT, &loot));
  }

  #[test]
  fn test_register_type_requires_known_parent() {
    let mut registry = TypeRegistry::new();
    let result = registry.register_type(HERO, Some(UNIT));
    assert!(matches!(result, Err(RegistryError::UnknownParentType { .. })));
  }

  #[test]
  fn test_register_type_rejects_duplicates() {
    let mut registry = universe();
    let result = registry.register_type(UNIT, None);
    assert!(matches!(result, Err(RegistryError::DuplicateType { .. })));
  }

  #[test]
  fn test_instantiate_by_name() {
    let mut registry = TypeRegistry::with_builtins();
    registry
      .register_component("on_cast", || {
        ComponentKind::Trigger(Arc::new(StaticTrigger::new(vec![UNIT])))
      })
      .unwrap();
    registry
      .register_component("five", || {
        ComponentKind::FreeParam(Arc::new(ConstantParam::new(Param::new(NUMBER, 5))))
      })
      .unwrap();

    let trigger = registry.instantiate("on_cast").unwrap();
    assert_eq!(trigger.type_name(), "on_cast");
    assert_eq!(trigger.category(), ComponentCategory::Trigger);
    assert_eq!(trigger.owner(), None);

    let other = registry.instantiate("on_cast").unwrap();
    assert_ne!(trigger.id(), other.id());

    assert_eq!(registry.category_of("five"), Some(ComponentCategory::FreeParam));
    assert_eq!(
      registry.category_of(StandardActivity::NAME),
      Some(ComponentCategory::Activity)
    );
    assert!(registry.instantiate("missing").is_none());
  }

  #[test]
  fn test_register_component_rejects_duplicates() {
    let mut registry = TypeRegistry::with_builtins();
    let result = registry.register_component(StandardActivity::NAME, || {
      ComponentKind::Activity(Arc::new(StandardActivity::default()))
    });
    assert!(matches!(result, Err(RegistryError::DuplicateComponent { .. })));
  }

  #[test]
  fn test_builtin_combiner() {
    let registry = TypeRegistry::with_builtins();
    assert!(registry.combiner(LineCombiner::NAME).is_some());
    assert!(registry.combiner("missing").is_none());
  }
}
