use std::collections::HashMap;
use std::sync::Arc;

use sigil_component::{Component, ComponentCategory, ComponentId, OwnerId};
use sigil_registry::TypeRegistry;
use tracing::debug;

use crate::error::{CombinationError, ValidationFailure};
use crate::reference::{ComponentReference, ReferenceSpec};

/// Mutable builder of one effect graph.
///
/// Holds at most one trigger and one activity, the other components by
/// category, each consumer's set of references, and the failures of the last
/// validation. Every member is owned by the combination's [`OwnerId`].
pub struct Combination {
  pub(crate) effect_id: String,
  pub(crate) id: OwnerId,
  pub(crate) registry: Arc<TypeRegistry>,
  pub(crate) trigger: Option<Component>,
  pub(crate) activity: Option<Component>,
  pub(crate) free_params: Vec<Component>,
  pub(crate) param_processors: Vec<Component>,
  pub(crate) target_searches: Vec<Component>,
  pub(crate) param_target_convertors: Vec<Component>,
  pub(crate) conditions: Vec<Component>,
  pub(crate) effects: Vec<Component>,
  pub(crate) references: HashMap<ComponentId, Vec<ComponentReference>>,
  pub(crate) failures: Vec<ValidationFailure>,
  pub(crate) combiner: Option<String>,
}

impl Combination {
  pub fn new(effect_id: impl Into<String>, registry: Arc<TypeRegistry>) -> Self {
    Self {
      effect_id: effect_id.into(),
      id: OwnerId::new(),
      registry,
      trigger: None,
      activity: None,
      free_params: Vec::new(),
      param_processors: Vec::new(),
      target_searches: Vec::new(),
      param_target_convertors: Vec::new(),
      conditions: Vec::new(),
      effects: Vec::new(),
      references: HashMap::new(),
      failures: Vec::new(),
      combiner: None,
    }
  }

  pub fn effect_id(&self) -> &str {
    &self.effect_id
  }

  /// Identity the members are owned by.
  pub fn id(&self) -> OwnerId {
    self.id
  }

  pub fn registry(&self) -> &TypeRegistry {
    &self.registry
  }

  pub fn trigger(&self) -> Option<&Component> {
    self.trigger.as_ref()
  }

  pub fn activity(&self) -> Option<&Component> {
    self.activity.as_ref()
  }

  /// Members of one category, in insertion order until the next reindex
  /// and in index order after [`Combination::get_result`].
  pub fn members(&self, category: ComponentCategory) -> &[Component] {
    match category {
      ComponentCategory::Trigger => self.trigger.as_slice(),
      ComponentCategory::Activity => self.activity.as_slice(),
      ComponentCategory::FreeParam => &self.free_params,
      ComponentCategory::ParamProcessor => &self.param_processors,
      ComponentCategory::TargetSearch => &self.target_searches,
      ComponentCategory::ParamTargetConvertor => &self.param_target_convertors,
      ComponentCategory::Condition => &self.conditions,
      ComponentCategory::Effect => &self.effects,
    }
  }

  fn members_mut(&mut self, category: ComponentCategory) -> Option<&mut Vec<Component>> {
    match category {
      ComponentCategory::Trigger | ComponentCategory::Activity => None,
      ComponentCategory::FreeParam => Some(&mut self.free_params),
      ComponentCategory::ParamProcessor => Some(&mut self.param_processors),
      ComponentCategory::TargetSearch => Some(&mut self.target_searches),
      ComponentCategory::ParamTargetConvertor => Some(&mut self.param_target_convertors),
      ComponentCategory::Condition => Some(&mut self.conditions),
      ComponentCategory::Effect => Some(&mut self.effects),
    }
  }

  /// Whether `component` is owned by this combination and present in its category.
  pub fn contains(&self, component: &Component) -> bool {
    component.is_owned_by(self.id) && self.members(component.category()).contains(component)
  }

  /// References whose consumer is `consumer`.
  pub fn references(&self, consumer: &Component) -> &[ComponentReference] {
    self
      .references
      .get(&consumer.id())
      .map(Vec::as_slice)
      .unwrap_or_default()
  }

  pub fn reference_count(&self) -> usize {
    self.references.values().map(Vec::len).sum()
  }

  /// Failures collected by the last [`Combination::check`].
  pub fn failures(&self) -> &[ValidationFailure] {
    &self.failures
  }

  /// Select the description combiner by registry name.
  pub fn set_combiner(&mut self, name: impl Into<String>) -> Result<(), CombinationError> {
    let name = name.into();
    if self.registry.combiner(&name).is_none() {
      return Err(CombinationError::UnknownCombiner { name });
    }
    self.combiner = Some(name);
    Ok(())
  }

  pub fn combiner(&self) -> Option<&str> {
    self.combiner.as_deref()
  }

  /// Add a component to the collection of its category.
  ///
  /// A trigger or activity replaces the current occupant, which is released.
  pub fn add(&mut self, component: Component) -> Result<(), CombinationError> {
    match component.category() {
      ComponentCategory::Trigger => self.set_trigger(component),
      ComponentCategory::Activity => self.set_activity(component),
      category => {
        if component.is_owned_by(self.id) && self.members(category).contains(&component) {
          return Err(CombinationError::DuplicateComponent { category });
        }
        if !component.claim(self.id) {
          return Err(CombinationError::InvalidComponent);
        }
        debug!(
          effect_id = %self.effect_id,
          component = %component.type_name(),
          category = %category,
          "component added"
        );
        if let Some(members) = self.members_mut(category) {
          members.push(component);
        }
        Ok(())
      }
    }
  }

  pub fn set_trigger(&mut self, trigger: Component) -> Result<(), CombinationError> {
    let previous = self.replace_singleton(ComponentCategory::Trigger, trigger)?;
    debug!(effect_id = %self.effect_id, replaced = previous, "trigger set");
    Ok(())
  }

  pub fn set_activity(&mut self, activity: Component) -> Result<(), CombinationError> {
    let previous = self.replace_singleton(ComponentCategory::Activity, activity)?;
    debug!(effect_id = %self.effect_id, replaced = previous, "activity set");
    Ok(())
  }

  /// Returns whether an occupant was replaced.
  fn replace_singleton(
    &mut self,
    category: ComponentCategory,
    component: Component,
  ) -> Result<bool, CombinationError> {
    if component.category() != category {
      return Err(CombinationError::InvalidComponent);
    }
    let id = self.id;
    let slot = match category {
      ComponentCategory::Trigger => &mut self.trigger,
      _ => &mut self.activity,
    };
    if slot.as_ref() == Some(&component) && component.is_owned_by(id) {
      return Ok(false);
    }
    if !component.claim(id) {
      return Err(CombinationError::InvalidComponent);
    }
    match slot.replace(component) {
      Some(previous) => {
        previous.release(id);
        Ok(true)
      }
      None => Ok(false),
    }
  }

  /// Remove a member and release it.
  ///
  /// References it takes part in are dropped by the next prune.
  pub fn remove(&mut self, component: &Component) -> Result<(), CombinationError> {
    let category = component.category();
    if !self.contains(component) {
      return Err(CombinationError::NotAMember { category });
    }

    match category {
      ComponentCategory::Trigger => self.trigger = None,
      ComponentCategory::Activity => self.activity = None,
      _ => {
        if let Some(members) = self.members_mut(category) {
          members.retain(|member| member != component);
        }
      }
    }
    component.release(self.id);
    debug!(
      effect_id = %self.effect_id,
      component = %component.type_name(),
      category = %category,
      "component removed"
    );
    Ok(())
  }

  /// Structural pre-check shared by adding, removing and pruning references.
  pub(crate) fn check_reference(&self, spec: &ReferenceSpec) -> Result<(), CombinationError> {
    let consumer = &spec.consumer;
    let provider = &spec.provider;
    let consumer_category = consumer.category();
    let provider_category = provider.category();

    if consumer.owner().is_none() {
      return Err(CombinationError::UnownedConsumer);
    }
    if !self.contains(consumer) {
      return Err(CombinationError::ConsumerNotMember);
    }
    if provider.owner().is_none() {
      return Err(CombinationError::UnownedProvider);
    }
    if !self.contains(provider) {
      return Err(CombinationError::ProviderNotMember);
    }
    if !consumer_category.is_consumer() {
      return Err(CombinationError::IneligibleConsumer {
        category: consumer_category,
      });
    }

    let flags = spec.flags;
    if flags.param && flags.target {
      return Err(CombinationError::ConflictingFlags);
    }
    if !flags.param && !flags.target && !flags.affect {
      return Err(CombinationError::MeaninglessReference);
    }

    if flags.param && provider_category == ComponentCategory::Trigger {
      let slot = spec.trigger_slot.unwrap_or(0);
      let provided = provider.kind().provided_types().len();
      if slot >= provided {
        return Err(CombinationError::TriggerSlotOutOfRange { slot, provided });
      }
    }

    if flags.affect {
      if !provider_category.is_affectable() {
        return Err(CombinationError::NotAffectable {
          category: provider_category,
        });
      }
      if consumer_category != ComponentCategory::Condition {
        return Err(CombinationError::AffectRequiresCondition {
          category: consumer_category,
        });
      }
    }

    if flags.fills_slot() && consumer_category.is_multi_slot() && spec.consumer_slot.is_none() {
      return Err(CombinationError::MissingConsumerSlot {
        category: consumer_category,
      });
    }

    Ok(())
  }

  /// Add a reference to its consumer's set.
  ///
  /// Fails if the consumer already holds a reference reading the same thing
  /// from the same provider: the same trigger slot into the same param slot,
  /// the same target slot, or an affect edge of any slot.
  pub fn add_reference(&mut self, spec: ReferenceSpec) -> Result<(), CombinationError> {
    self.check_reference(&spec)?;
    let reference = ComponentReference::new(spec);
    let siblings = self.references.entry(reference.consumer().id()).or_default();
    if siblings
      .iter()
      .any(|sibling| sibling.is_same_target(&reference))
    {
      return Err(CombinationError::DuplicateReference);
    }

    debug!(
      effect_id = %self.effect_id,
      consumer = reference.consumer().type_name(),
      provider = reference.provider().type_name(),
      flags = ?reference.flags(),
      slot = reference.consumer_slot(),
      "reference added"
    );
    siblings.push(reference);
    Ok(())
  }

  /// Remove every reference of the consumer reading the same thing from the
  /// same provider as `spec`.
  ///
  /// Returns how many were removed.
  pub fn remove_reference(&mut self, spec: ReferenceSpec) -> Result<usize, CombinationError> {
    self.check_reference(&spec)?;
    let target = ComponentReference::new(spec);
    let consumer_id = target.consumer().id();

    let Some(siblings) = self.references.get_mut(&consumer_id) else {
      return Ok(0);
    };
    let before = siblings.len();
    siblings.retain(|sibling| !sibling.is_same_target(&target));
    let removed = before - siblings.len();
    if siblings.is_empty() {
      self.references.remove(&consumer_id);
    }
    Ok(removed)
  }

  /// Assign self-indices.
  ///
  /// Members no longer owned by this combination are dropped first. Indices
  /// are contiguous from 0 in category order, the trigger taking one index per
  /// provided value.
  pub fn reindex(&mut self) -> Result<(), CombinationError> {
    let trigger = self.trigger.as_ref().ok_or(CombinationError::MissingTrigger)?;
    if !trigger.is_owned_by(self.id) {
      return Err(CombinationError::ForeignTrigger);
    }
    let activity = self.activity.as_ref().ok_or(CombinationError::MissingActivity)?;
    if !activity.is_owned_by(self.id) {
      return Err(CombinationError::ForeignActivity);
    }

    let id = self.id;
    for category in ComponentCategory::INDEX_ORDER {
      if let Some(members) = self.members_mut(category) {
        members.retain(|member| member.is_owned_by(id));
      }
    }

    let mut next = 0;
    for category in ComponentCategory::INDEX_ORDER {
      for member in self.members(category) {
        member.set_self_index(next);
        next += member.index_span();
      }
    }
    debug!(effect_id = %self.effect_id, indices = next, "combination reindexed");
    Ok(())
  }

  /// Drop references that no longer pass the structural check.
  ///
  /// Returns how many were dropped.
  pub fn prune(&mut self) -> usize {
    let stale: Vec<(ComponentId, usize)> = self
      .references
      .iter()
      .flat_map(|(consumer, siblings)| {
        siblings
          .iter()
          .enumerate()
          .filter(|(_, reference)| self.check_reference(&reference.spec()).is_err())
          .map(move |(position, _)| (*consumer, position))
      })
      .collect();

    for (consumer, position) in stale.iter().rev() {
      if let Some(siblings) = self.references.get_mut(consumer) {
        let reference = siblings.remove(*position);
        debug!(
          effect_id = %self.effect_id,
          consumer = reference.consumer().type_name(),
          provider = reference.provider().type_name(),
          "stale reference pruned"
        );
      }
    }
    self.references.retain(|_, siblings| !siblings.is_empty());
    stale.len()
  }

  /// Every member, in category order.
  pub(crate) fn all_members(&self) -> impl Iterator<Item = &Component> {
    ComponentCategory::INDEX_ORDER
      .into_iter()
      .flat_map(|category| self.members(category).iter())
  }

  /// The member at `index`. Any index inside the trigger's footprint
  /// resolves to the trigger.
  pub fn component_at(&self, index: usize) -> Option<&Component> {
    if let Some(trigger) = &self.trigger {
      let start = trigger.self_index();
      if (start..start + trigger.index_span()).contains(&index) {
        return Some(trigger);
      }
    }
    self
      .all_members()
      .filter(|member| member.category() != ComponentCategory::Trigger)
      .find(|member| member.self_index() == index)
  }
}
