//! Validation of a combination and production of its effect graph.
//!
//! Every consumer is validated on its own and every failure is collected.
//! Consumers are visited processors first, then convertors, conditions and
//! effects. Each visit runs three steps:
//!
//! 1. references of the consumer that read the same provider slot, or fill
//!    the same consumer slot, are all flagged and the visit stops there
//! 2. each reference is checked against its provider (kind, range, type)
//!    and its slot is bound to the provider's index
//! 3. every declared slot must end up bound to a member providing a
//!    compatible type; slots already reported in step 2 are skipped

use std::collections::{BTreeMap, HashMap, HashSet};

use sigil_component::{Component, ComponentCategory, ComponentKind, ParamType, SlotBindings};
use sigil_effect::{EffectParts, SingleEffect};
use tracing::{info, instrument, warn};

use crate::combination::Combination;
use crate::error::{CombinationError, FailureReason, SlotRole, ValidationFailure};
use crate::reference::{ComponentReference, ReferenceKey};

const VALIDATION_ORDER: [ComponentCategory; 4] = [
  ComponentCategory::ParamProcessor,
  ComponentCategory::ParamTargetConvertor,
  ComponentCategory::Condition,
  ComponentCategory::Effect,
];

impl Combination {
  /// Reindex, prune stale references and validate every consumer.
  ///
  /// Only a missing or foreign trigger or activity stops the pass early.
  /// Otherwise every failure is collected, kept in
  /// [`Combination::failures`] and returned in
  /// [`CombinationError::FailingComponents`].
  #[instrument(name = "combination_check", skip(self), fields(effect_id = %self.effect_id))]
  pub fn check(&mut self) -> Result<(), CombinationError> {
    if self.trigger.is_none() {
      return Err(CombinationError::MissingTrigger);
    }
    if self.activity.is_none() {
      return Err(CombinationError::MissingActivity);
    }

    self.reindex()?;
    let pruned = self.prune();
    self.failures.clear();

    let mut failures = Vec::new();
    for category in VALIDATION_ORDER {
      for consumer in self.members(category) {
        failures.extend(self.validate_consumer(consumer));
      }
    }
    failures.extend(self.processor_cycles());
    self.failures = failures;

    if self.failures.is_empty() {
      info!(pruned, "combination is valid");
      return Ok(());
    }
    for failure in &self.failures {
      warn!(failure = %failure, "validation failure");
    }
    warn!(
      pruned,
      failures = self.failures.len(),
      "combination has failing components"
    );
    Err(CombinationError::FailingComponents {
      failures: self.failures.clone(),
    })
  }

  /// Validate and, on success, hand every member to a new [`SingleEffect`].
  ///
  /// The graph sorts its members by self-index. The combination keeps its
  /// collections in insertion order, but no longer owns their components;
  /// they must not be added to another combination.
  pub fn get_result(&mut self) -> Result<SingleEffect, CombinationError> {
    self.check()?;

    let combiner = match &self.combiner {
      Some(name) => {
        let combiner = self
          .registry
          .combiner(name)
          .ok_or_else(|| CombinationError::UnknownCombiner { name: name.clone() })?;
        Some((name.clone(), combiner))
      }
      None => None,
    };

    let parts = EffectParts {
      effect_id: self.effect_id.clone(),
      trigger: self.trigger.clone(),
      activity: self.activity.clone(),
      free_params: self.free_params.clone(),
      param_processors: self.param_processors.clone(),
      target_searches: self.target_searches.clone(),
      param_target_convertors: self.param_target_convertors.clone(),
      conditions: self.conditions.clone(),
      effects: self.effects.clone(),
      combiner,
    };
    let effect = SingleEffect::assemble(parts, Some(self.id));
    info!(effect_id = %self.effect_id, "effect graph produced");
    Ok(effect)
  }

  fn validate_consumer(&self, consumer: &Component) -> Vec<ValidationFailure> {
    consumer.clear_bindings();
    let failure = |reason| ValidationFailure {
      category: consumer.category(),
      self_index: consumer.self_index(),
      component: consumer.type_name().to_string(),
      reason,
    };
    let references = self.references(consumer);

    let conflicts = conflicts(references);
    if !conflicts.is_empty() {
      return conflicts.into_iter().map(failure).collect();
    }

    let mut failures = Vec::new();
    let mut reported = HashSet::new();
    let mut bindings = consumer.bindings();
    for reference in references {
      let flags = reference.flags();
      let slot = reference.consumer_slot();
      if flags.param
        && let Err(reason) = self.bind_param(consumer, reference, &mut bindings)
      {
        reported.insert((SlotRole::Param, slot));
        failures.push(failure(reason));
      }
      if flags.target
        && let Err(reason) = self.bind_target(consumer, reference, &mut bindings)
      {
        reported.insert((SlotRole::Target, slot));
        failures.push(failure(reason));
      }
      if flags.affect {
        bindings.affected = Some(reference.provider().self_index());
      }
    }
    consumer.set_bindings(bindings.clone());

    let kind = consumer.kind();
    let multi_slot = consumer.category().is_multi_slot();
    for (slot, required) in kind.required_params().iter().enumerate() {
      if reported.contains(&(SlotRole::Param, slot)) {
        continue;
      }
      let bound = if multi_slot {
        bindings.params.get(slot).copied().flatten()
      } else {
        bindings.source
      };
      if let Err(reason) = self.verify_slot(SlotRole::Param, slot, required, bound) {
        failures.push(failure(reason));
      }
    }
    for (slot, required) in kind.required_targets().iter().enumerate() {
      if reported.contains(&(SlotRole::Target, slot)) {
        continue;
      }
      let bound = bindings.targets.get(slot).copied().flatten();
      if let Err(reason) = self.verify_slot(SlotRole::Target, slot, required, bound) {
        failures.push(failure(reason));
      }
    }

    if consumer.category() == ComponentCategory::Condition && bindings.affected.is_none() {
      failures.push(failure(FailureReason::MissingAffect));
    }
    failures
  }

  fn bind_param(
    &self,
    consumer: &Component,
    reference: &ComponentReference,
    bindings: &mut SlotBindings,
  ) -> Result<(), FailureReason> {
    let slot = reference.consumer_slot();
    let required = consumer.kind().required_params();
    let Some(required_type) = required.get(slot) else {
      return Err(FailureReason::SlotOutOfRange {
        role: SlotRole::Param,
        slot,
        declared: required.len(),
      });
    };

    let provider = reference.provider();
    let (index, provided) = match provider.kind() {
      ComponentKind::Trigger(logic) => {
        let types = logic.provided_types();
        let trigger_slot = reference.trigger_slot();
        let Some(provided) = types.get(trigger_slot) else {
          return Err(FailureReason::TriggerSlotOutOfRange {
            slot: trigger_slot,
            provided: types.len(),
          });
        };
        (provider.self_index() + trigger_slot, provided.clone())
      }
      ComponentKind::FreeParam(logic) => (provider.self_index(), logic.provided_type()),
      ComponentKind::ParamProcessor(logic) => (provider.self_index(), logic.output_type()),
      _ => {
        return Err(FailureReason::WrongProvider {
          role: SlotRole::Param,
          slot,
          provider: provider.category(),
        });
      }
    };

    self.ensure_assignable(SlotRole::Param, slot, required_type, &provided, provider, index)?;
    if consumer.category().is_multi_slot() {
      if let Some(binding) = bindings.params.get_mut(slot) {
        *binding = Some(index);
      }
    } else {
      bindings.source = Some(index);
    }
    Ok(())
  }

  fn bind_target(
    &self,
    consumer: &Component,
    reference: &ComponentReference,
    bindings: &mut SlotBindings,
  ) -> Result<(), FailureReason> {
    let slot = reference.consumer_slot();
    let required = consumer.kind().required_targets();
    let Some(required_type) = required.get(slot) else {
      return Err(FailureReason::SlotOutOfRange {
        role: SlotRole::Target,
        slot,
        declared: required.len(),
      });
    };

    let provider = reference.provider();
    let provided = match provider.kind() {
      ComponentKind::TargetSearch(logic) => logic.target_type(),
      ComponentKind::ParamTargetConvertor(logic) => logic.target_type(),
      _ => {
        return Err(FailureReason::WrongProvider {
          role: SlotRole::Target,
          slot,
          provider: provider.category(),
        });
      }
    };

    let index = provider.self_index();
    self.ensure_assignable(SlotRole::Target, slot, required_type, &provided, provider, index)?;
    if let Some(binding) = bindings.targets.get_mut(slot) {
      *binding = Some(index);
    }
    Ok(())
  }

  fn ensure_assignable(
    &self,
    role: SlotRole,
    slot: usize,
    required: &ParamType,
    provided: &ParamType,
    provider: &Component,
    provider_index: usize,
  ) -> Result<(), FailureReason> {
    if self.registry.is_assignable(required, provided) {
      return Ok(());
    }
    Err(FailureReason::TypeMismatch {
      role,
      slot,
      required: required.clone(),
      provided: provided.clone(),
      provider: provider.category(),
      provider_index,
    })
  }

  /// Final check of one declared slot against the member it is bound to.
  fn verify_slot(
    &self,
    role: SlotRole,
    slot: usize,
    required: &ParamType,
    bound: Option<usize>,
  ) -> Result<(), FailureReason> {
    let Some(index) = bound else {
      return Err(FailureReason::UnboundSlot { role, slot });
    };
    let Some((provider, provided)) = self.provided_at(role, index) else {
      return Err(FailureReason::DanglingBinding { role, slot, index });
    };
    self.ensure_assignable(role, slot, required, &provided, provider, index)
  }

  /// The member at `index` and the type it supplies in `role`.
  fn provided_at(&self, role: SlotRole, index: usize) -> Option<(&Component, ParamType)> {
    let component = self.component_at(index)?;
    if !component.is_owned_by(self.id) {
      return None;
    }
    let provided = match (role, component.kind()) {
      (SlotRole::Param, ComponentKind::Trigger(logic)) => {
        let position = index.checked_sub(component.self_index())?;
        logic.provided_types().get(position).cloned()
      }
      (SlotRole::Param, ComponentKind::FreeParam(logic)) => Some(logic.provided_type()),
      (SlotRole::Param, ComponentKind::ParamProcessor(logic)) => Some(logic.output_type()),
      (SlotRole::Target, ComponentKind::TargetSearch(logic)) => Some(logic.target_type()),
      (SlotRole::Target, ComponentKind::ParamTargetConvertor(logic)) => Some(logic.target_type()),
      _ => None,
    }?;
    Some((component, provided))
  }

  /// Processors whose source chain loops back on itself.
  ///
  /// Each processor has at most one source, so following sources from any
  /// processor either leaves the processors or revisits one. Grey marks the
  /// walk in progress; reaching a grey processor closes a cycle.
  fn processor_cycles(&self) -> Vec<ValidationFailure> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
      White,
      Grey,
      Black,
    }

    let processors: HashMap<usize, &Component> = self
      .param_processors
      .iter()
      .map(|processor| (processor.self_index(), processor))
      .collect();
    let source_of = |index: usize| {
      processors
        .get(&index)
        .and_then(|processor| processor.bindings().source)
        .filter(|source| processors.contains_key(source))
    };

    let mut marks: HashMap<usize, Mark> = processors
      .keys()
      .map(|&index| (index, Mark::White))
      .collect();
    let mut on_cycle = Vec::new();

    let mut starts: Vec<usize> = processors.keys().copied().collect();
    starts.sort_unstable();
    for start in starts {
      let mut path = Vec::new();
      let mut current = Some(start);
      while let Some(index) = current {
        match marks.get(&index).copied() {
          Some(Mark::White) => {
            marks.insert(index, Mark::Grey);
            path.push(index);
            current = source_of(index);
          }
          Some(Mark::Grey) => {
            if let Some(position) = path.iter().position(|&visited| visited == index) {
              on_cycle.extend_from_slice(&path[position..]);
            }
            current = None;
          }
          _ => current = None,
        }
      }
      for index in path {
        marks.insert(index, Mark::Black);
      }
    }

    on_cycle.sort_unstable();
    on_cycle
      .into_iter()
      .filter_map(|index| processors.get(&index))
      .map(|processor| ValidationFailure {
        category: ComponentCategory::ParamProcessor,
        self_index: processor.self_index(),
        component: processor.type_name().to_string(),
        reason: FailureReason::ProcessorCycle,
      })
      .collect()
  }
}

/// Step 1: references reading the same provider slot the same way, and
/// slots filled by more than one distinct reference.
fn conflicts(references: &[ComponentReference]) -> Vec<FailureReason> {
  let mut reasons = Vec::new();

  for reference in references {
    let same = references
      .iter()
      .filter(|sibling| sibling.is_same_target(reference))
      .count();
    if same > 1 {
      reasons.push(FailureReason::DuplicateTarget {
        provider: reference.provider().category(),
        provider_index: reference.provider().self_index(),
      });
    }
  }

  let mut fills: BTreeMap<(SlotRole, usize), HashSet<ReferenceKey>> = BTreeMap::new();
  let mut affects = HashSet::new();
  for reference in references {
    let flags = reference.flags();
    let slot = reference.consumer_slot();
    if flags.param {
      fills
        .entry((SlotRole::Param, slot))
        .or_default()
        .insert(reference.key());
    }
    if flags.target {
      fills
        .entry((SlotRole::Target, slot))
        .or_default()
        .insert(reference.key());
    }
    if flags.affect {
      affects.insert(reference.key());
    }
  }

  for ((role, slot), keys) in fills {
    if keys.len() > 1 {
      reasons.push(FailureReason::SlotConflict { role, slot });
    }
  }
  if affects.len() > 1 {
    reasons.push(FailureReason::AffectConflict);
  }
  reasons
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use sigil_component::{
    ComponentContext, ComponentLogic, ConstantParam, Param, ParamProcessorLogic, StandardActivity,
    StaticTrigger,
  };
  use sigil_registry::TypeRegistry;

  use super::*;
  use crate::reference::ReferenceSpec;

  const NUMBER: ParamType = ParamType::new("number");

  struct Identity;

  impl ComponentLogic for Identity {}

  impl ParamProcessorLogic for Identity {
    fn input_type(&self) -> ParamType {
      NUMBER
    }

    fn output_type(&self) -> ParamType {
      NUMBER
    }

    fn process(&self, _ctx: &ComponentContext, input: Param) -> Option<Param> {
      Some(input)
    }
  }

  fn combination() -> Combination {
    let mut registry = TypeRegistry::with_builtins();
    registry.register_type(NUMBER, None).unwrap();
    let mut combination = Combination::new("test", Arc::new(registry));
    combination
      .add(Component::trigger("trigger", StaticTrigger::new(vec![NUMBER])))
      .unwrap();
    combination
      .add(Component::activity(
        StandardActivity::NAME,
        StandardActivity::default(),
      ))
      .unwrap();
    combination
  }

  fn reasons(combination: &Combination) -> Vec<FailureReason> {
    combination
      .failures()
      .iter()
      .map(|failure| failure.reason.clone())
      .collect()
  }

  #[test]
  fn test_processor_chain_binds_source() {
    let mut combination = combination();
    let trigger = combination.trigger().cloned().unwrap();
    let first = Component::param_processor("identity", Identity);
    let second = Component::param_processor("identity", Identity);
    combination.add(first.clone()).unwrap();
    combination.add(second.clone()).unwrap();
    combination
      .add_reference(ReferenceSpec::param(&first, &trigger))
      .unwrap();
    combination
      .add_reference(ReferenceSpec::param(&second, &first))
      .unwrap();

    combination.check().unwrap();
    assert_eq!(first.bindings().source, Some(0));
    assert_eq!(second.bindings().source, Some(first.self_index()));
  }

  #[test]
  fn test_processor_cycle_flags_every_member() {
    let mut combination = combination();
    let trigger = combination.trigger().cloned().unwrap();
    let feeder = Component::param_processor("identity", Identity);
    let a = Component::param_processor("identity", Identity);
    let b = Component::param_processor("identity", Identity);
    for processor in [&feeder, &a, &b] {
      combination.add(processor.clone()).unwrap();
    }
    combination
      .add_reference(ReferenceSpec::param(&feeder, &trigger))
      .unwrap();
    combination.add_reference(ReferenceSpec::param(&a, &b)).unwrap();
    combination.add_reference(ReferenceSpec::param(&b, &a)).unwrap();

    assert!(combination.check().is_err());
    let cycle: Vec<usize> = combination
      .failures()
      .iter()
      .filter(|failure| failure.reason == FailureReason::ProcessorCycle)
      .map(|failure| failure.self_index)
      .collect();
    assert_eq!(cycle, vec![a.self_index(), b.self_index()]);
    assert_eq!(combination.failures().len(), 2);
  }

  #[test]
  fn test_self_sourcing_processor_is_a_cycle() {
    let mut combination = combination();
    let looped = Component::param_processor("identity", Identity);
    combination.add(looped.clone()).unwrap();
    combination
      .add_reference(ReferenceSpec::param(&looped, &looped))
      .unwrap();

    assert!(combination.check().is_err());
    assert_eq!(reasons(&combination), vec![FailureReason::ProcessorCycle]);
  }

  #[test]
  fn test_slot_conflict_stops_the_visit() {
    let mut combination = combination();
    let trigger = combination.trigger().cloned().unwrap();
    let constant = Component::free_param("constant", ConstantParam::new(Param::new(NUMBER, 1.0)));
    let processor = Component::param_processor("identity", Identity);
    combination.add(constant.clone()).unwrap();
    combination.add(processor.clone()).unwrap();
    combination
      .add_reference(ReferenceSpec::param(&processor, &trigger))
      .unwrap();
    combination
      .add_reference(ReferenceSpec::param(&processor, &constant))
      .unwrap();

    assert!(combination.check().is_err());
    assert_eq!(
      reasons(&combination),
      vec![FailureReason::SlotConflict {
        role: SlotRole::Param,
        slot: 0
      }]
    );
    assert_eq!(processor.bindings().source, None);
  }

  #[test]
  fn test_binding_to_a_missing_index_dangles() {
    let mut combination = combination();
    combination.reindex().unwrap();
    assert_eq!(
      combination.verify_slot(SlotRole::Param, 0, &NUMBER, Some(0)),
      Ok(())
    );
    assert_eq!(
      combination.verify_slot(SlotRole::Param, 0, &NUMBER, Some(9)),
      Err(FailureReason::DanglingBinding {
        role: SlotRole::Param,
        slot: 0,
        index: 9
      })
    );
    // The activity is a member but supplies no params.
    assert_eq!(
      combination.verify_slot(SlotRole::Param, 0, &NUMBER, Some(1)),
      Err(FailureReason::DanglingBinding {
        role: SlotRole::Param,
        slot: 0,
        index: 1
      })
    );
  }

  #[test]
  fn test_conflicts_flag_every_duplicate() {
    let trigger = Component::trigger("trigger", StaticTrigger::new(vec![NUMBER]));
    let consumer = Component::param_processor("identity", Identity);
    let reference = ComponentReference::new(ReferenceSpec::param(&consumer, &trigger));

    let reasons = conflicts(&[reference.clone(), reference]);
    assert_eq!(
      reasons,
      vec![
        FailureReason::DuplicateTarget {
          provider: ComponentCategory::Trigger,
          provider_index: 0,
        },
        FailureReason::DuplicateTarget {
          provider: ComponentCategory::Trigger,
          provider_index: 0,
        },
      ]
    );
  }
}
