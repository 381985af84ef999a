//! Integration tests for flattening and restoring effect graphs.

use std::sync::Arc;

use async_trait::async_trait;
use sigil_component::{
  Component, ComponentCategory, ComponentContext, ComponentKind, ComponentLogic, ConditionLogic,
  ConstantParam, LineCombiner, Param, ParamProcessorLogic, ParamType, SlotBindings,
  StandardActivity, StaticTrigger,
};
use sigil_config::{EffectRecord, SlotRecord};
use sigil_effect::{EffectParts, RecordError, SingleEffect};
use sigil_registry::TypeRegistry;

const HP: ParamType = ParamType::new("hp");

struct Halve;

impl ComponentLogic for Halve {}

impl ParamProcessorLogic for Halve {
  fn input_type(&self) -> ParamType {
    HP
  }

  fn output_type(&self) -> ParamType {
    HP
  }

  fn process(&self, _ctx: &ComponentContext, input: Param) -> Option<Param> {
    Some(Param::new(HP, input.value.as_f64()? / 2.0))
  }
}

/// Passes when the hp parameter is above the second number.
struct Above;

impl ComponentLogic for Above {}

#[async_trait]
impl ConditionLogic for Above {
  fn required_types(&self) -> Vec<ParamType> {
    vec![HP]
  }

  async fn check(&self, ctx: &ComponentContext, params: &[Param]) -> bool {
    let threshold = ctx.number(1).unwrap_or_default();
    params
      .first()
      .and_then(|p| p.value.as_f64())
      .is_some_and(|hp| hp > threshold)
  }
}

fn registry() -> TypeRegistry {
  let mut registry = TypeRegistry::with_builtins();
  registry.register_type(HP, None).unwrap();
  registry
    .register_component("on_hit", || {
      ComponentKind::Trigger(Arc::new(StaticTrigger::new(vec![HP])))
    })
    .unwrap();
  registry
    .register_component("halve", || ComponentKind::ParamProcessor(Arc::new(Halve)))
    .unwrap();
  registry
    .register_component("above", || ComponentKind::Condition(Arc::new(Above)))
    .unwrap();
  registry
}

fn extra_registry() -> TypeRegistry {
  let mut registry = TypeRegistry::new();
  registry
    .register_component("ten", || {
      ComponentKind::FreeParam(Arc::new(ConstantParam::new(Param::new(HP, 10.0))))
    })
    .unwrap();
  registry
}

fn place(component: Option<Component>, index: usize, bindings: SlotBindings) -> Component {
  let component = component.unwrap();
  component.set_self_index(index);
  if component.category().is_consumer() {
    component.set_bindings(bindings);
  }
  component
}

/// on_hit at 0, ten at 1, halve at 2, above at 3, activity at 4.
fn build(registry: &TypeRegistry, extra: &TypeRegistry) -> SingleEffect {
  let mut parts = EffectParts::new("bleed");
  parts.insert(place(
    registry.instantiate("on_hit"),
    0,
    SlotBindings::default(),
  ));
  parts.insert(place(extra.instantiate("ten"), 1, SlotBindings::default()));
  parts.insert(place(
    registry.instantiate("halve"),
    2,
    SlotBindings {
      source: Some(0),
      ..SlotBindings::default()
    },
  ));
  parts.insert(
    place(
      registry.instantiate("above"),
      3,
      SlotBindings {
        params: vec![Some(2)],
        affected: Some(0),
        ..SlotBindings::default()
      },
    )
    .with_numbers(vec![0.25, 12.5]),
  );
  parts.insert(place(
    registry.instantiate(StandardActivity::NAME),
    4,
    SlotBindings::default(),
  ));
  parts.combiner = registry
    .combiner(LineCombiner::NAME)
    .map(|combiner| (LineCombiner::NAME.to_string(), combiner));
  SingleEffect::assemble(parts, None)
}

#[test]
fn test_round_trip_through_json() {
  let registry = registry();
  let extra = extra_registry();
  let original = build(&registry, &extra);
  let record = original.to_record();

  let json = serde_json::to_string(&record).unwrap();
  let parsed: EffectRecord = serde_json::from_str(&json).unwrap();
  let restored = SingleEffect::from_record(&parsed, &registry, &[&extra]).unwrap();

  assert_eq!(restored.to_record(), record);
  assert_eq!(restored.combiner_name(), Some(LineCombiner::NAME));

  let originals = original.components();
  let restored_components = restored.components();
  assert_eq!(originals.len(), restored_components.len());
  for (a, b) in originals.iter().zip(&restored_components) {
    assert_eq!(a.self_index(), b.self_index());
    assert_eq!(a.bindings(), b.bindings());
    let bits = |numbers: Vec<f64>| numbers.into_iter().map(f64::to_bits).collect::<Vec<_>>();
    assert_eq!(bits(a.numbers()), bits(b.numbers()));
    assert!(b.is_owned_by(restored.owner()));
  }
}

#[test]
fn test_record_shape() {
  let registry = registry();
  let extra = extra_registry();
  let record = build(&registry, &extra).to_record();

  assert_eq!(record.effect_id, "bleed");
  let condition = record.component_at(3).unwrap();
  assert_eq!(condition.category, ComponentCategory::Condition);
  assert_eq!(condition.numbers, vec![0.25, 12.5]);
  assert_eq!(
    condition.slots,
    SlotRecord {
      params: vec![Some(2)],
      affected: Some(0),
      ..SlotRecord::default()
    }
  );
  assert!(record.component_at(1).unwrap().slots.is_empty());
}

#[tokio::test]
async fn test_restored_graph_fires() {
  let registry = registry();
  let extra = extra_registry();
  let record = build(&registry, &extra).to_record();
  let restored = SingleEffect::from_record(&record, &registry, &[&extra]).unwrap();

  // The threshold is the restored second number, 12.5: 30 halved passes, 20 halved does not.
  let outcome = restored.triggered(vec![Param::new(HP, 30.0)]).await;
  assert_ne!(outcome, sigil_effect::FiringOutcome::Gated);

  let outcome = restored.triggered(vec![Param::new(HP, 20.0)]).await;
  assert_eq!(outcome, sigil_effect::FiringOutcome::Gated);
}

#[test]
fn test_unknown_type_without_extra_registry() {
  let registry = registry();
  let extra = extra_registry();
  let record = build(&registry, &extra).to_record();

  let result = SingleEffect::from_record(&record, &registry, &[]);
  assert!(matches!(
    result,
    Err(RecordError::UnknownComponentType { name }) if name == "ten"
  ));
}

#[test]
fn test_category_mismatch() {
  let registry = registry();
  let extra = extra_registry();
  let mut record = build(&registry, &extra).to_record();
  record.components[2].type_name = "above".to_string();

  let result = SingleEffect::from_record(&record, &registry, &[&extra]);
  assert!(matches!(
    result,
    Err(RecordError::CategoryMismatch {
      expected: ComponentCategory::ParamProcessor,
      found: ComponentCategory::Condition,
      ..
    })
  ));
}

#[test]
fn test_missing_activity_and_duplicate_trigger() {
  let registry = registry();
  let extra = extra_registry();
  let record = build(&registry, &extra).to_record();

  let mut without_activity = record.clone();
  without_activity
    .components
    .retain(|c| c.category != ComponentCategory::Activity);
  assert!(matches!(
    SingleEffect::from_record(&without_activity, &registry, &[&extra]),
    Err(RecordError::Incomplete {
      category: ComponentCategory::Activity
    })
  ));

  let mut two_triggers = record.clone();
  two_triggers.components.push(record.components[0].clone());
  assert!(matches!(
    SingleEffect::from_record(&two_triggers, &registry, &[&extra]),
    Err(RecordError::DuplicateSingleton {
      category: ComponentCategory::Trigger
    })
  ));
}

#[test]
fn test_unknown_combiner() {
  let registry = registry();
  let extra = extra_registry();
  let mut record = build(&registry, &extra).to_record();
  record.combiner = Some("fancy".to_string());

  assert!(matches!(
    SingleEffect::from_record(&record, &registry, &[&extra]),
    Err(RecordError::UnknownCombiner { name }) if name == "fancy"
  ));
}
