//! The sample component set the CLI builds, persists and fires.

use std::sync::Arc;

use async_trait::async_trait;
use sigil_combination::{Combination, ReferenceFlags, ReferenceSpec};
use sigil_component::{
  Component, ComponentContext, ComponentKind, ComponentLogic, ConditionLogic, ConstantParam,
  DescriptionProcessor, EffectError, EffectLogic, LineCombiner, Param, ParamProcessorLogic,
  ParamType, StandardActivity, StaticTrigger, Target, TargetSearchLogic,
};
use sigil_registry::{RegistryError, TypeRegistry};
use tracing::info;

pub const NUMBER: ParamType = ParamType::new("number");
pub const DAMAGE: ParamType = ParamType::new("damage");
pub const UNIT: ParamType = ParamType::new("unit");

const CAST: &str = "demo/cast";
const BONUS: &str = "demo/bonus";
const AMPLIFY: &str = "demo/amplify";
const PARTY: &str = "demo/party";
const POSITIVE: &str = "demo/positive";
const ALIVE: &str = "demo/alive";
const STRIKE: &str = "demo/strike";

/// Multiplies a number by the component's first tunable number.
struct Amplify;

impl ComponentLogic for Amplify {
  fn description(&self) -> Option<&dyn DescriptionProcessor> {
    Some(self)
  }
}

impl DescriptionProcessor for Amplify {
  fn main(&self, ctx: &ComponentContext) -> String {
    format!("power x{}", ctx.number(0).unwrap_or(1.0))
  }
}

impl ParamProcessorLogic for Amplify {
  fn input_type(&self) -> ParamType {
    NUMBER
  }

  fn output_type(&self) -> ParamType {
    DAMAGE
  }

  fn process(&self, ctx: &ComponentContext, input: Param) -> Option<Param> {
    let value = input.value.as_f64()?;
    Some(Param::new(DAMAGE, value * ctx.number(0).unwrap_or(1.0)))
  }
}

/// Everyone on the field.
struct Party;

impl ComponentLogic for Party {}

#[async_trait]
impl TargetSearchLogic for Party {
  fn target_type(&self) -> ParamType {
    UNIT
  }

  async fn all_targets(&self, _ctx: &ComponentContext) -> Vec<Target> {
    ["knight", "ghost", "archer", "mage"]
      .into_iter()
      .map(|name| Param::new(UNIT, name))
      .collect()
  }
}

/// Lets the cast through only with a positive power.
struct Positive;

impl ComponentLogic for Positive {}

#[async_trait]
impl ConditionLogic for Positive {
  fn required_types(&self) -> Vec<ParamType> {
    vec![NUMBER]
  }

  async fn check(&self, _ctx: &ComponentContext, params: &[Param]) -> bool {
    params
      .first()
      .and_then(|param| param.value.as_f64())
      .is_some_and(|value| value > 0.0)
  }
}

/// Filters ghosts out of a target search.
struct Alive;

impl ComponentLogic for Alive {}

#[async_trait]
impl ConditionLogic for Alive {
  fn required_types(&self) -> Vec<ParamType> {
    vec![]
  }

  async fn check(&self, _ctx: &ComponentContext, params: &[Param]) -> bool {
    params.last().is_some_and(|unit| unit.value != "ghost")
  }
}

/// Deals bonus plus amplified damage to every target.
struct Strike;

impl ComponentLogic for Strike {
  fn description(&self) -> Option<&dyn DescriptionProcessor> {
    Some(self)
  }
}

impl DescriptionProcessor for Strike {
  fn main(&self, _ctx: &ComponentContext) -> String {
    "strike every living unit".to_string()
  }
}

#[async_trait]
impl EffectLogic for Strike {
  fn required_param_types(&self) -> Vec<ParamType> {
    vec![DAMAGE, DAMAGE]
  }

  fn required_target_types(&self) -> Vec<ParamType> {
    vec![UNIT]
  }

  async fn apply(
    &self,
    ctx: &ComponentContext,
    params: &[Param],
    targets: &[Vec<Target>],
  ) -> Result<(), EffectError> {
    let mut total = 0.0;
    for (slot, param) in params.iter().enumerate() {
      total += param.value.as_f64().ok_or_else(|| EffectError::InvalidParam {
        slot,
        message: format!("expected a number, got {}", param.value),
      })?;
    }
    for unit in targets.iter().flatten() {
      info!(self_index = ctx.self_index, unit = %unit.value, damage = total, "strike");
    }
    Ok(())
  }
}

/// The registry every demo record is restored with.
pub fn registry() -> Result<TypeRegistry, RegistryError> {
  let mut registry = TypeRegistry::with_builtins();
  registry.register_type(NUMBER, None)?;
  registry.register_type(DAMAGE, Some(NUMBER))?;
  registry.register_type(UNIT, None)?;

  registry.register_component(CAST, || {
    ComponentKind::Trigger(Arc::new(StaticTrigger::new(vec![NUMBER])))
  })?;
  registry.register_component(BONUS, || {
    ComponentKind::FreeParam(Arc::new(ConstantParam::new(Param::new(DAMAGE, 5.0))))
  })?;
  registry.register_component(AMPLIFY, || ComponentKind::ParamProcessor(Arc::new(Amplify)))?;
  registry.register_component(PARTY, || ComponentKind::TargetSearch(Arc::new(Party)))?;
  registry.register_component(POSITIVE, || ComponentKind::Condition(Arc::new(Positive)))?;
  registry.register_component(ALIVE, || ComponentKind::Condition(Arc::new(Alive)))?;
  registry.register_component(STRIKE, || ComponentKind::Effect(Arc::new(Strike)))?;
  Ok(registry)
}

fn instantiate(registry: &TypeRegistry, name: &str) -> anyhow::Result<Component> {
  registry
    .instantiate(name)
    .ok_or_else(|| anyhow::anyhow!("demo component not registered: {name}"))
}

/// Build the sample combination.
///
/// With `incomplete`, the strike's second damage slot is left unwired so
/// validation has something to report.
pub fn combination(registry: Arc<TypeRegistry>, incomplete: bool) -> anyhow::Result<Combination> {
  let trigger = instantiate(&registry, CAST)?;
  let activity = instantiate(&registry, StandardActivity::NAME)?;
  let bonus = instantiate(&registry, BONUS)?;
  let amplify = instantiate(&registry, AMPLIFY)?.with_numbers(vec![2.0]);
  let party = instantiate(&registry, PARTY)?;
  let positive = instantiate(&registry, POSITIVE)?;
  let alive = instantiate(&registry, ALIVE)?;
  let strike = instantiate(&registry, STRIKE)?;

  let mut combination = Combination::new("demo", registry);
  combination.set_combiner(LineCombiner::NAME)?;
  for component in [&trigger, &activity, &bonus, &amplify, &party, &positive, &alive, &strike] {
    combination.add(component.clone())?;
  }

  let mut references = vec![
    ReferenceSpec::param(&amplify, &trigger),
    ReferenceSpec::new(&positive, &trigger, ReferenceFlags::PARAM_AND_AFFECT).at_slot(0),
    ReferenceSpec::affect(&alive, &party),
    ReferenceSpec::param(&strike, &bonus).at_slot(0),
    ReferenceSpec::target(&strike, &party).at_slot(0),
  ];
  if !incomplete {
    references.push(ReferenceSpec::param(&strike, &amplify).at_slot(1));
  }
  for reference in references {
    combination.add_reference(reference)?;
  }
  Ok(combination)
}

#[cfg(test)]
mod tests {
  use super::*;

  use sigil_combination::{CombinationError, FailureReason, SlotRole};
  use sigil_effect::{FiringOutcome, SingleEffect};

  fn shared_registry() -> Arc<TypeRegistry> {
    Arc::new(registry().unwrap())
  }

  #[tokio::test]
  async fn test_demo_graph_fires() {
    let registry = shared_registry();
    let effect = combination(registry.clone(), false)
      .unwrap()
      .get_result()
      .unwrap();

    let outcome = effect.triggered(vec![Param::new(NUMBER, 3.0)]).await;
    assert!(matches!(outcome, FiringOutcome::Dispatched { .. }));
    assert_eq!(outcome.applied().len(), 1);

    let gated = effect.triggered(vec![Param::new(NUMBER, -1.0)]).await;
    assert_eq!(gated, FiringOutcome::Gated);
  }

  #[test]
  fn test_incomplete_demo_reports_unbound_slot() {
    let mut combination = combination(shared_registry(), true).unwrap();
    let err = combination.check().unwrap_err();
    assert!(matches!(err, CombinationError::FailingComponents { .. }));
    assert_eq!(combination.failures().len(), 1);
    assert_eq!(
      combination.failures()[0].reason,
      FailureReason::UnboundSlot {
        role: SlotRole::Param,
        slot: 1
      }
    );
  }

  #[test]
  fn test_demo_record_restores_with_registry() {
    let registry = shared_registry();
    let effect = combination(registry.clone(), false)
      .unwrap()
      .get_result()
      .unwrap();
    let record = effect.to_record();

    let restored = SingleEffect::from_record(&record, &registry, &[]).unwrap();
    assert_eq!(restored.to_record(), record);
    assert_eq!(
      restored.describe().unwrap(),
      "damage = 5.0\npower x2\nstrike every living unit"
    );
  }
}
