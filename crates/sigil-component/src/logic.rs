//! Capability traits implemented by author-supplied components.

use async_trait::async_trait;

use crate::description::DescriptionProcessor;
use crate::error::EffectError;
use crate::strategy::{CheckCombinator, EffectDispatcher};
use crate::types::{Param, ParamType, Target};

/// What a component sees of itself while one of its hooks runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentContext {
  pub self_index: usize,
  pub numbers: Vec<f64>,
}

impl ComponentContext {
  /// The author-tunable number at `position`, if set.
  pub fn number(&self, position: usize) -> Option<f64> {
    self.numbers.get(position).copied()
  }
}

/// Hooks shared by every component category.
pub trait ComponentLogic: Send + Sync {
  /// Called when the owning graph is activated.
  fn init(&self, _ctx: &ComponentContext) {}

  /// Called when the owning graph is torn down.
  fn destroy(&self, _ctx: &ComponentContext) {}

  fn description(&self) -> Option<&dyn DescriptionProcessor> {
    None
  }
}

/// The single entry point of a graph. Its values are supplied when it fires.
pub trait TriggerLogic: ComponentLogic {
  fn provided_types(&self) -> Vec<ParamType>;
}

/// A parameter source with no upstream dependency.
pub trait FreeParamLogic: ComponentLogic {
  fn provided_type(&self) -> ParamType;

  fn value(&self, ctx: &ComponentContext) -> Option<Param>;
}

/// Transforms one upstream parameter into another.
pub trait ParamProcessorLogic: ComponentLogic {
  fn input_type(&self) -> ParamType;

  fn output_type(&self) -> ParamType;

  fn process(&self, ctx: &ComponentContext, input: Param) -> Option<Param>;
}

/// Two-phase target provider: gather every candidate, then pick from the survivors.
#[async_trait]
pub trait TargetSearchLogic: ComponentLogic {
  fn target_type(&self) -> ParamType;

  async fn all_targets(&self, ctx: &ComponentContext) -> Vec<Target>;

  /// Reorder, sample or cap the candidates that passed their conditions.
  fn select_targets(&self, _ctx: &ComponentContext, candidates: Vec<Target>) -> Vec<Target> {
    candidates
  }
}

/// Turns one upstream parameter into a list of targets.
pub trait ParamTargetConvertorLogic: ComponentLogic {
  fn input_type(&self) -> ParamType;

  fn target_type(&self) -> ParamType;

  fn param_to_targets(&self, ctx: &ComponentContext, param: Param) -> Vec<Target>;
}

/// A boolean gate over resolved parameters.
///
/// When the condition gates a target search, the candidate under test is
/// appended after the declared parameters.
#[async_trait]
pub trait ConditionLogic: ComponentLogic {
  fn required_types(&self) -> Vec<ParamType>;

  async fn check(&self, ctx: &ComponentContext, params: &[Param]) -> bool;
}

/// The terminal action of a graph.
#[async_trait]
pub trait EffectLogic: ComponentLogic {
  fn required_param_types(&self) -> Vec<ParamType>;

  fn required_target_types(&self) -> Vec<ParamType>;

  async fn apply(
    &self,
    ctx: &ComponentContext,
    params: &[Param],
    targets: &[Vec<Target>],
  ) -> Result<(), EffectError>;
}

/// The orchestrator. It declares no slots; it picks how gates are combined
/// and how resolved effects are dispatched.
pub trait ActivityLogic: ComponentLogic {
  fn combinator(&self) -> &dyn CheckCombinator;

  fn dispatcher(&self) -> &dyn EffectDispatcher;
}
