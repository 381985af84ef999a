//! Components that ship with sigil.

use sigil_config::{ActivitySettings, CheckMode};

use crate::description::DescriptionProcessor;
use crate::logic::{ActivityLogic, ComponentContext, ComponentLogic, FreeParamLogic, TriggerLogic};
use crate::strategy::{
  CheckCombinator, ConcurrentAll, EffectDispatcher, SequentialAll, SequentialDispatcher,
};
use crate::types::{Param, ParamType};

/// A trigger that only declares the types of the values it fires with.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticTrigger {
  types: Vec<ParamType>,
}

impl StaticTrigger {
  pub const NAME: &'static str = "sigil/static-trigger";

  pub fn new(types: Vec<ParamType>) -> Self {
    Self { types }
  }
}

impl ComponentLogic for StaticTrigger {}

impl TriggerLogic for StaticTrigger {
  fn provided_types(&self) -> Vec<ParamType> {
    self.types.clone()
  }
}

/// A free parameter with a fixed value.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantParam {
  param: Param,
}

impl ConstantParam {
  pub const NAME: &'static str = "sigil/constant";

  pub fn new(param: Param) -> Self {
    Self { param }
  }
}

impl ComponentLogic for ConstantParam {
  fn description(&self) -> Option<&dyn DescriptionProcessor> {
    Some(self)
  }
}

impl DescriptionProcessor for ConstantParam {
  fn main(&self, _ctx: &ComponentContext) -> String {
    format!("{} = {}", self.param.ty, self.param.value)
  }
}

impl FreeParamLogic for ConstantParam {
  fn provided_type(&self) -> ParamType {
    self.param.ty.clone()
  }

  fn value(&self, _ctx: &ComponentContext) -> Option<Param> {
    Some(self.param.clone())
  }
}

enum Combinator {
  Sequential(SequentialAll),
  Concurrent(ConcurrentAll),
}

/// The default orchestrator, configured by [`ActivitySettings`].
pub struct StandardActivity {
  settings: ActivitySettings,
  combinator: Combinator,
  dispatcher: SequentialDispatcher,
}

impl StandardActivity {
  pub const NAME: &'static str = "sigil/standard-activity";

  pub fn new(settings: ActivitySettings) -> Self {
    let combinator = match settings.check_mode {
      CheckMode::Sequential => Combinator::Sequential(SequentialAll),
      CheckMode::Concurrent => Combinator::Concurrent(ConcurrentAll),
    };
    Self {
      settings,
      combinator,
      dispatcher: SequentialDispatcher::new(settings.dispatch_policy),
    }
  }

  pub fn settings(&self) -> ActivitySettings {
    self.settings
  }
}

impl Default for StandardActivity {
  fn default() -> Self {
    Self::new(ActivitySettings::default())
  }
}

impl ComponentLogic for StandardActivity {}

impl ActivityLogic for StandardActivity {
  fn combinator(&self) -> &dyn CheckCombinator {
    match &self.combinator {
      Combinator::Sequential(combinator) => combinator,
      Combinator::Concurrent(combinator) => combinator,
    }
  }

  fn dispatcher(&self) -> &dyn EffectDispatcher {
    &self.dispatcher
  }
}
