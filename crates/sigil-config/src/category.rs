use std::fmt;

use serde::{Deserialize, Serialize};

/// The eight kinds of building block an effect graph is assembled from.
///
/// The declaration order is the order self-indices are assigned in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentCategory {
  Trigger,
  FreeParam,
  ParamProcessor,
  TargetSearch,
  ParamTargetConvertor,
  Condition,
  Effect,
  Activity,
}

impl ComponentCategory {
  /// Categories in self-index order.
  pub const INDEX_ORDER: [ComponentCategory; 8] = [
    ComponentCategory::Trigger,
    ComponentCategory::FreeParam,
    ComponentCategory::ParamProcessor,
    ComponentCategory::TargetSearch,
    ComponentCategory::ParamTargetConvertor,
    ComponentCategory::Condition,
    ComponentCategory::Effect,
    ComponentCategory::Activity,
  ];

  /// Categories in lifecycle (init) order.
  pub const INIT_ORDER: [ComponentCategory; 8] = [
    ComponentCategory::Trigger,
    ComponentCategory::FreeParam,
    ComponentCategory::ParamProcessor,
    ComponentCategory::Condition,
    ComponentCategory::TargetSearch,
    ComponentCategory::ParamTargetConvertor,
    ComponentCategory::Activity,
    ComponentCategory::Effect,
  ];

  /// Whether this category may sit at the consuming end of a reference.
  pub fn is_consumer(self) -> bool {
    matches!(
      self,
      ComponentCategory::ParamProcessor
        | ComponentCategory::ParamTargetConvertor
        | ComponentCategory::Condition
        | ComponentCategory::Effect
    )
  }

  /// Whether a consumer of this category has more than one required slot.
  pub fn is_multi_slot(self) -> bool {
    matches!(self, ComponentCategory::Condition | ComponentCategory::Effect)
  }

  /// Whether this category can supply a parameter value.
  pub fn provides_param(self) -> bool {
    matches!(
      self,
      ComponentCategory::Trigger | ComponentCategory::FreeParam | ComponentCategory::ParamProcessor
    )
  }

  /// Whether this category can supply a target list.
  pub fn provides_targets(self) -> bool {
    matches!(
      self,
      ComponentCategory::TargetSearch | ComponentCategory::ParamTargetConvertor
    )
  }

  /// Whether a condition can gate a component of this category.
  pub fn is_affectable(self) -> bool {
    matches!(
      self,
      ComponentCategory::Trigger | ComponentCategory::TargetSearch
    )
  }
}

impl fmt::Display for ComponentCategory {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      ComponentCategory::Trigger => "trigger",
      ComponentCategory::FreeParam => "free param",
      ComponentCategory::ParamProcessor => "param processor",
      ComponentCategory::TargetSearch => "target search",
      ComponentCategory::ParamTargetConvertor => "param target convertor",
      ComponentCategory::Condition => "condition",
      ComponentCategory::Effect => "effect",
      ComponentCategory::Activity => "activity",
    };
    f.write_str(name)
  }
}
