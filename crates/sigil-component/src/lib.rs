//! Sigil Component
//!
//! The building blocks an effect graph is assembled from. Every block is a
//! [`Component`]: a cheap-to-clone handle over a [`ComponentKind`] (the
//! author-supplied logic for one of the eight categories) and the shared
//! state every block carries (owner, self-index, numbers, slot bindings).
//!
//! Author logic is plugged in through one trait per category:
//!
//! | category | trait |
//! |---|---|
//! | Trigger | [`TriggerLogic`] |
//! | FreeParam | [`FreeParamLogic`] |
//! | ParamProcessor | [`ParamProcessorLogic`] |
//! | TargetSearch | [`TargetSearchLogic`] |
//! | ParamTargetConvertor | [`ParamTargetConvertorLogic`] |
//! | Condition | [`ConditionLogic`] |
//! | Effect | [`EffectLogic`] |
//! | Activity | [`ActivityLogic`] |
//!
//! All of them extend [`ComponentLogic`], which carries the lifecycle and
//! description hooks.

mod builtin;
mod component;
mod description;
mod error;
mod id;
mod logic;
mod strategy;
mod types;

pub use builtin::{ConstantParam, StandardActivity, StaticTrigger};
pub use component::{Component, ComponentKind, SlotBindings};
pub use description::{
  ComponentDescription, DescriptionCombiner, DescriptionProcessor, LineCombiner,
};
pub use error::EffectError;
pub use id::{ComponentId, OwnerId};
pub use logic::{
  ActivityLogic, ComponentContext, ComponentLogic, ConditionLogic, EffectLogic, FreeParamLogic,
  ParamProcessorLogic, ParamTargetConvertorLogic, TargetSearchLogic, TriggerLogic,
};
pub use sigil_config::ComponentCategory;
pub use strategy::{
  CheckCombinator, ConcurrentAll, DispatchReport, EffectDispatcher, GateCheck, ResolvedEffect,
  SequentialAll, SequentialDispatcher,
};
pub use types::{Param, ParamType, Target};
