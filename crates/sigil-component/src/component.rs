//! The component handle shared by combinations and effect graphs.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sigil_config::ComponentCategory;

use crate::description::ComponentDescription;
use crate::id::{ComponentId, OwnerId};
use crate::logic::{
  ActivityLogic, ComponentContext, ConditionLogic, EffectLogic, FreeParamLogic,
  ParamProcessorLogic, ParamTargetConvertorLogic, TargetSearchLogic, TriggerLogic,
};
use crate::types::ParamType;

/// Author logic for one component, tagged with its category.
#[derive(Clone)]
pub enum ComponentKind {
  Trigger(Arc<dyn TriggerLogic>),
  FreeParam(Arc<dyn FreeParamLogic>),
  ParamProcessor(Arc<dyn ParamProcessorLogic>),
  TargetSearch(Arc<dyn TargetSearchLogic>),
  ParamTargetConvertor(Arc<dyn ParamTargetConvertorLogic>),
  Condition(Arc<dyn ConditionLogic>),
  Effect(Arc<dyn EffectLogic>),
  Activity(Arc<dyn ActivityLogic>),
}

impl ComponentKind {
  pub fn category(&self) -> ComponentCategory {
    match self {
      ComponentKind::Trigger(_) => ComponentCategory::Trigger,
      ComponentKind::FreeParam(_) => ComponentCategory::FreeParam,
      ComponentKind::ParamProcessor(_) => ComponentCategory::ParamProcessor,
      ComponentKind::TargetSearch(_) => ComponentCategory::TargetSearch,
      ComponentKind::ParamTargetConvertor(_) => ComponentCategory::ParamTargetConvertor,
      ComponentKind::Condition(_) => ComponentCategory::Condition,
      ComponentKind::Effect(_) => ComponentCategory::Effect,
      ComponentKind::Activity(_) => ComponentCategory::Activity,
    }
  }

  /// Declared parameter requirements, one per slot.
  pub fn required_params(&self) -> Vec<ParamType> {
    match self {
      ComponentKind::ParamProcessor(logic) => vec![logic.input_type()],
      ComponentKind::ParamTargetConvertor(logic) => vec![logic.input_type()],
      ComponentKind::Condition(logic) => logic.required_types(),
      ComponentKind::Effect(logic) => logic.required_param_types(),
      _ => Vec::new(),
    }
  }

  /// Declared target-list requirements, one per slot.
  pub fn required_targets(&self) -> Vec<ParamType> {
    match self {
      ComponentKind::Effect(logic) => logic.required_target_types(),
      _ => Vec::new(),
    }
  }

  /// Types this component supplies, one per provided slot.
  pub fn provided_types(&self) -> Vec<ParamType> {
    match self {
      ComponentKind::Trigger(logic) => logic.provided_types(),
      ComponentKind::FreeParam(logic) => vec![logic.provided_type()],
      ComponentKind::ParamProcessor(logic) => vec![logic.output_type()],
      ComponentKind::TargetSearch(logic) => vec![logic.target_type()],
      ComponentKind::ParamTargetConvertor(logic) => vec![logic.target_type()],
      _ => Vec::new(),
    }
  }

  fn init(&self, ctx: &ComponentContext) {
    match self {
      ComponentKind::Trigger(logic) => logic.init(ctx),
      ComponentKind::FreeParam(logic) => logic.init(ctx),
      ComponentKind::ParamProcessor(logic) => logic.init(ctx),
      ComponentKind::TargetSearch(logic) => logic.init(ctx),
      ComponentKind::ParamTargetConvertor(logic) => logic.init(ctx),
      ComponentKind::Condition(logic) => logic.init(ctx),
      ComponentKind::Effect(logic) => logic.init(ctx),
      ComponentKind::Activity(logic) => logic.init(ctx),
    }
  }

  fn destroy(&self, ctx: &ComponentContext) {
    match self {
      ComponentKind::Trigger(logic) => logic.destroy(ctx),
      ComponentKind::FreeParam(logic) => logic.destroy(ctx),
      ComponentKind::ParamProcessor(logic) => logic.destroy(ctx),
      ComponentKind::TargetSearch(logic) => logic.destroy(ctx),
      ComponentKind::ParamTargetConvertor(logic) => logic.destroy(ctx),
      ComponentKind::Condition(logic) => logic.destroy(ctx),
      ComponentKind::Effect(logic) => logic.destroy(ctx),
      ComponentKind::Activity(logic) => logic.destroy(ctx),
    }
  }

  fn describe(&self, ctx: &ComponentContext) -> Option<(String, Vec<String>, Vec<String>)> {
    let processor = match self {
      ComponentKind::Trigger(logic) => logic.description(),
      ComponentKind::FreeParam(logic) => logic.description(),
      ComponentKind::ParamProcessor(logic) => logic.description(),
      ComponentKind::TargetSearch(logic) => logic.description(),
      ComponentKind::ParamTargetConvertor(logic) => logic.description(),
      ComponentKind::Condition(logic) => logic.description(),
      ComponentKind::Effect(logic) => logic.description(),
      ComponentKind::Activity(logic) => logic.description(),
    }?;

    let required_count = self.required_params().len() + self.required_targets().len();
    let required = (0..required_count)
      .filter_map(|slot| processor.required_slot(slot))
      .collect();
    let provided = (0..self.provided_types().len())
      .filter_map(|slot| processor.provided_slot(slot))
      .collect();
    let main = processor.rewrite(processor.main(ctx));

    Some((main, required, provided))
  }
}

/// Slot indices resolved by validation and baked into the component.
///
/// `source` is the single upstream slot of processors and convertors,
/// `params`/`targets` are the per-slot bindings of conditions and effects,
/// and `affected` is the index a condition gates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotBindings {
  pub source: Option<usize>,
  pub params: Vec<Option<usize>>,
  pub targets: Vec<Option<usize>>,
  pub affected: Option<usize>,
}

impl SlotBindings {
  /// Unbound slots shaped after the kind's declared requirements.
  pub fn unbound(kind: &ComponentKind) -> Self {
    match kind.category() {
      ComponentCategory::Condition => Self {
        params: vec![None; kind.required_params().len()],
        ..Self::default()
      },
      ComponentCategory::Effect => Self {
        params: vec![None; kind.required_params().len()],
        targets: vec![None; kind.required_targets().len()],
        ..Self::default()
      },
      _ => Self::default(),
    }
  }
}

#[derive(Debug)]
struct ComponentState {
  owner: Option<OwnerId>,
  self_index: usize,
  numbers: Vec<f64>,
  bindings: SlotBindings,
}

struct ComponentInner {
  id: ComponentId,
  type_name: String,
  kind: ComponentKind,
  state: Mutex<ComponentState>,
}

/// Shared handle to one building block.
///
/// Cloning the handle does not clone the component: every clone observes the
/// same owner, self-index and bindings. A component belongs to at most one
/// owner at a time.
#[derive(Clone)]
pub struct Component {
  inner: Arc<ComponentInner>,
}

impl Component {
  pub fn new(type_name: impl Into<String>, kind: ComponentKind) -> Self {
    let bindings = SlotBindings::unbound(&kind);
    Self {
      inner: Arc::new(ComponentInner {
        id: ComponentId::next(),
        type_name: type_name.into(),
        kind,
        state: Mutex::new(ComponentState {
          owner: None,
          self_index: 0,
          numbers: Vec::new(),
          bindings,
        }),
      }),
    }
  }

  pub fn trigger(type_name: impl Into<String>, logic: impl TriggerLogic + 'static) -> Self {
    Self::new(type_name, ComponentKind::Trigger(Arc::new(logic)))
  }

  pub fn free_param(type_name: impl Into<String>, logic: impl FreeParamLogic + 'static) -> Self {
    Self::new(type_name, ComponentKind::FreeParam(Arc::new(logic)))
  }

  pub fn param_processor(
    type_name: impl Into<String>,
    logic: impl ParamProcessorLogic + 'static,
  ) -> Self {
    Self::new(type_name, ComponentKind::ParamProcessor(Arc::new(logic)))
  }

  pub fn target_search(
    type_name: impl Into<String>,
    logic: impl TargetSearchLogic + 'static,
  ) -> Self {
    Self::new(type_name, ComponentKind::TargetSearch(Arc::new(logic)))
  }

  pub fn param_target_convertor(
    type_name: impl Into<String>,
    logic: impl ParamTargetConvertorLogic + 'static,
  ) -> Self {
    Self::new(type_name, ComponentKind::ParamTargetConvertor(Arc::new(logic)))
  }

  pub fn condition(type_name: impl Into<String>, logic: impl ConditionLogic + 'static) -> Self {
    Self::new(type_name, ComponentKind::Condition(Arc::new(logic)))
  }

  pub fn effect(type_name: impl Into<String>, logic: impl EffectLogic + 'static) -> Self {
    Self::new(type_name, ComponentKind::Effect(Arc::new(logic)))
  }

  pub fn activity(type_name: impl Into<String>, logic: impl ActivityLogic + 'static) -> Self {
    Self::new(type_name, ComponentKind::Activity(Arc::new(logic)))
  }

  /// Set the author-tunable numbers at construction.
  pub fn with_numbers(self, numbers: Vec<f64>) -> Self {
    self.set_numbers(numbers);
    self
  }

  fn state(&self) -> MutexGuard<'_, ComponentState> {
    self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn id(&self) -> ComponentId {
    self.inner.id
  }

  /// Registry name of the concrete implementation.
  pub fn type_name(&self) -> &str {
    &self.inner.type_name
  }

  pub fn kind(&self) -> &ComponentKind {
    &self.inner.kind
  }

  pub fn category(&self) -> ComponentCategory {
    self.inner.kind.category()
  }

  pub fn owner(&self) -> Option<OwnerId> {
    self.state().owner
  }

  pub fn is_owned_by(&self, owner: OwnerId) -> bool {
    self.owner() == Some(owner)
  }

  /// Take ownership of an unowned component. Returns false if it is already owned.
  pub fn claim(&self, owner: OwnerId) -> bool {
    let mut state = self.state();
    if state.owner.is_some() {
      return false;
    }
    state.owner = Some(owner);
    true
  }

  /// Hand the component from `from` to `to`. Returns false if `from` is not the owner.
  pub fn transfer(&self, from: OwnerId, to: OwnerId) -> bool {
    let mut state = self.state();
    if state.owner != Some(from) {
      return false;
    }
    state.owner = Some(to);
    true
  }

  /// Give up ownership. Returns false if `owner` is not the owner.
  pub fn release(&self, owner: OwnerId) -> bool {
    let mut state = self.state();
    if state.owner != Some(owner) {
      return false;
    }
    state.owner = None;
    true
  }

  pub fn self_index(&self) -> usize {
    self.state().self_index
  }

  pub fn set_self_index(&self, self_index: usize) {
    self.state().self_index = self_index;
  }

  pub fn numbers(&self) -> Vec<f64> {
    self.state().numbers.clone()
  }

  pub fn set_numbers(&self, numbers: Vec<f64>) {
    self.state().numbers = numbers;
  }

  pub fn bindings(&self) -> SlotBindings {
    self.state().bindings.clone()
  }

  pub fn set_bindings(&self, bindings: SlotBindings) {
    self.state().bindings = bindings;
  }

  /// Reset every binding to unbound.
  pub fn clear_bindings(&self) {
    self.set_bindings(SlotBindings::unbound(&self.inner.kind));
  }

  pub fn context(&self) -> ComponentContext {
    let state = self.state();
    ComponentContext {
      self_index: state.self_index,
      numbers: state.numbers.clone(),
    }
  }

  pub fn init(&self) {
    self.inner.kind.init(&self.context());
  }

  pub fn destroy(&self) {
    self.inner.kind.destroy(&self.context());
  }

  /// Collect this component's description, if its logic exposes one.
  pub fn describe(&self) -> Option<ComponentDescription> {
    let ctx = self.context();
    let (main, required, provided) = self.inner.kind.describe(&ctx)?;
    Some(ComponentDescription {
      self_index: ctx.self_index,
      category: self.category(),
      type_name: self.type_name().to_string(),
      main,
      required,
      provided,
    })
  }

  /// Number of indices this component occupies: a trigger takes one per
  /// provided parameter (at least one), everything else takes one.
  pub fn index_span(&self) -> usize {
    match &self.inner.kind {
      ComponentKind::Trigger(logic) => logic.provided_types().len().max(1),
      _ => 1,
    }
  }
}

impl PartialEq for Component {
  fn eq(&self, other: &Self) -> bool {
    self.inner.id == other.inner.id
  }
}

impl Eq for Component {}

impl fmt::Debug for Component {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let state = self.state();
    f.debug_struct("Component")
      .field("id", &self.inner.id)
      .field("type_name", &self.inner.type_name)
      .field("category", &self.inner.kind.category())
      .field("self_index", &state.self_index)
      .field("owner", &state.owner)
      .finish()
  }
}
