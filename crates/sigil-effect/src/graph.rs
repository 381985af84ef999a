use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use sigil_component::{
  Component, ComponentCategory, ComponentKind, DescriptionCombiner, OwnerId, Param,
};
use tracing::{debug, info, instrument, warn};

use crate::activity::{self, FiringOutcome, GuardFailure};

/// The components of a graph, grouped by category, ready to be assembled.
#[derive(Default)]
pub struct EffectParts {
  pub effect_id: String,
  pub trigger: Option<Component>,
  pub activity: Option<Component>,
  pub free_params: Vec<Component>,
  pub param_processors: Vec<Component>,
  pub target_searches: Vec<Component>,
  pub param_target_convertors: Vec<Component>,
  pub conditions: Vec<Component>,
  pub effects: Vec<Component>,
  /// Registry name and instance of the description combiner.
  pub combiner: Option<(String, Arc<dyn DescriptionCombiner>)>,
}

impl EffectParts {
  pub fn new(effect_id: impl Into<String>) -> Self {
    Self {
      effect_id: effect_id.into(),
      ..Self::default()
    }
  }

  /// Place a component in the collection of its category.
  ///
  /// Returns the displaced occupant when a trigger or activity is replaced.
  pub fn insert(&mut self, component: Component) -> Option<Component> {
    match component.category() {
      ComponentCategory::Trigger => self.trigger.replace(component),
      ComponentCategory::Activity => self.activity.replace(component),
      ComponentCategory::FreeParam => {
        self.free_params.push(component);
        None
      }
      ComponentCategory::ParamProcessor => {
        self.param_processors.push(component);
        None
      }
      ComponentCategory::TargetSearch => {
        self.target_searches.push(component);
        None
      }
      ComponentCategory::ParamTargetConvertor => {
        self.param_target_convertors.push(component);
        None
      }
      ComponentCategory::Condition => {
        self.conditions.push(component);
        None
      }
      ComponentCategory::Effect => {
        self.effects.push(component);
        None
      }
    }
  }
}

/// An executable effect graph.
///
/// A `SingleEffect` is produced by a successful validation (or restored from a
/// record) and is read-only from then on, except for [`SingleEffect::destroy`].
/// Every member component is owned by the graph's [`OwnerId`].
pub struct SingleEffect {
  effect_id: String,
  owner: OwnerId,
  trigger: Option<Component>,
  activity: Option<Component>,
  free_params: Vec<Component>,
  param_processors: Vec<Component>,
  target_searches: Vec<Component>,
  param_target_convertors: Vec<Component>,
  conditions: Vec<Component>,
  effects: Vec<Component>,
  by_index: BTreeMap<usize, Component>,
  combiner: Option<(String, Arc<dyn DescriptionCombiner>)>,
}

impl SingleEffect {
  /// Build a graph from its parts, sorting every collection by self-index.
  ///
  /// Components owned by `previous_owner` are transferred to the new graph;
  /// unowned components are claimed.
  pub fn assemble(parts: EffectParts, previous_owner: Option<OwnerId>) -> Self {
    let owner = OwnerId::new();
    let EffectParts {
      effect_id,
      trigger,
      activity,
      mut free_params,
      mut param_processors,
      mut target_searches,
      mut param_target_convertors,
      mut conditions,
      mut effects,
      combiner,
    } = parts;

    for list in [
      &mut free_params,
      &mut param_processors,
      &mut target_searches,
      &mut param_target_convertors,
      &mut conditions,
      &mut effects,
    ] {
      list.sort_by_key(Component::self_index);
    }

    let mut graph = Self {
      effect_id,
      owner,
      trigger,
      activity,
      free_params,
      param_processors,
      target_searches,
      param_target_convertors,
      conditions,
      effects,
      by_index: BTreeMap::new(),
      combiner,
    };

    for component in graph.components() {
      let adopted = match previous_owner {
        Some(from) => component.transfer(from, owner) || component.claim(owner),
        None => component.claim(owner),
      };
      if !adopted {
        warn!(
          effect_id = %graph.effect_id,
          component = %component.type_name(),
          self_index = component.self_index(),
          "component is owned elsewhere, graph does not own it"
        );
      }
    }

    graph.by_index = graph
      .components()
      .into_iter()
      .filter(|component| component.category() != ComponentCategory::Trigger)
      .map(|component| (component.self_index(), component))
      .collect();

    debug!(
      effect_id = %graph.effect_id,
      components = graph.by_index.len() + usize::from(graph.trigger.is_some()),
      "effect graph assembled"
    );
    graph
  }

  pub fn effect_id(&self) -> &str {
    &self.effect_id
  }

  /// Identity every member component is owned by.
  pub fn owner(&self) -> OwnerId {
    self.owner
  }

  pub fn trigger(&self) -> Option<&Component> {
    self.trigger.as_ref()
  }

  pub fn activity(&self) -> Option<&Component> {
    self.activity.as_ref()
  }

  pub fn free_params(&self) -> &[Component] {
    &self.free_params
  }

  pub fn param_processors(&self) -> &[Component] {
    &self.param_processors
  }

  pub fn target_searches(&self) -> &[Component] {
    &self.target_searches
  }

  pub fn param_target_convertors(&self) -> &[Component] {
    &self.param_target_convertors
  }

  pub fn conditions(&self) -> &[Component] {
    &self.conditions
  }

  pub fn effects(&self) -> &[Component] {
    &self.effects
  }

  /// Registry name of the description combiner, if any.
  pub fn combiner_name(&self) -> Option<&str> {
    self.combiner.as_ref().map(|(name, _)| name.as_str())
  }

  /// Members of one category, in self-index order.
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

  /// Every member, in index order.
  pub fn components(&self) -> Vec<Component> {
    let mut all: Vec<Component> = ComponentCategory::INDEX_ORDER
      .iter()
      .flat_map(|category| self.members(*category).iter().cloned())
      .collect();
    all.sort_by_key(Component::self_index);
    all
  }

  /// The component at `index`. Any index inside the trigger's footprint
  /// resolves to the trigger.
  pub fn component_at(&self, index: usize) -> Option<&Component> {
    if let Some(trigger) = &self.trigger {
      let start = trigger.self_index();
      if (start..start + trigger.index_span()).contains(&index) {
        return Some(trigger);
      }
    }
    self.by_index.get(&index)
  }

  /// Resolve the value `component` supplies at `index` for one firing.
  ///
  /// A trigger yields the fired value at that position, a free param its own
  /// value, and a processor the transform of its resolved upstream value.
  /// Every other kind supplies nothing.
  pub fn final_param(
    &self,
    component: &Component,
    index: usize,
    trigger_values: &[Param],
  ) -> Option<Param> {
    self.final_param_bounded(component, index, trigger_values, 0)
  }

  fn final_param_bounded(
    &self,
    component: &Component,
    index: usize,
    trigger_values: &[Param],
    depth: usize,
  ) -> Option<Param> {
    match component.kind() {
      ComponentKind::Trigger(_) => {
        let position = index.checked_sub(component.self_index())?;
        trigger_values.get(position).cloned()
      }
      ComponentKind::FreeParam(logic) => logic.value(&component.context()),
      ComponentKind::ParamProcessor(logic) => {
        // A validated graph has no processor cycles; restored ones are not re-checked.
        if depth > self.param_processors.len() {
          warn!(
            effect_id = %self.effect_id,
            self_index = component.self_index(),
            "processor chain does not terminate"
          );
          return None;
        }
        let source = component.bindings().source?;
        let upstream = self.component_at(source)?;
        let input = self.final_param_bounded(upstream, source, trigger_values, depth + 1)?;
        logic.process(&component.context(), input)
      }
      _ => None,
    }
  }

  /// Resolve bound parameter slots, dropping any that yield no value.
  pub fn resolve_params(&self, slots: &[Option<usize>], trigger_values: &[Param]) -> Vec<Param> {
    slots
      .iter()
      .filter_map(|slot| {
        let index = (*slot)?;
        let provider = self.component_at(index)?;
        self.final_param(provider, index, trigger_values)
      })
      .collect()
  }

  /// Run every member's init hook in lifecycle order.
  pub fn init(&self) {
    for category in ComponentCategory::INIT_ORDER {
      for component in self.members(category) {
        component.init();
      }
    }
    info!(effect_id = %self.effect_id, "effect graph initialized");
  }

  /// Run every member's destroy hook and drop all members.
  ///
  /// The graph cannot fire afterwards.
  pub fn destroy(&mut self) {
    for category in ComponentCategory::INIT_ORDER {
      for component in self.members(category) {
        component.destroy();
      }
    }

    self.trigger = None;
    self.activity = None;
    self.free_params.clear();
    self.param_processors.clear();
    self.target_searches.clear();
    self.param_target_convertors.clear();
    self.conditions.clear();
    self.effects.clear();
    self.by_index.clear();
    info!(effect_id = %self.effect_id, "effect graph destroyed");
  }

  /// Compose every member's description with the graph's combiner.
  ///
  /// Returns `None` if the graph has no combiner.
  pub fn describe(&self) -> Option<String> {
    let (_, combiner) = self.combiner.as_ref()?;
    let descriptions: Vec<_> = self
      .components()
      .iter()
      .filter_map(Component::describe)
      .collect();
    Some(combiner.combine(&descriptions))
  }

  /// Fire the graph with the trigger's values.
  ///
  /// Runtime failures are logged and reflected in the outcome, never raised.
  #[instrument(
    name = "effect_fired",
    skip(self, trigger_values),
    fields(effect_id = %self.effect_id)
  )]
  pub async fn triggered(&self, trigger_values: Vec<Param>) -> FiringOutcome {
    let Some(activity) = &self.activity else {
      warn!("effect graph has no activity");
      return FiringOutcome::Aborted(GuardFailure::MissingActivity);
    };
    activity::execute(self, activity, &trigger_values).await
  }
}

impl fmt::Debug for SingleEffect {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SingleEffect")
      .field("effect_id", &self.effect_id)
      .field("owner", &self.owner)
      .field("trigger", &self.trigger)
      .field("activity", &self.activity)
      .field("members", &self.by_index.len())
      .field("combiner", &self.combiner_name())
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use sigil_component::{
    ComponentContext, ComponentLogic, ConstantParam, LineCombiner, ParamProcessorLogic, ParamType,
    StandardActivity, StaticTrigger,
  };

  const NUMBER: ParamType = ParamType::new("number");

  struct Double;

  impl ComponentLogic for Double {}

  impl ParamProcessorLogic for Double {
    fn input_type(&self) -> ParamType {
      NUMBER
    }

    fn output_type(&self) -> ParamType {
      NUMBER
    }

    fn process(&self, _ctx: &ComponentContext, input: Param) -> Option<Param> {
      let value = input.value.as_f64()?;
      Some(Param::new(NUMBER, value * 2.0))
    }
  }

  fn indexed(component: Component, index: usize) -> Component {
    component.set_self_index(index);
    component
  }

  fn sample_parts() -> (EffectParts, Component) {
    let mut parts = EffectParts::new("sample");
    parts.insert(indexed(
      Component::trigger("trigger", StaticTrigger::new(vec![NUMBER, NUMBER])),
      0,
    ));
    let constant = indexed(
      Component::free_param("constant", ConstantParam::new(Param::new(NUMBER, 3.0))),
      2,
    );
    parts.insert(constant.clone());
    let from_trigger = indexed(Component::param_processor("double", Double), 4);
    let mut bindings = from_trigger.bindings();
    bindings.source = Some(1);
    from_trigger.set_bindings(bindings);
    parts.insert(from_trigger.clone());
    let chained = indexed(Component::param_processor("double", Double), 3);
    let mut bindings = chained.bindings();
    bindings.source = Some(4);
    chained.set_bindings(bindings);
    parts.insert(chained.clone());
    parts.insert(indexed(
      Component::activity("activity", StandardActivity::default()),
      5,
    ));
    (parts, chained)
  }

  #[test]
  fn test_assemble_claims_and_sorts() {
    let (parts, _) = sample_parts();
    let graph = SingleEffect::assemble(parts, None);

    let indices: Vec<_> = graph
      .param_processors()
      .iter()
      .map(Component::self_index)
      .collect();
    assert_eq!(indices, vec![3, 4]);
    assert!(
      graph
        .components()
        .iter()
        .all(|component| component.is_owned_by(graph.owner()))
    );
  }

  #[test]
  fn test_assemble_transfers_from_previous_owner() {
    let previous = OwnerId::new();
    let (parts, chained) = sample_parts();
    chained.claim(previous);
    let graph = SingleEffect::assemble(parts, Some(previous));
    assert!(chained.is_owned_by(graph.owner()));
  }

  #[test]
  fn test_trigger_footprint_resolves_to_trigger() {
    let (parts, _) = sample_parts();
    let graph = SingleEffect::assemble(parts, None);

    for index in [0, 1] {
      let component = graph.component_at(index);
      assert_eq!(
        component.map(Component::category),
        Some(ComponentCategory::Trigger)
      );
    }
    assert_eq!(
      graph.component_at(2).map(Component::category),
      Some(ComponentCategory::FreeParam)
    );
    assert!(graph.component_at(9).is_none());
  }

  #[test]
  fn test_final_param_by_kind() {
    let (parts, chained) = sample_parts();
    let graph = SingleEffect::assemble(parts, None);
    let values = vec![Param::new(NUMBER, 1.0), Param::new(NUMBER, 5.0)];

    let trigger = graph.component_at(1).cloned();
    let trigger = trigger.as_ref();
    assert_eq!(
      trigger.and_then(|t| graph.final_param(t, 1, &values)),
      Some(Param::new(NUMBER, 5.0))
    );
    assert_eq!(
      trigger.and_then(|t| graph.final_param(t, 1, &values[..1])),
      None
    );

    let constant = graph.component_at(2).cloned();
    assert_eq!(
      constant.and_then(|c| graph.final_param(&c, 2, &values)),
      Some(Param::new(NUMBER, 3.0))
    );

    // trigger slot 1 (5.0) doubled twice
    assert_eq!(
      graph.final_param(&chained, 3, &values),
      Some(Param::new(NUMBER, 20.0))
    );

    let activity = graph.activity().cloned();
    assert_eq!(
      activity.and_then(|a| graph.final_param(&a, 5, &values)),
      None
    );
  }

  #[test]
  fn test_final_param_stops_on_cycle() {
    let (parts, chained) = sample_parts();
    let graph = SingleEffect::assemble(parts, None);
    let from_trigger = graph.component_at(4).cloned();
    if let Some(from_trigger) = from_trigger {
      let mut bindings = from_trigger.bindings();
      bindings.source = Some(3);
      from_trigger.set_bindings(bindings);
    }
    assert_eq!(graph.final_param(&chained, 3, &[]), None);
  }

  #[test]
  fn test_resolve_params_drops_missing() {
    let (parts, _) = sample_parts();
    let graph = SingleEffect::assemble(parts, None);
    let values = vec![Param::new(NUMBER, 1.0)];

    let resolved = graph.resolve_params(&[Some(0), None, Some(1), Some(2)], &values);
    assert_eq!(
      resolved,
      vec![Param::new(NUMBER, 1.0), Param::new(NUMBER, 3.0)]
    );
  }

  #[test]
  fn test_describe_requires_combiner() {
    let (mut parts, _) = sample_parts();
    let graph = SingleEffect::assemble(EffectParts::new("bare"), None);
    assert_eq!(graph.describe(), None);

    parts.combiner = Some((LineCombiner::NAME.to_string(), Arc::new(LineCombiner)));
    let graph = SingleEffect::assemble(parts, None);
    let description = graph.describe().unwrap_or_default();
    assert!(description.contains("number = 3"));
  }

  #[test]
  fn test_destroy_clears_members() {
    let (parts, _) = sample_parts();
    let mut graph = SingleEffect::assemble(parts, None);
    graph.destroy();

    assert!(graph.trigger().is_none());
    assert!(graph.activity().is_none());
    assert!(graph.components().is_empty());
    assert!(graph.component_at(2).is_none());
  }
}
