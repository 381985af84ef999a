//! The per-firing execution pipeline.
//!
//! A firing runs through four steps and keeps no state between firings:
//!
//! 1. **Guard** - the activity must belong to the graph being fired.
//! 2. **Gate** - conditions affecting the trigger decide whether anything runs.
//! 3. **Resolve** - every effect gets its parameters and target lists; target
//!    lists from a search are filtered candidate by candidate through the
//!    conditions affecting that search.
//! 4. **Dispatch** - the fully resolved effects go to the activity's dispatcher.
//!
//! Missing or invalid data skips the smallest unit (one condition, one
//! effect) and is logged. Nothing is raised to the caller.

use std::sync::Arc;

use sigil_component::{
  ActivityLogic, Component, ComponentKind, DispatchReport, GateCheck, Param,
  ParamTargetConvertorLogic, ResolvedEffect, Target, TargetSearchLogic,
};
use tracing::{debug, info, warn};

use crate::graph::SingleEffect;

/// Why a firing stopped before the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardFailure {
  /// The graph has no activity.
  MissingActivity,
  /// The graph has no trigger.
  MissingTrigger,
  /// The activity has no owner.
  UnownedActivity,
  /// The activity's owner is not this graph, or the component is not an activity.
  ForeignActivity,
}

/// Result of one firing.
#[derive(Debug, Clone, PartialEq)]
pub enum FiringOutcome {
  /// A guard stopped the firing.
  Aborted(GuardFailure),
  /// The trigger's gate rejected the firing.
  Gated,
  /// Effects were handed to the dispatcher.
  Dispatched {
    /// Effects that could not be resolved, by self-index.
    skipped: Vec<usize>,
    report: DispatchReport,
  },
}

impl FiringOutcome {
  /// Self-indices of the effects whose action succeeded.
  pub fn applied(&self) -> &[usize] {
    match self {
      FiringOutcome::Dispatched { report, .. } => &report.applied,
      _ => &[],
    }
  }
}

pub(crate) async fn execute(
  graph: &SingleEffect,
  activity: &Component,
  trigger_values: &[Param],
) -> FiringOutcome {
  let logic = match guard(graph, activity) {
    Ok(logic) => logic,
    Err(failure) => {
      warn!(reason = ?failure, "firing aborted");
      return FiringOutcome::Aborted(failure);
    }
  };
  let Some(trigger) = graph.trigger() else {
    warn!(reason = ?GuardFailure::MissingTrigger, "firing aborted");
    return FiringOutcome::Aborted(GuardFailure::MissingTrigger);
  };

  let pipeline = Pipeline {
    graph,
    logic: logic.as_ref(),
    trigger_values,
  };

  if !pipeline.gate(trigger.self_index(), None).await {
    info!("firing gated");
    return FiringOutcome::Gated;
  }

  let mut plan = Vec::new();
  let mut skipped = Vec::new();
  for effect in graph.effects() {
    match pipeline.resolve_effect(effect).await {
      Some(resolved) => plan.push(resolved),
      None => skipped.push(effect.self_index()),
    }
  }

  let report = logic.dispatcher().dispatch(plan).await;
  info!(
    applied = report.applied.len(),
    failed = report.failed.len(),
    not_run = report.not_run.len(),
    skipped = skipped.len(),
    "firing dispatched"
  );
  FiringOutcome::Dispatched { skipped, report }
}

fn guard(
  graph: &SingleEffect,
  activity: &Component,
) -> Result<Arc<dyn ActivityLogic>, GuardFailure> {
  let Some(owner) = activity.owner() else {
    return Err(GuardFailure::UnownedActivity);
  };
  if owner != graph.owner() {
    return Err(GuardFailure::ForeignActivity);
  }
  match activity.kind() {
    ComponentKind::Activity(logic) => Ok(logic.clone()),
    _ => Err(GuardFailure::ForeignActivity),
  }
}

struct Pipeline<'a> {
  graph: &'a SingleEffect,
  logic: &'a dyn ActivityLogic,
  trigger_values: &'a [Param],
}

impl Pipeline<'_> {
  /// Evaluate the conditions affecting `affected`.
  ///
  /// A candidate target, if given, is appended after each condition's
  /// declared parameters.
  async fn gate(&self, affected: usize, candidate: Option<&Target>) -> bool {
    let mut checks = Vec::new();

    for condition in self.graph.conditions() {
      let bindings = condition.bindings();
      if bindings.affected != Some(affected) {
        continue;
      }

      let declared = condition.kind().required_params().len();
      let mut params = self.graph.resolve_params(&bindings.params, self.trigger_values);
      if params.len() < declared {
        warn!(
          self_index = condition.self_index(),
          declared,
          resolved = params.len(),
          "condition skipped, parameters unresolved"
        );
        continue;
      }
      if let Some(candidate) = candidate {
        params.push(candidate.clone());
      }
      if let Some(check) = GateCheck::new(condition, params) {
        checks.push(check);
      }
    }

    self.logic.combinator().combine(checks).await
  }

  async fn resolve_effect(&self, effect: &Component) -> Option<ResolvedEffect> {
    let self_index = effect.self_index();
    let bindings = effect.bindings();
    let declared_params = effect.kind().required_params().len();
    let declared_targets = effect.kind().required_targets().len();

    let params = self.graph.resolve_params(&bindings.params, self.trigger_values);
    if params.len() != declared_params {
      warn!(
        self_index,
        declared = declared_params,
        resolved = params.len(),
        "effect skipped, parameters unresolved"
      );
      return None;
    }
    if bindings.targets.len() != declared_targets {
      warn!(
        self_index,
        declared = declared_targets,
        bound = bindings.targets.len(),
        "effect skipped, target slots unbound"
      );
      return None;
    }

    let mut targets = Vec::with_capacity(declared_targets);
    for (slot, binding) in bindings.targets.iter().enumerate() {
      let Some(index) = *binding else {
        warn!(self_index, slot, "effect skipped, target slot unbound");
        return None;
      };
      let Some(provider) = self.graph.component_at(index) else {
        warn!(self_index, slot, provider = index, "effect skipped, target provider missing");
        return None;
      };

      let list = match provider.kind() {
        ComponentKind::TargetSearch(search) => self.search_targets(provider, search.as_ref()).await,
        ComponentKind::ParamTargetConvertor(convertor) => {
          self.convert_targets(provider, convertor.as_ref())?
        }
        _ => {
          warn!(
            self_index,
            slot,
            provider = index,
            category = %provider.category(),
            "effect skipped, target slot bound to a non-target provider"
          );
          return None;
        }
      };
      targets.push(list);
    }

    ResolvedEffect::new(effect, params, targets)
  }

  /// Gather every candidate, keep those passing the search's gate, then let
  /// the search pick from the survivors.
  async fn search_targets(
    &self,
    component: &Component,
    search: &dyn TargetSearchLogic,
  ) -> Vec<Target> {
    let ctx = component.context();
    let candidates = search.all_targets(&ctx).await;
    let total = candidates.len();

    let mut kept = Vec::new();
    for candidate in candidates {
      if self.gate(ctx.self_index, Some(&candidate)).await {
        kept.push(candidate);
      }
    }

    let selected = search.select_targets(&ctx, kept);
    debug!(
      search = ctx.self_index,
      candidates = total,
      selected = selected.len(),
      "targets selected"
    );
    selected
  }

  fn convert_targets(
    &self,
    component: &Component,
    convertor: &dyn ParamTargetConvertorLogic,
  ) -> Option<Vec<Target>> {
    let self_index = component.self_index();
    let Some(source) = component.bindings().source else {
      warn!(self_index, "convertor skipped, source unbound");
      return None;
    };
    let input = self
      .graph
      .component_at(source)
      .and_then(|upstream| self.graph.final_param(upstream, source, self.trigger_values));
    let Some(input) = input else {
      warn!(self_index, source, "convertor skipped, source unresolved");
      return None;
    };
    Some(convertor.param_to_targets(&component.context(), input))
  }
}
