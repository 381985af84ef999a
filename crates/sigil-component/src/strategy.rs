//! Pluggable steps of an activity: how gate checks are combined and how
//! resolved effects are dispatched.

use std::sync::Arc;

use async_trait::async_trait;
use sigil_config::DispatchPolicy;
use tracing::{debug, error};

use crate::component::{Component, ComponentKind};
use crate::error::EffectError;
use crate::logic::{ComponentContext, ConditionLogic, EffectLogic};
use crate::types::{Param, Target};

/// One condition paired with the parameters it was resolved against.
pub struct GateCheck {
  pub self_index: usize,
  pub params: Vec<Param>,
  ctx: ComponentContext,
  logic: Arc<dyn ConditionLogic>,
}

impl GateCheck {
  /// Returns `None` if `condition` is not a condition.
  pub fn new(condition: &Component, params: Vec<Param>) -> Option<Self> {
    let ComponentKind::Condition(logic) = condition.kind() else {
      return None;
    };
    let ctx = condition.context();
    Some(Self {
      self_index: ctx.self_index,
      params,
      ctx,
      logic: logic.clone(),
    })
  }

  pub async fn run(&self) -> bool {
    self.logic.check(&self.ctx, &self.params).await
  }
}

/// Folds a set of gate checks into one pass/fail answer.
#[async_trait]
pub trait CheckCombinator: Send + Sync {
  /// `checks` are in condition index order. An empty set passes.
  async fn combine(&self, checks: Vec<GateCheck>) -> bool;
}

/// Logical AND, evaluated in order, stopping at the first failing check.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialAll;

#[async_trait]
impl CheckCombinator for SequentialAll {
  async fn combine(&self, checks: Vec<GateCheck>) -> bool {
    for check in &checks {
      if !check.run().await {
        debug!(condition = check.self_index, "condition failed");
        return false;
      }
    }
    true
  }
}

/// Logical AND with every check awaited together.
///
/// All conditions run even if an earlier one fails; the verdict and the
/// reported failing condition are the same as [`SequentialAll`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ConcurrentAll;

#[async_trait]
impl CheckCombinator for ConcurrentAll {
  async fn combine(&self, checks: Vec<GateCheck>) -> bool {
    let results = futures::future::join_all(checks.iter().map(|check| check.run())).await;
    match results.iter().position(|passed| !passed) {
      Some(position) => {
        debug!(condition = checks[position].self_index, "condition failed");
        false
      }
      None => true,
    }
  }
}

/// An effect with every parameter and target list resolved.
pub struct ResolvedEffect {
  pub self_index: usize,
  pub params: Vec<Param>,
  pub targets: Vec<Vec<Target>>,
  ctx: ComponentContext,
  logic: Arc<dyn EffectLogic>,
}

impl ResolvedEffect {
  /// Returns `None` if `effect` is not an effect.
  pub fn new(effect: &Component, params: Vec<Param>, targets: Vec<Vec<Target>>) -> Option<Self> {
    let ComponentKind::Effect(logic) = effect.kind() else {
      return None;
    };
    let ctx = effect.context();
    Some(Self {
      self_index: ctx.self_index,
      params,
      targets,
      ctx,
      logic: logic.clone(),
    })
  }

  pub async fn apply(&self) -> Result<(), EffectError> {
    self.logic.apply(&self.ctx, &self.params, &self.targets).await
  }
}

/// What happened to each effect handed to a dispatcher.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
  /// Effects whose action succeeded, by self-index.
  pub applied: Vec<usize>,
  /// Effects whose action failed.
  pub failed: Vec<(usize, EffectError)>,
  /// Effects never invoked because dispatch was aborted.
  pub not_run: Vec<usize>,
}

impl DispatchReport {
  pub fn is_success(&self) -> bool {
    self.failed.is_empty() && self.not_run.is_empty()
  }
}

/// Invokes the resolved effects of one firing.
#[async_trait]
pub trait EffectDispatcher: Send + Sync {
  /// `plan` is in effect index order.
  async fn dispatch(&self, plan: Vec<ResolvedEffect>) -> DispatchReport;
}

/// Invokes effects one at a time in order, applying a [`DispatchPolicy`]
/// when one fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialDispatcher {
  policy: DispatchPolicy,
}

impl SequentialDispatcher {
  pub fn new(policy: DispatchPolicy) -> Self {
    Self { policy }
  }

  pub fn policy(&self) -> DispatchPolicy {
    self.policy
  }
}

#[async_trait]
impl EffectDispatcher for SequentialDispatcher {
  async fn dispatch(&self, plan: Vec<ResolvedEffect>) -> DispatchReport {
    let mut report = DispatchReport::default();
    let mut remaining = plan.iter();

    for effect in remaining.by_ref() {
      match effect.apply().await {
        Ok(()) => {
          debug!(effect = effect.self_index, "effect applied");
          report.applied.push(effect.self_index);
        }
        Err(e) => {
          error!(effect = effect.self_index, error = %e, "effect failed");
          report.failed.push((effect.self_index, e));
          if self.policy == DispatchPolicy::AbortOnFailure {
            break;
          }
        }
      }
    }

    report.not_run = remaining.map(|effect| effect.self_index).collect();
    report
  }
}
