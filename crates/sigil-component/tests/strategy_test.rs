//! Tests for the built-in check combinators and effect dispatchers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sigil_component::{
  ActivityLogic, CheckCombinator, Component, ComponentContext, ComponentLogic, ConcurrentAll,
  ConditionLogic, EffectDispatcher, EffectError, EffectLogic, GateCheck, Param, ParamType,
  ResolvedEffect, SequentialAll, SequentialDispatcher, StandardActivity, Target,
};
use sigil_config::{ActivitySettings, CheckMode, DispatchPolicy};

const FLAG: ParamType = ParamType::new("flag");

/// Passes when its first parameter is `true`; counts its evaluations.
struct FlagCondition {
  calls: Arc<AtomicUsize>,
}

impl ComponentLogic for FlagCondition {}

#[async_trait]
impl ConditionLogic for FlagCondition {
  fn required_types(&self) -> Vec<ParamType> {
    vec![FLAG]
  }

  async fn check(&self, _ctx: &ComponentContext, params: &[Param]) -> bool {
    self.calls.fetch_add(1, Ordering::SeqCst);
    params.first().and_then(|p| p.value.as_bool()).unwrap_or(false)
  }
}

/// Records its self-index on apply; fails when its first number is 1.
struct RecordingEffect {
  log: Arc<Mutex<Vec<usize>>>,
}

impl ComponentLogic for RecordingEffect {}

#[async_trait]
impl EffectLogic for RecordingEffect {
  fn required_param_types(&self) -> Vec<ParamType> {
    vec![]
  }

  fn required_target_types(&self) -> Vec<ParamType> {
    vec![]
  }

  async fn apply(
    &self,
    ctx: &ComponentContext,
    _params: &[Param],
    _targets: &[Vec<Target>],
  ) -> Result<(), EffectError> {
    self.log.lock().unwrap().push(ctx.self_index);
    if ctx.number(0) == Some(1.0) {
      return Err(EffectError::failed("boom"));
    }
    Ok(())
  }
}

fn gate(calls: &Arc<AtomicUsize>, index: usize, flag: bool) -> GateCheck {
  let condition = Component::condition(
    "flag",
    FlagCondition {
      calls: calls.clone(),
    },
  );
  condition.set_self_index(index);
  GateCheck::new(&condition, vec![Param::new(FLAG, flag)]).unwrap()
}

fn effect(log: &Arc<Mutex<Vec<usize>>>, index: usize, fails: bool) -> ResolvedEffect {
  let component = Component::effect("recording", RecordingEffect { log: log.clone() })
    .with_numbers(vec![if fails { 1.0 } else { 0.0 }]);
  component.set_self_index(index);
  ResolvedEffect::new(&component, vec![], vec![]).unwrap()
}

#[tokio::test]
async fn test_sequential_all_short_circuits() {
  let calls = Arc::new(AtomicUsize::new(0));
  let checks = vec![gate(&calls, 1, true), gate(&calls, 2, false), gate(&calls, 3, true)];

  assert!(!SequentialAll.combine(checks).await);
  assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_concurrent_all_runs_every_check() {
  let calls = Arc::new(AtomicUsize::new(0));
  let checks = vec![gate(&calls, 1, true), gate(&calls, 2, false), gate(&calls, 3, true)];

  assert!(!ConcurrentAll.combine(checks).await);
  assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_empty_gate_passes() {
  assert!(SequentialAll.combine(vec![]).await);
  assert!(ConcurrentAll.combine(vec![]).await);
}

#[tokio::test]
async fn test_gate_check_rejects_non_condition() {
  let log = Arc::new(Mutex::new(Vec::new()));
  let component = Component::effect("recording", RecordingEffect { log });
  assert!(GateCheck::new(&component, vec![]).is_none());
}

#[tokio::test]
async fn test_dispatch_aborts_on_failure() {
  let log = Arc::new(Mutex::new(Vec::new()));
  let plan = vec![effect(&log, 5, false), effect(&log, 6, true), effect(&log, 7, false)];

  let report = SequentialDispatcher::new(DispatchPolicy::AbortOnFailure)
    .dispatch(plan)
    .await;

  assert_eq!(*log.lock().unwrap(), vec![5, 6]);
  assert_eq!(report.applied, vec![5]);
  assert_eq!(report.failed.len(), 1);
  assert_eq!(report.failed[0].0, 6);
  assert_eq!(report.not_run, vec![7]);
  assert!(!report.is_success());
}

#[tokio::test]
async fn test_dispatch_continues_on_failure() {
  let log = Arc::new(Mutex::new(Vec::new()));
  let plan = vec![effect(&log, 5, false), effect(&log, 6, true), effect(&log, 7, false)];

  let report = SequentialDispatcher::new(DispatchPolicy::ContinueOnFailure)
    .dispatch(plan)
    .await;

  assert_eq!(*log.lock().unwrap(), vec![5, 6, 7]);
  assert_eq!(report.applied, vec![5, 7]);
  assert_eq!(report.failed, vec![(6, EffectError::failed("boom"))]);
  assert!(report.not_run.is_empty());
}

#[tokio::test]
async fn test_standard_activity_follows_settings() {
  let calls = Arc::new(AtomicUsize::new(0));
  let activity = StandardActivity::new(ActivitySettings {
    check_mode: CheckMode::Concurrent,
    dispatch_policy: DispatchPolicy::ContinueOnFailure,
  });

  let checks = vec![gate(&calls, 1, false), gate(&calls, 2, true)];
  assert!(!activity.combinator().combine(checks).await);
  assert_eq!(calls.load(Ordering::SeqCst), 2);
  assert_eq!(
    activity.settings().dispatch_policy,
    DispatchPolicy::ContinueOnFailure
  );
}
