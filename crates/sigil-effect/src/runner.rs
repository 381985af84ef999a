//! Queue-serialized firing of one effect graph.
//!
//! `EffectRunner` owns an mpsc channel of trigger values and fires the graph
//! once per message, never starting a firing before the previous one finished.

use std::sync::Arc;

use sigil_component::Param;
use sigil_config::RunnerConfig;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::error::RunnerError;
use crate::events::{FiringNotifier, NoopNotifier};
use crate::graph::SingleEffect;

/// Fires an effect graph for every trigger payload it receives.
///
/// # Usage
///
/// ```ignore
/// let runner = EffectRunner::new(effect, RunnerConfig::default());
///
/// // Hand senders to whatever raises the trigger
/// let sender = runner.sender();
///
/// let cancel = CancellationToken::new();
/// runner.start(cancel).await;
/// ```
pub struct EffectRunner {
  sender: mpsc::Sender<Vec<Param>>,
  receiver: mpsc::Receiver<Vec<Param>>,
  effect: Arc<SingleEffect>,
  notifier: Arc<dyn FiringNotifier>,
}

impl EffectRunner {
  pub fn new(effect: Arc<SingleEffect>, config: RunnerConfig) -> Self {
    let (sender, receiver) = mpsc::channel(config.buffer_size.max(1));
    Self {
      sender,
      receiver,
      effect,
      notifier: Arc::new(NoopNotifier),
    }
  }

  /// Report every firing's outcome to `notifier`.
  pub fn with_notifier(mut self, notifier: Arc<dyn FiringNotifier>) -> Self {
    self.notifier = notifier;
    self
  }

  /// A handle for queueing firings.
  pub fn sender(&self) -> mpsc::Sender<Vec<Param>> {
    self.sender.clone()
  }

  /// Queue one firing.
  pub async fn fire(&self, trigger_values: Vec<Param>) -> Result<(), RunnerError> {
    self
      .sender
      .send(trigger_values)
      .await
      .map_err(|_| RunnerError::ChannelClosed)
  }

  /// Run queued firings until `cancel` fires or every sender is dropped.
  #[instrument(name = "effect_runner", skip_all, fields(effect_id = %self.effect.effect_id()))]
  pub async fn start(self, cancel: CancellationToken) {
    let Self {
      sender,
      mut receiver,
      effect,
      notifier,
    } = self;
    // Only external senders keep the loop alive.
    drop(sender);

    info!("starting effect runner");
    let mut fired = 0usize;
    loop {
      tokio::select! {
        biased;
        _ = cancel.cancelled() => {
          info!(fired, "effect runner cancelled");
          break;
        }
        values = receiver.recv() => {
          let Some(values) = values else {
            info!(fired, "effect runner channel closed");
            break;
          };
          let outcome = effect.triggered(values).await;
          fired += 1;
          notifier.notify(outcome);
        }
      }
    }
  }
}
