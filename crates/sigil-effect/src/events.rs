//! Firing notifiers for observing a running effect.

use tokio::sync::mpsc;

use crate::activity::FiringOutcome;

/// Receives the outcome of every firing an [`EffectRunner`](crate::EffectRunner) executes.
pub trait FiringNotifier: Send + Sync {
  fn notify(&self, outcome: FiringOutcome);
}

/// Discards every outcome.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl FiringNotifier for NoopNotifier {
  fn notify(&self, _outcome: FiringOutcome) {}
}

/// Forwards outcomes to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<FiringOutcome>,
}

impl ChannelNotifier {
  /// Create a notifier and the receiving end of its channel.
  pub fn new() -> (Self, mpsc::UnboundedReceiver<FiringOutcome>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self { sender }, receiver)
  }
}

impl FiringNotifier for ChannelNotifier {
  fn notify(&self, outcome: FiringOutcome) {
    // The receiver may be gone; outcomes are best-effort.
    let _ = self.sender.send(outcome);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::activity::GuardFailure;

  #[test]
  fn test_channel_notifier_forwards() {
    let (notifier, mut receiver) = ChannelNotifier::new();
    notifier.notify(FiringOutcome::Gated);
    notifier.notify(FiringOutcome::Aborted(GuardFailure::MissingTrigger));

    assert_eq!(receiver.try_recv().ok(), Some(FiringOutcome::Gated));
    assert_eq!(
      receiver.try_recv().ok(),
      Some(FiringOutcome::Aborted(GuardFailure::MissingTrigger))
    );
  }

  #[test]
  fn test_channel_notifier_survives_dropped_receiver() {
    let (notifier, receiver) = ChannelNotifier::new();
    drop(receiver);
    notifier.notify(FiringOutcome::Gated);
  }
}
