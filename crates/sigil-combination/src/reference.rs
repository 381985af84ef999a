//! Typed references between the components of a combination.

use sigil_component::{Component, ComponentCategory, ComponentId};

/// What a reference carries from its provider to its consumer.
///
/// `param` and `target` are exclusive. `affect` can accompany `param`: a
/// condition may both read a trigger value and gate the trigger through one
/// reference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ReferenceFlags {
  pub param: bool,
  pub target: bool,
  pub affect: bool,
}

impl ReferenceFlags {
  pub const PARAM: Self = Self {
    param: true,
    target: false,
    affect: false,
  };

  pub const TARGET: Self = Self {
    param: false,
    target: true,
    affect: false,
  };

  pub const AFFECT: Self = Self {
    param: false,
    target: false,
    affect: true,
  };

  pub const PARAM_AND_AFFECT: Self = Self {
    param: true,
    target: false,
    affect: true,
  };

  /// Whether the reference fills one of the consumer's slots.
  pub fn fills_slot(&self) -> bool {
    self.param || self.target
  }
}

/// A reference as requested by a caller of
/// [`Combination::add_reference`](crate::Combination::add_reference).
///
/// `consumer_slot` is required for conditions and effects when the reference
/// fills a slot. `trigger_slot` selects which trigger value a param reference
/// from the trigger reads; both default to 0.
#[derive(Debug, Clone)]
pub struct ReferenceSpec {
  pub consumer: Component,
  pub provider: Component,
  pub flags: ReferenceFlags,
  pub consumer_slot: Option<usize>,
  pub trigger_slot: Option<usize>,
}

impl ReferenceSpec {
  pub fn new(consumer: &Component, provider: &Component, flags: ReferenceFlags) -> Self {
    Self {
      consumer: consumer.clone(),
      provider: provider.clone(),
      flags,
      consumer_slot: None,
      trigger_slot: None,
    }
  }

  pub fn param(consumer: &Component, provider: &Component) -> Self {
    Self::new(consumer, provider, ReferenceFlags::PARAM)
  }

  pub fn target(consumer: &Component, provider: &Component) -> Self {
    Self::new(consumer, provider, ReferenceFlags::TARGET)
  }

  pub fn affect(consumer: &Component, provider: &Component) -> Self {
    Self::new(consumer, provider, ReferenceFlags::AFFECT)
  }

  pub fn at_slot(mut self, slot: usize) -> Self {
    self.consumer_slot = Some(slot);
    self
  }

  pub fn from_trigger_slot(mut self, slot: usize) -> Self {
    self.trigger_slot = Some(slot);
    self
  }
}

/// A stored reference, normalized after its structural check.
#[derive(Debug, Clone)]
pub struct ComponentReference {
  consumer: Component,
  provider: Component,
  flags: ReferenceFlags,
  consumer_slot: usize,
  trigger_slot: usize,
}

/// Identity of a reference within its consumer's set.
pub(crate) type ReferenceKey = (ComponentId, ReferenceFlags, usize, usize);

/// One thing a reference reads from its provider.
///
/// A param reference reads one trigger slot into one consumer slot, a target
/// reference fills one consumer slot, and an affect reference is identified
/// by its provider alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Discriminator {
  Param {
    provider: ComponentId,
    consumer_slot: usize,
    trigger_slot: usize,
  },
  Target {
    provider: ComponentId,
    consumer_slot: usize,
  },
  Affect {
    provider: ComponentId,
  },
}

impl ComponentReference {
  pub(crate) fn new(spec: ReferenceSpec) -> Self {
    let trigger_slot = match spec.provider.category() {
      ComponentCategory::Trigger => spec.trigger_slot.unwrap_or(0),
      _ => 0,
    };
    Self {
      consumer: spec.consumer,
      provider: spec.provider,
      flags: spec.flags,
      consumer_slot: spec.consumer_slot.unwrap_or(0),
      trigger_slot,
    }
  }

  pub fn consumer(&self) -> &Component {
    &self.consumer
  }

  pub fn provider(&self) -> &Component {
    &self.provider
  }

  pub fn flags(&self) -> ReferenceFlags {
    self.flags
  }

  pub fn consumer_slot(&self) -> usize {
    self.consumer_slot
  }

  pub fn trigger_slot(&self) -> usize {
    self.trigger_slot
  }

  /// Exact identity: provider, flags and both slots.
  pub(crate) fn key(&self) -> ReferenceKey {
    (
      self.provider.id(),
      self.flags,
      self.consumer_slot,
      self.trigger_slot,
    )
  }

  pub(crate) fn discriminators(&self) -> Vec<Discriminator> {
    let provider = self.provider.id();
    let mut discriminators = Vec::with_capacity(2);
    if self.flags.param {
      discriminators.push(Discriminator::Param {
        provider,
        consumer_slot: self.consumer_slot,
        trigger_slot: self.trigger_slot,
      });
    }
    if self.flags.target {
      discriminators.push(Discriminator::Target {
        provider,
        consumer_slot: self.consumer_slot,
      });
    }
    if self.flags.affect {
      discriminators.push(Discriminator::Affect { provider });
    }
    discriminators
  }

  /// Whether both references read something identical from the same
  /// provider. A param-and-affect reference matches a plain affect
  /// reference to the same provider, whatever their consumer slots.
  pub(crate) fn is_same_target(&self, other: &ComponentReference) -> bool {
    let theirs = other.discriminators();
    self
      .discriminators()
      .iter()
      .any(|discriminator| theirs.contains(discriminator))
  }

  /// Back to the request form, for re-running the structural check.
  pub(crate) fn spec(&self) -> ReferenceSpec {
    ReferenceSpec {
      consumer: self.consumer.clone(),
      provider: self.provider.clone(),
      flags: self.flags,
      consumer_slot: Some(self.consumer_slot),
      trigger_slot: Some(self.trigger_slot),
    }
  }
}
