use std::fmt;

use sigil_component::{ComponentCategory, ParamType};
use thiserror::Error;

/// Errors returned by [`Combination`](crate::Combination) operations.
///
/// Mutations that fail leave the combination unchanged.
#[derive(Debug, Error)]
pub enum CombinationError {
  /// The component is owned by another combination or graph.
  #[error("component is owned elsewhere")]
  InvalidComponent,

  /// The component is already a member of this combination.
  #[error("{category} is already part of this combination")]
  DuplicateComponent { category: ComponentCategory },

  /// The component is not a member of this combination.
  #[error("{category} is not part of this combination")]
  NotAMember { category: ComponentCategory },

  /// The consumer of a reference has no owner.
  #[error("reference consumer is not owned")]
  UnownedConsumer,

  /// The consumer of a reference belongs to someone else or was removed.
  #[error("reference consumer is not part of this combination")]
  ConsumerNotMember,

  /// The provider of a reference has no owner.
  #[error("reference provider is not owned")]
  UnownedProvider,

  /// The provider of a reference belongs to someone else or was removed.
  #[error("reference provider is not part of this combination")]
  ProviderNotMember,

  /// Only processors, convertors, conditions and effects consume.
  #[error("a {category} cannot consume references")]
  IneligibleConsumer { category: ComponentCategory },

  /// A reference cannot carry a parameter and a target at once.
  #[error("reference is flagged both param and target")]
  ConflictingFlags,

  /// A reference must carry a parameter, a target or an affect.
  #[error("reference carries nothing")]
  MeaninglessReference,

  /// The trigger does not provide a value at the requested slot.
  #[error("trigger slot {slot} is out of range, trigger provides {provided}")]
  TriggerSlotOutOfRange { slot: usize, provided: usize },

  /// Only triggers and target searches can be affected by a condition.
  #[error("a {category} cannot be affected")]
  NotAffectable { category: ComponentCategory },

  /// Only conditions affect other components.
  #[error("a {category} cannot affect other components")]
  AffectRequiresCondition { category: ComponentCategory },

  /// Conditions and effects need to know which slot a reference fills.
  #[error("a {category} has several slots, the consumer slot must be given")]
  MissingConsumerSlot { category: ComponentCategory },

  /// The consumer already has a reference to the same provider slot.
  #[error("consumer already references this provider the same way")]
  DuplicateReference,

  /// No description combiner is registered under the name.
  #[error("description combiner not registered: {name}")]
  UnknownCombiner { name: String },

  #[error("combination has no trigger")]
  MissingTrigger,

  #[error("combination has no activity")]
  MissingActivity,

  /// The trigger slot holds a component owned by someone else.
  #[error("trigger is owned by another graph")]
  ForeignTrigger,

  /// The activity slot holds a component owned by someone else.
  #[error("activity is owned by another graph")]
  ForeignActivity,

  /// Validation collected failures.
  #[error("graph has {} failing components", failures.len())]
  FailingComponents { failures: Vec<ValidationFailure> },
}

/// Which kind of slot a failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SlotRole {
  Param,
  Target,
}

impl fmt::Display for SlotRole {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SlotRole::Param => f.write_str("param"),
      SlotRole::Target => f.write_str("target"),
    }
  }
}

/// Why one consumer failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
  /// Several references point at the same provider slot the same way.
  #[error("duplicate reference to {provider} at {provider_index}")]
  DuplicateTarget {
    provider: ComponentCategory,
    provider_index: usize,
  },

  /// Several references fill the same slot.
  #[error("{role} slot {slot} is filled by several references")]
  SlotConflict { role: SlotRole, slot: usize },

  /// Several references set what a condition affects.
  #[error("affected component is set by several references")]
  AffectConflict,

  /// A reference fills a slot the consumer does not declare.
  #[error("{role} slot {slot} is out of range, {declared} declared")]
  SlotOutOfRange {
    role: SlotRole,
    slot: usize,
    declared: usize,
  },

  /// A reference reads a trigger slot the trigger does not provide.
  #[error("trigger slot {slot} is out of range, trigger provides {provided}")]
  TriggerSlotOutOfRange { slot: usize, provided: usize },

  /// The provider kind cannot fill this slot.
  #[error("{role} slot {slot} cannot be filled by a {provider}")]
  WrongProvider {
    role: SlotRole,
    slot: usize,
    provider: ComponentCategory,
  },

  /// The provided type is not assignable to the required type.
  #[error(
    "{role} slot {slot} requires {required}, {provider} at {provider_index} provides {provided}"
  )]
  TypeMismatch {
    role: SlotRole,
    slot: usize,
    required: ParamType,
    provided: ParamType,
    provider: ComponentCategory,
    provider_index: usize,
  },

  /// A declared slot has no reference.
  #[error("{role} slot {slot} is not bound")]
  UnboundSlot { role: SlotRole, slot: usize },

  /// A slot is bound to an index no suitable member occupies.
  #[error("{role} slot {slot} is bound to {index}, which provides nothing")]
  DanglingBinding {
    role: SlotRole,
    slot: usize,
    index: usize,
  },

  /// A condition does not say which component it gates.
  #[error("condition affects nothing")]
  MissingAffect,

  /// The processor's source chain leads back to itself.
  #[error("processor is part of a cycle")]
  ProcessorCycle,
}

/// One failing consumer, as reported by validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{category} '{component}' at {self_index}: {reason}")]
pub struct ValidationFailure {
  pub category: ComponentCategory,
  pub self_index: usize,
  /// Registry name of the failing component.
  pub component: String,
  pub reason: FailureReason,
}
