//! Sigil Combination
//!
//! [`Combination`] is the mutable builder of an effect graph. Components and
//! references can be added in any order; [`Combination::check`] assigns
//! self-indices, drops stale references and validates every consumer,
//! collecting every failure instead of stopping at the first.
//! [`Combination::get_result`] turns a clean combination into an executable
//! [`SingleEffect`](sigil_effect::SingleEffect).

mod combination;
mod error;
mod reference;
mod validate;

pub use combination::Combination;
pub use error::{CombinationError, FailureReason, SlotRole, ValidationFailure};
pub use reference::{ComponentReference, ReferenceFlags, ReferenceSpec};
