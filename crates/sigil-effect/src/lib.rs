//! Sigil Effect
//!
//! This crate provides [`SingleEffect`], the immutable form of an effect
//! graph that passed validation, and everything that runs against it:
//!
//! - value resolution through trigger slots, free params and processor chains
//! - the activity pipeline executed on every firing (gate, per-effect
//!   resolution, target filtering, dispatch)
//! - lifecycle (`init`/`destroy`) and description composition
//! - flattening to and restoring from an [`EffectRecord`](sigil_config::EffectRecord)
//! - [`EffectRunner`], a queue that serializes firings
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                 EffectRunner                 │
//! │  - owns mpsc channel of trigger values       │
//! │  - one firing at a time until cancelled      │
//! └──────────────────────────────────────────────┘
//!                        │
//!                        ▼
//! ┌──────────────────────────────────────────────┐
//! │                 SingleEffect                 │
//! │  - triggered(values) → FiringOutcome         │
//! │  - lookup by index, final param resolution   │
//! └──────────────────────────────────────────────┘
//!                        │
//!                        ▼
//! ┌──────────────────────────────────────────────┐
//! │            Activity pipeline                 │
//! │  guard → gate → resolve effects → dispatch   │
//! └──────────────────────────────────────────────┘
//! ```

mod activity;
mod error;
mod events;
mod graph;
mod record;
mod runner;

pub use activity::{FiringOutcome, GuardFailure};
pub use error::{RecordError, RunnerError};
pub use events::{ChannelNotifier, FiringNotifier, NoopNotifier};
pub use graph::{EffectParts, SingleEffect};
pub use runner::EffectRunner;
