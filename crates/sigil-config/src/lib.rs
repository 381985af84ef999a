//! Sigil Config
//!
//! This crate contains the serializable types shared by the sigil crates:
//! the component categories, the persisted form of a validated effect graph,
//! and the settings the built-in activity and runner are configured with.
//!
//! Records can be loaded from:
//! - JSON files (via the CLI)
//! - Any other storage that keeps the record as a JSON blob
//!
//! A record is the flattened output of a successful validation. Loading it
//! back does not validate again; see `sigil-effect` for reconstruction.

mod category;
mod record;
mod settings;

pub use category::ComponentCategory;
pub use record::{ComponentRecord, EffectRecord, SlotRecord};
pub use settings::{ActivitySettings, CheckMode, DispatchPolicy, RunnerConfig};
