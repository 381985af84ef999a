//! Persisted form of a validated effect graph.
//!
//! ```json
//! {
//!   "effect_id": "fireball",
//!   "components": [
//!     { "category": "trigger", "type_name": "on_cast", "self_index": 0 },
//!     { "category": "condition", "type_name": "hp_above", "self_index": 3,
//!       "numbers": [10.0], "slots": { "params": [0], "affected": 0 } }
//!   ],
//!   "combiner": "sigil/lines"
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::category::ComponentCategory;

/// A flattened effect graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectRecord {
  pub effect_id: String,
  pub components: Vec<ComponentRecord>,
  /// Registry name of the description combiner, if the graph has one.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub combiner: Option<String>,
}

/// One serialized component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRecord {
  pub category: ComponentCategory,
  /// Registry name of the concrete implementation.
  pub type_name: String,
  pub self_index: usize,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub numbers: Vec<f64>,
  #[serde(default, skip_serializing_if = "SlotRecord::is_empty")]
  pub slots: SlotRecord,
}

/// Resolved required-slot indices of a consuming component.
///
/// Only the fields that apply to the component's category are populated:
/// `source` for processors and convertors, `params` and `affected` for
/// conditions, `params` and `targets` for effects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotRecord {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source: Option<usize>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub params: Vec<Option<usize>>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub targets: Vec<Option<usize>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub affected: Option<usize>,
}

impl SlotRecord {
  pub fn is_empty(&self) -> bool {
    self.source.is_none()
      && self.params.is_empty()
      && self.targets.is_empty()
      && self.affected.is_none()
  }
}

impl EffectRecord {
  /// Look up the record occupying the given self-index.
  pub fn component_at(&self, self_index: usize) -> Option<&ComponentRecord> {
    self.components.iter().find(|c| c.self_index == self_index)
  }
}
