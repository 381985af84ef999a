//! Author-facing description hooks.

use sigil_config::ComponentCategory;

use crate::logic::ComponentContext;

/// Produces the human-readable text of one component.
pub trait DescriptionProcessor: Send + Sync {
  fn main(&self, ctx: &ComponentContext) -> String;

  /// Text for a required slot. Parameter slots come first, then target slots.
  fn required_slot(&self, _slot: usize) -> Option<String> {
    None
  }

  fn provided_slot(&self, _slot: usize) -> Option<String> {
    None
  }

  /// Final pass over the main text.
  fn rewrite(&self, text: String) -> String {
    text
  }
}

/// The collected description of one component.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentDescription {
  pub self_index: usize,
  pub category: ComponentCategory,
  pub type_name: String,
  pub main: String,
  pub required: Vec<String>,
  pub provided: Vec<String>,
}

/// Composes component descriptions (in self-index order) into one string.
pub trait DescriptionCombiner: Send + Sync {
  fn combine(&self, parts: &[ComponentDescription]) -> String;
}

/// Joins the main text of every component, one per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineCombiner;

impl LineCombiner {
  /// Registry name of this combiner.
  pub const NAME: &'static str = "sigil/lines";
}

impl DescriptionCombiner for LineCombiner {
  fn combine(&self, parts: &[ComponentDescription]) -> String {
    parts
      .iter()
      .map(|part| part.main.as_str())
      .filter(|text| !text.is_empty())
      .collect::<Vec<_>>()
      .join("\n")
  }
}
