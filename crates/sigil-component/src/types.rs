//! Parameter types and values.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Tag naming the type of a parameter or target.
///
/// Subtyping between tags is not a property of the tag itself; it is looked
/// up in the type registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamType(Cow<'static, str>);

impl ParamType {
  pub const fn new(name: &'static str) -> Self {
    Self(Cow::Borrowed(name))
  }

  pub fn name(&self) -> &str {
    &self.0
  }
}

impl From<String> for ParamType {
  fn from(name: String) -> Self {
    Self(Cow::Owned(name))
  }
}

impl From<&'static str> for ParamType {
  fn from(name: &'static str) -> Self {
    Self::new(name)
  }
}

impl fmt::Display for ParamType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// A typed runtime value flowing between components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
  pub ty: ParamType,
  pub value: serde_json::Value,
}

/// Targets are values too; a target list is a `Vec<Target>`.
pub type Target = Param;

impl Param {
  pub fn new(ty: ParamType, value: impl Into<serde_json::Value>) -> Self {
    Self {
      ty,
      value: value.into(),
    }
  }
}
