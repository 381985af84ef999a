use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

static NEXT_COMPONENT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a component instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u64);

impl ComponentId {
  pub(crate) fn next() -> Self {
    Self(NEXT_COMPONENT_ID.fetch_add(1, Ordering::Relaxed))
  }
}

impl fmt::Display for ComponentId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// Handle of the container (a combination or an effect graph) owning a component.
///
/// Components refer to their owner by handle only, never by reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerId(Uuid);

impl OwnerId {
  pub fn new() -> Self {
    Self(Uuid::new_v4())
  }
}

impl Default for OwnerId {
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Display for OwnerId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}
