//! String identifiers.
//!
//! Subject ids come from the upstream identity layer and pole ids are
//! generated from names, so all identifiers are opaque strings. Each gets its
//! own newtype so they cannot be mixed up at call sites.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(
      Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
    )]
    #[serde(transparent)]
    pub struct $name(String);

    impl $name {
      pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

      pub fn as_str(&self) -> &str { &self.0 }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
      }
    }

    impl From<&str> for $name {
      fn from(value: &str) -> Self { Self(value.to_owned()) }
    }

    impl From<String> for $name {
      fn from(value: String) -> Self { Self(value) }
    }
  };
}

string_id!(
  /// A person known to a tenant organization.
  SubjectId
);

string_id!(
  /// An organizational unit.
  PoleId
);

string_id!(
  /// An addressable page or feature whose read and write access are
  /// controlled independently.
  ResourceId
);

string_id!(
  /// The organization that owns every record the engine touches.
  TenantId
);

impl ResourceId {
  /// Resource gating permission and pole administration.
  pub fn admin() -> Self { Self::new("admin") }

  /// Resource gating member assignments.
  pub fn members() -> Self { Self::new("members") }

  /// Resource open to every authenticated status by default.
  pub fn home() -> Self { Self::new("home") }
}
