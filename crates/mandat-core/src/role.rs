//! Subject statuses, officer roles and the capability predicates built on
//! them.
//!
//! Status semantics live here and nowhere else: other modules ask
//! [`Status::is_superadmin`], [`Status::is_at_least_admin`] or
//! [`Status::is_member`] instead of comparing status names.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, subject::Subject};

// ─── Status ──────────────────────────────────────────────────────────────────

/// The standing of a subject inside a tenant organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
  Superadmin,
  Admin,
  Member,
  /// Known to the tenant but not (or no longer) a member of it.
  Etudiant,
}

impl Status {
  pub const ALL: [Status; 4] =
    [Status::Superadmin, Status::Admin, Status::Member, Status::Etudiant];

  /// Superadmins bypass every access check. They are still bound by write
  /// invariants such as the single president per term.
  pub fn is_superadmin(self) -> bool { matches!(self, Self::Superadmin) }

  pub fn is_at_least_admin(self) -> bool {
    matches!(self, Self::Superadmin | Self::Admin)
  }

  /// Whether the subject belongs to the organization. Only members can be
  /// granted access through poles or explicit member lists.
  pub fn is_member(self) -> bool {
    matches!(self, Self::Superadmin | Self::Admin | Self::Member)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Superadmin => "superadmin",
      Self::Admin => "admin",
      Self::Member => "member",
      Self::Etudiant => "etudiant",
    }
  }
}

impl fmt::Display for Status {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Status {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|status| status.as_str() == s)
      .ok_or_else(|| Error::Validation(format!("unknown status: {s:?}")))
  }
}

// ─── Officer roles ───────────────────────────────────────────────────────────

/// A leadership position held by a member for one term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfficerRole {
  President,
  VicePresident,
  Secretary,
  Treasurer,
}

impl OfficerRole {
  pub const ALL: [OfficerRole; 4] = [
    OfficerRole::President,
    OfficerRole::VicePresident,
    OfficerRole::Secretary,
    OfficerRole::Treasurer,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::President => "president",
      Self::VicePresident => "vice_president",
      Self::Secretary => "secretary",
      Self::Treasurer => "treasurer",
    }
  }
}

impl fmt::Display for OfficerRole {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OfficerRole {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|role| role.as_str() == s)
      .ok_or_else(|| Error::Validation(format!("unknown officer role: {s:?}")))
  }
}

/// Checked first by every access decision.
pub fn is_superadmin(subject: &Subject) -> bool {
  subject.status.is_superadmin()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn capability_predicates() {
    assert!(Status::Superadmin.is_at_least_admin());
    assert!(Status::Admin.is_at_least_admin());
    assert!(!Status::Member.is_at_least_admin());

    assert!(Status::Member.is_member());
    assert!(!Status::Etudiant.is_member());
    assert!(!Status::Admin.is_superadmin());
  }

  #[test]
  fn status_names_parse_back() {
    for status in Status::ALL {
      assert_eq!(status.as_str().parse::<Status>().unwrap(), status);
    }
    assert!("root".parse::<Status>().is_err());
  }

  #[test]
  fn officer_role_serde_matches_as_str() {
    for role in OfficerRole::ALL {
      let json = serde_json::to_string(&role).unwrap();
      assert_eq!(json, format!("\"{}\"", role.as_str()));
    }
  }
}
