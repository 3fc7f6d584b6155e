//! Subject: a person as seen by one tenant organization.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
  ids::{PoleId, SubjectId},
  role::{OfficerRole, Status},
};

// ─── Term ────────────────────────────────────────────────────────────────────

/// A mandate period such as `"2022-2023"`.
///
/// Terms are opaque strings compared lexically, which orders `YYYY-YYYY`
/// labels chronologically. They are not stored on their own; the set of terms
/// is whatever the roster currently references.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Term(String);

impl Term {
  /// Trim `label`; a blank label means "no term".
  pub fn new(label: impl AsRef<str>) -> Option<Self> {
    let trimmed = label.as_ref().trim();
    (!trimmed.is_empty()).then(|| Self(trimmed.to_owned()))
  }

  pub fn as_str(&self) -> &str { &self.0 }

  pub(crate) fn is_blank(&self) -> bool { self.0.trim().is_empty() }
}

impl fmt::Display for Term {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

// ─── Pole membership ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoleMembership {
  pub pole_id:            PoleId,
  /// "Responsable" of the pole. Several members may hold it at once.
  #[serde(default)]
  pub is_officer_of_pole: bool,
}

impl PoleMembership {
  pub fn new(pole_id: impl Into<PoleId>) -> Self {
    Self { pole_id: pole_id.into(), is_officer_of_pole: false }
  }

  pub fn responsible(pole_id: impl Into<PoleId>) -> Self {
    Self { pole_id: pole_id.into(), is_officer_of_pole: true }
  }
}

// ─── Subject ─────────────────────────────────────────────────────────────────

/// Subjects are never deleted. Leaving the organization downgrades the status
/// to [`Status::Etudiant`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
  pub id:           SubjectId,
  pub status:       Status,
  #[serde(default)]
  pub poles:        Vec<PoleMembership>,
  #[serde(default)]
  pub officer_role: Option<OfficerRole>,
  #[serde(default)]
  pub term:         Option<Term>,
}

impl Subject {
  pub fn new(id: impl Into<SubjectId>, status: Status) -> Self {
    Self {
      id: id.into(),
      status,
      poles: Vec::new(),
      officer_role: None,
      term: None,
    }
  }

  pub fn with_poles(mut self, poles: Vec<PoleMembership>) -> Self {
    self.poles = poles;
    self
  }

  pub fn with_officer_role(mut self, role: OfficerRole) -> Self {
    self.officer_role = Some(role);
    self
  }

  pub fn with_term(mut self, term: &str) -> Self {
    self.term = Term::new(term);
    self
  }

  pub fn is_superadmin(&self) -> bool { crate::role::is_superadmin(self) }

  pub fn belongs_to_pole(&self, pole_id: &PoleId) -> bool {
    self.poles.iter().any(|m| &m.pole_id == pole_id)
  }

  /// The officer role and the president pole are equivalent signals of
  /// presidency.
  pub fn holds_presidency(&self) -> bool {
    self.officer_role == Some(OfficerRole::President)
      || self.poles.iter().any(|m| m.pole_id.is_president_pole())
  }

  /// The term, with blank labels read as "no term".
  pub fn effective_term(&self) -> Option<&Term> {
    self.term.as_ref().filter(|t| !t.is_blank())
  }
}
