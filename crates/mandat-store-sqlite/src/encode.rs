//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings. Pole memberships are stored as compact
//! JSON. Statuses and officer roles use their lowercase names.

use chrono::{DateTime, Utc};
use mandat_core::{
  role::{OfficerRole, Status},
  store::MemberPatch,
  subject::{PoleMembership, Subject, Term},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

// ─── Status / OfficerRole ────────────────────────────────────────────────────

pub fn decode_status(s: &str) -> Result<Status> {
  s.parse().map_err(|_| Error::Decode(format!("unknown status: {s:?}")))
}

pub fn decode_officer_role(s: &str) -> Result<OfficerRole> {
  s.parse().map_err(|_| Error::Decode(format!("unknown officer role: {s:?}")))
}

// ─── Poles ───────────────────────────────────────────────────────────────────

pub fn encode_poles(poles: &[PoleMembership]) -> Result<String> {
  Ok(serde_json::to_string(poles)?)
}

pub fn decode_poles(s: &str) -> Result<Vec<PoleMembership>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `members` row.
#[derive(Debug, Clone)]
pub struct RawMember {
  pub subject_id:   String,
  pub status:       String,
  pub poles:        String,
  pub officer_role: Option<String>,
  pub term:         Option<String>,
}

impl RawMember {
  pub const COLUMNS: &'static str = "subject_id, status, poles, officer_role, term";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      subject_id:   row.get(0)?,
      status:       row.get(1)?,
      poles:        row.get(2)?,
      officer_role: row.get(3)?,
      term:         row.get(4)?,
    })
  }

  pub fn encode(subject: &Subject) -> Result<Self> {
    Ok(Self {
      subject_id:   subject.id.as_str().to_owned(),
      status:       subject.status.as_str().to_owned(),
      poles:        encode_poles(&subject.poles)?,
      officer_role: subject.officer_role.map(|r| r.as_str().to_owned()),
      term:         subject.effective_term().map(|t| t.as_str().to_owned()),
    })
  }

  pub fn into_subject(self) -> Result<Subject> {
    Ok(Subject {
      id:           self.subject_id.into(),
      status:       decode_status(&self.status)?,
      poles:        decode_poles(&self.poles)?,
      officer_role: self.officer_role.as_deref().map(decode_officer_role).transpose()?,
      term:         self.term.as_deref().and_then(Term::new),
    })
  }
}

/// A [`MemberPatch`] flattened to column values.
///
/// `set_*` flags distinguish "clear the column" from "leave it alone" for the
/// nullable columns.
#[derive(Debug, Clone)]
pub struct RawPatch {
  pub status:           Option<String>,
  pub poles:            Option<String>,
  pub set_officer_role: bool,
  pub officer_role:     Option<String>,
  pub set_term:         bool,
  pub term:             Option<String>,
}

impl RawPatch {
  pub fn encode(patch: &MemberPatch) -> Result<Self> {
    Ok(Self {
      status:           patch.status.map(|s| s.as_str().to_owned()),
      poles:            patch.poles.as_deref().map(encode_poles).transpose()?,
      set_officer_role: patch.officer_role.is_some(),
      officer_role:     patch.officer_role.flatten().map(|r| r.as_str().to_owned()),
      set_term:         patch.term.is_some(),
      term:             patch
        .term
        .clone()
        .flatten()
        .map(|t| t.as_str().to_owned()),
    })
  }
}
