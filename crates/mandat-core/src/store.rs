//! Collaborator traits: the [`DocumentStore`] holding pole lists and
//! permission sets, and the [`MemberDirectory`] holding subjects.
//!
//! Backends (e.g. `mandat-store-sqlite`) implement these. The engine never
//! holds state of its own between calls; every check-then-act operation reads
//! a version token and makes its write conditional on it, so a lost race
//! surfaces as a stale outcome instead of a silently broken invariant.
//!
//! Some operations read from one collaborator and write to the other: pole
//! removal scans the roster before writing the pole list, and assignment
//! checks the pole list before writing a subject. Those writes carry a
//! [`Guard`] on what was read, and a backend must evaluate every guard in the
//! same transaction as the write. Both collaborators therefore have to be
//! served by one backend.

use std::{future::Future, time::Duration};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
  Error, Result,
  error::TimedOut,
  ids::{SubjectId, TenantId},
  role::{OfficerRole, Status},
  subject::{PoleMembership, Subject, Term},
};

// ─── Versions ────────────────────────────────────────────────────────────────

/// Opaque token identifying the stored state a read observed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
  pub fn new(token: impl Into<String>) -> Self { Self(token.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

/// A value together with the version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
  pub value:   T,
  pub version: Version,
}

// ─── Documents ───────────────────────────────────────────────────────────────

/// Condition a document must satisfy for a write to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
  /// Write unconditionally.
  Any,
  /// The key must not exist yet.
  Absent,
  /// The stored version must still be this one.
  Matches(Version),
}

impl Precondition {
  /// The precondition protecting a read of `doc`.
  pub fn observed<T>(doc: Option<&Versioned<T>>) -> Self {
    match doc {
      Some(d) => Self::Matches(d.version.clone()),
      None => Self::Absent,
    }
  }

  /// Whether a document currently at `current` satisfies this precondition.
  pub fn holds(&self, current: Option<&Version>) -> bool {
    match self {
      Self::Any => true,
      Self::Absent => current.is_none(),
      Self::Matches(v) => current == Some(v),
    }
  }
}

#[derive(Debug, Clone)]
pub struct DocumentWrite {
  pub key:          String,
  pub value:        Value,
  pub precondition: Precondition,
}

impl DocumentWrite {
  pub fn unconditional(key: impl Into<String>, value: Value) -> Self {
    Self { key: key.into(), value, precondition: Precondition::Any }
  }
}

/// Result of [`DocumentStore::commit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
  Committed,
  /// A precondition or guard failed on `key`; nothing in the batch was
  /// written.
  Stale { key: String },
}

// ─── Guards ──────────────────────────────────────────────────────────────────

/// A version check on state read before a write, possibly held by the other
/// collaborator. It is evaluated atomically with the write it accompanies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
  /// Document `key` must still satisfy `precondition`.
  Document { key: String, precondition: Precondition },
  /// The roster of `tenant` must still be at `version`.
  Roster { tenant: TenantId, version: Version },
}

impl Guard {
  /// The key reported when this guard fails.
  pub fn key(&self) -> String {
    match self {
      Self::Document { key, .. } => key.clone(),
      Self::Roster { tenant, .. } => format!("tenants/{tenant}/members"),
    }
  }
}

/// Generic key/value document persistence.
pub trait DocumentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Fetch a document and its current version. Returns `None` if absent.
  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<Versioned<Value>>, Self::Error>> + Send + 'a;

  /// Apply every write in `writes` atomically, or none of them. Nothing is
  /// written unless every precondition and every guard in `guards` holds.
  fn commit(
    &self,
    writes: Vec<DocumentWrite>,
    guards: Vec<Guard>,
  ) -> impl Future<Output = Result<CommitOutcome, Self::Error>> + Send + '_;

  /// Write a single document unconditionally.
  fn set(
    &self,
    key: String,
    value: Value,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_ {
    async move {
      self
        .commit(vec![DocumentWrite::unconditional(key, value)], Vec::new())
        .await
        .map(|_| ())
    }
  }
}

// ─── Members ─────────────────────────────────────────────────────────────────

/// Every subject of a tenant, and the version of the roster as a whole.
#[derive(Debug, Clone)]
pub struct Roster {
  pub members: Vec<Subject>,
  pub version: Version,
}

impl Roster {
  pub fn find(&self, id: &SubjectId) -> Option<&Subject> {
    self.members.iter().find(|m| &m.id == id)
  }
}

/// A partial update to a subject. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemberPatch {
  pub status:       Option<Status>,
  pub poles:        Option<Vec<PoleMembership>>,
  pub officer_role: Option<Option<OfficerRole>>,
  pub term:         Option<Option<Term>>,
}

impl MemberPatch {
  pub fn apply(&self, subject: &mut Subject) {
    if let Some(status) = self.status {
      subject.status = status;
    }
    if let Some(poles) = &self.poles {
      subject.poles = poles.clone();
    }
    if let Some(role) = self.officer_role {
      subject.officer_role = role;
    }
    if let Some(term) = &self.term {
      subject.term = term.clone();
    }
  }
}

/// Result of [`MemberDirectory::insert_member`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
  Inserted,
  /// The id was already taken; nothing was written.
  Exists,
}

/// Result of [`MemberDirectory::update_member`].
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
  Updated(Subject),
  NotFound,
  /// A guard failed on `key`; nothing was written.
  Stale { key: String },
}

/// The people known to each tenant.
pub trait MemberDirectory: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn list_members<'a>(
    &'a self,
    tenant: &'a TenantId,
  ) -> impl Future<Output = Result<Roster, Self::Error>> + Send + 'a;

  fn get_member<'a>(
    &'a self,
    tenant: &'a TenantId,
    id: &'a SubjectId,
  ) -> impl Future<Output = Result<Option<Subject>, Self::Error>> + Send + 'a;

  /// Register a person who joined the tenant. Leaves an existing subject
  /// with the same id untouched.
  fn insert_member<'a>(
    &'a self,
    tenant: &'a TenantId,
    subject: Subject,
  ) -> impl Future<Output = Result<InsertOutcome, Self::Error>> + Send + 'a;

  /// Apply `patch` to one subject, only if every guard in `guards` holds.
  fn update_member<'a>(
    &'a self,
    tenant: &'a TenantId,
    id: &'a SubjectId,
    patch: MemberPatch,
    guards: Vec<Guard>,
  ) -> impl Future<Output = Result<UpdateOutcome, Self::Error>> + Send + 'a;
}

// ─── Bounded calls ───────────────────────────────────────────────────────────

/// Await a collaborator call for at most `limit`. Both collaborator errors and
/// timeouts become [`Error::StoreUnavailable`]; nothing is retried.
pub(crate) async fn bounded<T, E, F>(limit: Duration, call: F) -> Result<T>
where
  F: Future<Output = Result<T, E>>,
  E: std::error::Error + Send + Sync + 'static,
{
  match tokio::time::timeout(limit, call).await {
    Ok(Ok(value)) => Ok(value),
    Ok(Err(e)) => Err(Error::StoreUnavailable(Box::new(e))),
    Err(_) => Err(Error::StoreUnavailable(Box::new(TimedOut(limit)))),
  }
}
