//! In-memory collaborator used by the unit tests.

use std::{
  collections::HashMap,
  sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicU64, Ordering},
  },
  time::Duration,
};

use serde_json::Value;
use thiserror::Error;
use tokio::sync::Notify;

use crate::{
  ids::{SubjectId, TenantId},
  store::{
    CommitOutcome, DocumentStore, DocumentWrite, Guard, InsertOutcome, MemberDirectory,
    MemberPatch, Roster, UpdateOutcome, Version, Versioned,
  },
  subject::Subject,
};

pub fn tenant() -> TenantId { TenantId::new("acme") }

#[derive(Debug, Error)]
pub enum MemoryError {
  #[error("injected failure")]
  Injected,
  #[error("lock poisoned")]
  Poisoned,
}

type Documents = HashMap<String, Versioned<Value>>;
type Rosters = HashMap<TenantId, (u64, Vec<Subject>)>;

/// Holds one write back until the test releases it.
#[derive(Default)]
pub struct WriteGate {
  arrived: Notify,
  release: Notify,
}

impl WriteGate {
  /// Resolves once the held write has read everything it will read.
  pub async fn arrived(&self) { self.arrived.notified().await }

  pub fn release(&self) { self.release.notify_one() }
}

#[derive(Default)]
pub struct MemoryStore {
  documents:    Mutex<Documents>,
  members:      Mutex<Rosters>,
  revision:     AtomicU64,
  fail_reads:   AtomicBool,
  fail_commits: AtomicBool,
  delay:        Mutex<Option<Duration>>,
  gate:         Mutex<Option<Arc<WriteGate>>>,
}

fn guard_holds(docs: &Documents, members: &Rosters, guard: &Guard) -> bool {
  match guard {
    Guard::Document { key, precondition } => {
      precondition.holds(docs.get(key).map(|d| &d.version))
    }
    Guard::Roster { tenant, version } => {
      let revision = members.get(tenant).map_or(0, |(revision, _)| *revision);
      version.as_str() == revision.to_string()
    }
  }
}

impl MemoryStore {
  /// Add a subject to the default tenant.
  pub fn seed(&self, subject: Subject) {
    let mut members = self.members.lock().unwrap();
    let (revision, roster) = members.entry(tenant()).or_default();
    *revision += 1;
    roster.push(subject);
  }

  pub fn member(&self, id: &str) -> Subject {
    let members = self.members.lock().unwrap();
    members[&tenant()]
      .1
      .iter()
      .find(|m| m.id.as_str() == id)
      .cloned()
      .unwrap()
  }

  pub fn fail_reads(&self, fail: bool) { self.fail_reads.store(fail, Ordering::SeqCst); }

  pub fn fail_commits(&self, fail: bool) {
    self.fail_commits.store(fail, Ordering::SeqCst);
  }

  pub fn set_delay(&self, delay: Option<Duration>) {
    *self.delay.lock().unwrap() = delay;
  }

  /// Bump the roster version without changing any member.
  pub fn touch_roster(&self) {
    let mut members = self.members.lock().unwrap();
    members.entry(tenant()).or_default().0 += 1;
  }

  /// Hold the next `commit` or `update_member` before it checks anything.
  pub fn hold_next_write(&self) -> Arc<WriteGate> {
    let gate = Arc::new(WriteGate::default());
    *self.gate.lock().unwrap() = Some(Arc::clone(&gate));
    gate
  }

  async fn pause(&self) {
    let delay = *self.delay.lock().unwrap();
    if let Some(delay) = delay {
      tokio::time::sleep(delay).await;
    }
  }

  async fn before_write(&self) -> Result<(), MemoryError> {
    self.pause().await;
    let gate = {
      let mut slot = self.gate.lock().map_err(|_| MemoryError::Poisoned)?;
      slot.take()
    };
    if let Some(gate) = gate {
      gate.arrived.notify_one();
      gate.release.notified().await;
    }
    if self.fail_commits.load(Ordering::SeqCst) {
      return Err(MemoryError::Injected);
    }
    Ok(())
  }

  fn check_reads(&self) -> Result<(), MemoryError> {
    if self.fail_reads.load(Ordering::SeqCst) {
      return Err(MemoryError::Injected);
    }
    Ok(())
  }

  fn next_version(&self) -> Version {
    Version::new(self.revision.fetch_add(1, Ordering::SeqCst).to_string())
  }
}

impl DocumentStore for MemoryStore {
  type Error = MemoryError;

  async fn get(&self, key: &str) -> Result<Option<Versioned<Value>>, MemoryError> {
    self.pause().await;
    self.check_reads()?;
    let docs = self.documents.lock().map_err(|_| MemoryError::Poisoned)?;
    Ok(docs.get(key).cloned())
  }

  async fn commit(
    &self,
    writes: Vec<DocumentWrite>,
    guards: Vec<Guard>,
  ) -> Result<CommitOutcome, MemoryError> {
    self.before_write().await?;
    // Documents before members, in every write.
    let mut docs = self.documents.lock().map_err(|_| MemoryError::Poisoned)?;
    let members = self.members.lock().map_err(|_| MemoryError::Poisoned)?;

    for write in &writes {
      if !write.precondition.holds(docs.get(&write.key).map(|d| &d.version)) {
        return Ok(CommitOutcome::Stale { key: write.key.clone() });
      }
    }
    if let Some(failed) = guards.iter().find(|g| !guard_holds(&docs, &members, g)) {
      return Ok(CommitOutcome::Stale { key: failed.key() });
    }

    for write in writes {
      let version = self.next_version();
      docs.insert(write.key, Versioned { value: write.value, version });
    }
    Ok(CommitOutcome::Committed)
  }
}

impl MemberDirectory for MemoryStore {
  type Error = MemoryError;

  async fn list_members(&self, tenant: &TenantId) -> Result<Roster, MemoryError> {
    self.pause().await;
    self.check_reads()?;
    let members = self.members.lock().map_err(|_| MemoryError::Poisoned)?;
    let (revision, roster) = members.get(tenant).cloned().unwrap_or_default();
    Ok(Roster { members: roster, version: Version::new(revision.to_string()) })
  }

  async fn get_member(
    &self,
    tenant: &TenantId,
    id: &SubjectId,
  ) -> Result<Option<Subject>, MemoryError> {
    self.pause().await;
    self.check_reads()?;
    let members = self.members.lock().map_err(|_| MemoryError::Poisoned)?;
    Ok(
      members
        .get(tenant)
        .and_then(|(_, roster)| roster.iter().find(|m| &m.id == id).cloned()),
    )
  }

  async fn insert_member(
    &self,
    tenant: &TenantId,
    subject: Subject,
  ) -> Result<InsertOutcome, MemoryError> {
    let mut members = self.members.lock().map_err(|_| MemoryError::Poisoned)?;
    let (revision, roster) = members.entry(tenant.clone()).or_default();
    if roster.iter().any(|m| m.id == subject.id) {
      return Ok(InsertOutcome::Exists);
    }
    *revision += 1;
    roster.push(subject);
    Ok(InsertOutcome::Inserted)
  }

  async fn update_member(
    &self,
    tenant: &TenantId,
    id: &SubjectId,
    patch: MemberPatch,
    guards: Vec<Guard>,
  ) -> Result<UpdateOutcome, MemoryError> {
    self.before_write().await?;
    let docs = self.documents.lock().map_err(|_| MemoryError::Poisoned)?;
    let mut members = self.members.lock().map_err(|_| MemoryError::Poisoned)?;

    if let Some(failed) = guards.iter().find(|g| !guard_holds(&docs, &members, g)) {
      return Ok(UpdateOutcome::Stale { key: failed.key() });
    }
    let (revision, roster) = members.entry(tenant.clone()).or_default();
    let Some(subject) = roster.iter_mut().find(|m| &m.id == id) else {
      return Ok(UpdateOutcome::NotFound);
    };
    patch.apply(subject);
    let updated = subject.clone();
    *revision += 1;
    Ok(UpdateOutcome::Updated(updated))
  }
}
