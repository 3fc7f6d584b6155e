//! Permission sets and the [`PermissionStore`] persisting them.
//!
//! A permission set is keyed by `(resource, action)`. The read and write sets
//! of a resource are separate records and nothing ties them together: write
//! access does not imply read access.

use std::{
  collections::{HashMap, HashSet},
  fmt,
  hash::Hash,
  str::FromStr,
  sync::Arc,
  time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  ids::{PoleId, ResourceId, SubjectId, TenantId},
  role::Status,
  store::{CommitOutcome, DocumentStore, DocumentWrite, bounded},
};

// ─── Action ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
  Read,
  Write,
}

impl Action {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Read => "read",
      Self::Write => "write",
    }
  }
}

impl fmt::Display for Action {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Action {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "read" => Ok(Self::Read),
      "write" => Ok(Self::Write),
      other => Err(Error::Validation(format!("unknown action: {other:?}"))),
    }
  }
}

// ─── PermissionSet ───────────────────────────────────────────────────────────

/// Who may perform one action on one resource.
///
/// The three grant lists are alternatives: matching any one of them is
/// enough. `any_member` is the blanket grant to every member of the
/// organization. It is independent of the pole catalog, so poles added or
/// removed later change nothing about who it admits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
  #[serde(default)]
  pub any_member:      bool,
  #[serde(default)]
  pub allowed_roles:   Vec<Status>,
  #[serde(default)]
  pub allowed_poles:   Vec<PoleId>,
  #[serde(default)]
  pub allowed_members: Vec<SubjectId>,
}

fn dedup<T: Eq + Hash + Clone>(items: &mut Vec<T>) {
  let mut seen = HashSet::new();
  items.retain(|item| seen.insert(item.clone()));
}

impl PermissionSet {
  /// The blanket grant to every member.
  pub fn any_member() -> Self {
    Self { any_member: true, ..Self::default() }
  }

  pub fn roles(roles: impl IntoIterator<Item = Status>) -> Self {
    Self { allowed_roles: roles.into_iter().collect(), ..Self::default() }.normalized()
  }

  pub fn poles<I, P>(poles: I) -> Self
  where
    I: IntoIterator<Item = P>,
    P: Into<PoleId>,
  {
    Self {
      allowed_poles: poles.into_iter().map(Into::into).collect(),
      ..Self::default()
    }
  }

  pub fn members<I, S>(members: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<SubjectId>,
  {
    Self {
      allowed_members: members.into_iter().map(Into::into).collect(),
      ..Self::default()
    }
  }

  /// Deduplicate every list (first occurrence wins) and turn a `member`
  /// entry in `allowed_roles` into the `any_member` flag.
  pub fn normalized(mut self) -> Self {
    if self.allowed_roles.contains(&Status::Member) {
      self.any_member = true;
    }
    dedup(&mut self.allowed_roles);
    dedup(&mut self.allowed_poles);
    dedup(&mut self.allowed_members);
    self
  }

  pub fn is_empty(&self) -> bool {
    !self.any_member
      && self.allowed_roles.is_empty()
      && self.allowed_poles.is_empty()
      && self.allowed_members.is_empty()
  }
}

// ─── Baseline ────────────────────────────────────────────────────────────────

/// Permission sets used when a resource has no stored record.
///
/// Anything not listed here denies everyone but superadmins until an
/// administrator saves a record for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Baseline(HashMap<(ResourceId, Action), PermissionSet>);

impl Baseline {
  pub fn empty() -> Self { Self(HashMap::new()) }

  pub fn with(mut self, resource: ResourceId, action: Action, set: PermissionSet) -> Self {
    self.0.insert((resource, action), set.normalized());
    self
  }

  pub fn get(&self, resource: &ResourceId, action: Action) -> Option<&PermissionSet> {
    self.0.get(&(resource.clone(), action))
  }
}

impl Default for Baseline {
  /// `home` is readable and writable by every authenticated status.
  fn default() -> Self {
    let everyone = PermissionSet::roles(Status::ALL);
    Self::empty()
      .with(ResourceId::home(), Action::Read, everyone.clone())
      .with(ResourceId::home(), Action::Write, everyone)
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

pub struct PermissionStore<D> {
  documents: Arc<D>,
  tenant:    TenantId,
  timeout:   Duration,
  baseline:  Arc<Baseline>,
}

impl<D> Clone for PermissionStore<D> {
  fn clone(&self) -> Self {
    Self {
      documents: Arc::clone(&self.documents),
      tenant:    self.tenant.clone(),
      timeout:   self.timeout,
      baseline:  Arc::clone(&self.baseline),
    }
  }
}

impl<D: DocumentStore> PermissionStore<D> {
  pub fn new(
    documents: Arc<D>,
    tenant: TenantId,
    timeout: Duration,
    baseline: Baseline,
  ) -> Self {
    Self { documents, tenant, timeout, baseline: Arc::new(baseline) }
  }

  fn key(&self, resource: &ResourceId, action: Action) -> Result<String> {
    let id = resource.as_str();
    if id.is_empty() || id.contains('/') {
      return Err(Error::Validation(format!("invalid resource id: {id:?}")));
    }
    Ok(format!("tenants/{}/permissions/{id}/{action}", self.tenant))
  }

  fn write(
    &self,
    resource: &ResourceId,
    action: Action,
    set: &PermissionSet,
  ) -> Result<DocumentWrite> {
    Ok(DocumentWrite::unconditional(
      self.key(resource, action)?,
      serde_json::to_value(set)?,
    ))
  }

  /// The stored set, else the baseline, else the empty set.
  pub async fn get(&self, resource: &ResourceId, action: Action) -> Result<PermissionSet> {
    let key = self.key(resource, action)?;
    let doc = bounded(self.timeout, self.documents.get(&key)).await?;
    match doc {
      Some(d) => Ok(serde_json::from_value::<PermissionSet>(d.value)?.normalized()),
      None => Ok(self.baseline.get(resource, action).cloned().unwrap_or_default()),
    }
  }

  /// Replace the set for `(resource, action)`. Returns the set as stored.
  pub async fn set(
    &self,
    resource: &ResourceId,
    action: Action,
    set: PermissionSet,
  ) -> Result<PermissionSet> {
    let set = set.normalized();
    let write = self.write(resource, action, &set)?;
    bounded(self.timeout, self.documents.set(write.key, write.value)).await?;

    tracing::info!(tenant = %self.tenant, %resource, %action, "permission set saved");
    Ok(set)
  }

  /// Replace the read and write sets of `resource` in one atomic commit.
  pub async fn set_pair(
    &self,
    resource: &ResourceId,
    read: PermissionSet,
    write: PermissionSet,
  ) -> Result<(PermissionSet, PermissionSet)> {
    let read = read.normalized();
    let write = write.normalized();
    let writes = vec![
      self.write(resource, Action::Read, &read)?,
      self.write(resource, Action::Write, &write)?,
    ];
    match bounded(self.timeout, self.documents.commit(writes, Vec::new())).await? {
      CommitOutcome::Committed => {}
      CommitOutcome::Stale { key } => return Err(Error::VersionConflict(key)),
    }

    tracing::info!(tenant = %self.tenant, %resource, "read/write permission pair saved");
    Ok((read, write))
  }
}
