//! Poles, the organizational units of a tenant, and the [`PoleRegistry`]
//! that manages them.
//!
//! The registry persists the whole pole list as a single document, so every
//! mutation is one conditional write of the full list. It keeps no cache: an
//! operation works on a copy of the list it just loaded and only a committed
//! write becomes visible, so a rejected write leaves the last committed list
//! in place.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  ids::{PoleId, TenantId},
  store::{
    CommitOutcome, DocumentStore, DocumentWrite, Guard, MemberDirectory, Precondition,
    Versioned, bounded,
  },
};

// ─── Officer poles ───────────────────────────────────────────────────────────

pub const PRESIDENT_POLE: &str = "president";
pub const VICE_PRESIDENT_POLE: &str = "vice-president";
pub const SECRETARY_POLE: &str = "secretary";

/// Built-in poles for the officer positions. They are never stored in the
/// registry and always exist.
pub const OFFICER_POLES: [(&str, &str); 3] = [
  (PRESIDENT_POLE, "Président"),
  (VICE_PRESIDENT_POLE, "Vice-président"),
  (SECRETARY_POLE, "Secrétaire"),
];

impl PoleId {
  pub fn is_president_pole(&self) -> bool { self.as_str() == PRESIDENT_POLE }

  /// Officer poles carry no "responsable" flag.
  pub fn is_officer_pole(&self) -> bool {
    OFFICER_POLES.iter().any(|(id, _)| self.as_str() == *id)
  }
}

// ─── Pole ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pole {
  /// Stable across renames.
  pub id:   PoleId,
  pub name: String,
}

fn clean_name(name: &str) -> Result<String> {
  let trimmed = name.trim();
  if trimmed.is_empty() {
    return Err(Error::Validation("pole name must not be empty".into()));
  }
  Ok(trimmed.to_owned())
}

fn same_name(a: &str, b: &str) -> bool {
  a.trim().to_lowercase() == b.trim().to_lowercase()
}

fn fold_accent(c: char) -> char {
  match c {
    'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
    'ç' => 'c',
    'è' | 'é' | 'ê' | 'ë' => 'e',
    'ì' | 'í' | 'î' | 'ï' => 'i',
    'ñ' => 'n',
    'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
    'ù' | 'ú' | 'û' | 'ü' => 'u',
    'ý' | 'ÿ' => 'y',
    other => other,
  }
}

/// Lowercase ASCII slug of `name`, e.g. `"Qualité & Audit"` → `"qualite-audit"`.
pub fn slugify(name: &str) -> String {
  let mut slug = String::with_capacity(name.len());
  for c in name.to_lowercase().chars().map(fold_accent) {
    if c.is_ascii_alphanumeric() {
      slug.push(c);
    } else if !slug.is_empty() && !slug.ends_with('-') {
      slug.push('-');
    }
  }
  let slug = slug.trim_end_matches('-');
  if slug.is_empty() { "pole".to_owned() } else { slug.to_owned() }
}

/// `<slug>-<unix millis>`, with a counter appended on collision.
fn generate_id(name: &str, now: DateTime<Utc>, existing: &[Pole]) -> PoleId {
  let base = format!("{}-{}", slugify(name), now.timestamp_millis());
  let taken = |candidate: &PoleId| {
    candidate.is_officer_pole() || existing.iter().any(|p| &p.id == candidate)
  };

  let mut candidate = PoleId::new(base.clone());
  let mut n = 2;
  while taken(&candidate) {
    candidate = PoleId::new(format!("{base}-{n}"));
    n += 1;
  }
  candidate
}

// ─── Registry ────────────────────────────────────────────────────────────────

pub struct PoleRegistry<D, M> {
  documents: Arc<D>,
  directory: Arc<M>,
  tenant:    TenantId,
  timeout:   Duration,
}

impl<D, M> Clone for PoleRegistry<D, M> {
  fn clone(&self) -> Self {
    Self {
      documents: Arc::clone(&self.documents),
      directory: Arc::clone(&self.directory),
      tenant:    self.tenant.clone(),
      timeout:   self.timeout,
    }
  }
}

impl<D, M> PoleRegistry<D, M>
where
  D: DocumentStore,
  M: MemberDirectory,
{
  pub fn new(
    documents: Arc<D>,
    directory: Arc<M>,
    tenant: TenantId,
    timeout: Duration,
  ) -> Self {
    Self { documents, directory, tenant, timeout }
  }

  fn key(&self) -> String { format!("tenants/{}/poles", self.tenant) }

  async fn load(&self) -> Result<(Vec<Pole>, Precondition)> {
    let key = self.key();
    let doc: Option<Versioned<serde_json::Value>> =
      bounded(self.timeout, self.documents.get(&key)).await?;
    let precondition = Precondition::observed(doc.as_ref());
    let poles = match doc {
      Some(d) => serde_json::from_value(d.value)?,
      None => Vec::new(),
    };
    Ok((poles, precondition))
  }

  async fn store(
    &self,
    poles: &[Pole],
    precondition: Precondition,
    guards: Vec<Guard>,
  ) -> Result<()> {
    let write = DocumentWrite {
      key: self.key(),
      value: serde_json::to_value(poles)?,
      precondition,
    };
    match bounded(self.timeout, self.documents.commit(vec![write], guards)).await? {
      CommitOutcome::Committed => Ok(()),
      CommitOutcome::Stale { key } => {
        tracing::warn!(%key, "changed concurrently; pole list write dropped");
        Err(Error::VersionConflict(key))
      }
    }
  }

  fn ensure_unique(poles: &[Pole], name: &str, except: Option<&PoleId>) -> Result<()> {
    let clash_registered = poles
      .iter()
      .filter(|p| Some(&p.id) != except)
      .any(|p| same_name(&p.name, name));
    let clash_officer = OFFICER_POLES.iter().any(|(_, n)| same_name(n, name));

    if clash_registered || clash_officer {
      return Err(Error::DuplicateName(name.to_owned()));
    }
    Ok(())
  }

  /// Registered poles in stored order. Officer poles are not included.
  pub async fn list(&self) -> Result<Vec<Pole>> {
    Ok(self.load().await?.0)
  }

  /// Check that every id names an officer pole or a registered pole.
  ///
  /// Returns a guard on the pole list the check was made against, to go with
  /// the write that relies on it, or `None` when only officer poles were
  /// named and the list was never read.
  pub(crate) async fn check_known<'i>(
    &self,
    ids: impl IntoIterator<Item = &'i PoleId>,
  ) -> Result<Option<Guard>> {
    let registered: Vec<&PoleId> =
      ids.into_iter().filter(|id| !id.is_officer_pole()).collect();
    if registered.is_empty() {
      return Ok(None);
    }

    let (poles, precondition) = self.load().await?;
    let unknown = registered
      .into_iter()
      .find(|id| !poles.iter().any(|p| &p.id == *id));
    if let Some(id) = unknown {
      return Err(Error::PoleNotFound(id.clone()));
    }
    Ok(Some(Guard::Document { key: self.key(), precondition }))
  }

  pub async fn add(&self, name: &str) -> Result<Pole> {
    let name = clean_name(name)?;
    let (mut poles, precondition) = self.load().await?;
    Self::ensure_unique(&poles, &name, None)?;

    let pole = Pole { id: generate_id(&name, Utc::now(), &poles), name };
    poles.push(pole.clone());
    self.store(&poles, precondition, Vec::new()).await?;

    tracing::info!(tenant = %self.tenant, pole = %pole.id, "pole added");
    Ok(pole)
  }

  pub async fn rename(&self, id: &PoleId, new_name: &str) -> Result<Pole> {
    let new_name = clean_name(new_name)?;
    let (mut poles, precondition) = self.load().await?;
    let index = poles
      .iter()
      .position(|p| &p.id == id)
      .ok_or_else(|| Error::PoleNotFound(id.clone()))?;
    Self::ensure_unique(&poles, &new_name, Some(id))?;

    poles[index].name = new_name;
    let renamed = poles[index].clone();
    self.store(&poles, precondition, Vec::new()).await?;

    tracing::info!(tenant = %self.tenant, pole = %id, "pole renamed");
    Ok(renamed)
  }

  /// Remove a pole no subject references.
  ///
  /// The write is conditional on both the pole list and the roster it
  /// scanned, so an assignment racing with it makes one of the two fail with
  /// [`Error::VersionConflict`].
  pub async fn remove(&self, id: &PoleId) -> Result<()> {
    let (mut poles, precondition) = self.load().await?;
    let before = poles.len();
    poles.retain(|p| &p.id != id);
    if poles.len() == before {
      return Err(Error::PoleNotFound(id.clone()));
    }

    let roster =
      bounded(self.timeout, self.directory.list_members(&self.tenant)).await?;
    let members = roster.members.iter().filter(|m| m.belongs_to_pole(id)).count();
    if members > 0 {
      tracing::warn!(tenant = %self.tenant, pole = %id, members, "pole in use");
      return Err(Error::InUse { pole: id.clone(), members });
    }

    let scanned = Guard::Roster { tenant: self.tenant.clone(), version: roster.version };
    self.store(&poles, precondition, vec![scanned]).await?;
    tracing::info!(tenant = %self.tenant, pole = %id, "pole removed");
    Ok(())
  }
}
