//! [`SqliteStore`], the SQLite implementation of [`DocumentStore`] and
//! [`MemberDirectory`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use serde_json::Value;

use mandat_core::{
  ids::{SubjectId, TenantId},
  store::{
    CommitOutcome, DocumentStore, DocumentWrite, Guard, InsertOutcome, MemberDirectory,
    MemberPatch, Roster, UpdateOutcome, Version, Versioned,
  },
  subject::Subject,
};

use crate::{
  Error, Result,
  encode::{RawMember, RawPatch, encode_dt},
  schema::SCHEMA,
  version::{document_version, roster_version},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Mandat store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// What a conditional member update observed inside its transaction.
enum RawUpdate {
  Updated(RawMember),
  NotFound,
  Stale(String),
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

/// Every member row of `tenant`, ordered by subject id.
fn roster_rows(conn: &rusqlite::Connection, tenant: &str) -> rusqlite::Result<Vec<RawMember>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {} FROM members WHERE tenant_id = ?1 ORDER BY subject_id",
    RawMember::COLUMNS
  ))?;
  let rows = stmt.query_map(rusqlite::params![tenant], RawMember::from_row)?;
  rows.collect()
}

fn document_version_at(
  conn: &rusqlite::Connection,
  key: &str,
) -> rusqlite::Result<Option<Version>> {
  conn
    .query_row(
      "SELECT version FROM documents WHERE key = ?1",
      rusqlite::params![key],
      |r| r.get::<_, String>(0),
    )
    .optional()
    .map(|v| v.map(Version::new))
}

/// Evaluate `guards` against the state visible to `conn` and return the key
/// of the first one that fails.
fn failed_guard(
  conn: &rusqlite::Connection,
  guards: &[Guard],
) -> rusqlite::Result<Option<String>> {
  for guard in guards {
    let holds = match guard {
      Guard::Document { key, precondition } => {
        precondition.holds(document_version_at(conn, key)?.as_ref())
      }
      Guard::Roster { tenant, version } => {
        &roster_version(&roster_rows(conn, tenant.as_str())?) == version
      }
    };
    if !holds {
      return Ok(Some(guard.key()));
    }
  }
  Ok(None)
}

fn member_row(
  conn: &rusqlite::Connection,
  tenant: &str,
  id: &str,
) -> rusqlite::Result<Option<RawMember>> {
  conn
    .query_row(
      &format!(
        "SELECT {} FROM members WHERE tenant_id = ?1 AND subject_id = ?2",
        RawMember::COLUMNS
      ),
      rusqlite::params![tenant, id],
      RawMember::from_row,
    )
    .optional()
}

// ─── DocumentStore impl ──────────────────────────────────────────────────────

impl DocumentStore for SqliteStore {
  type Error = Error;

  async fn get(&self, key: &str) -> Result<Option<Versioned<Value>>> {
    let key = key.to_owned();

    let row: Option<(String, String)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT value_json, version FROM documents WHERE key = ?1",
              rusqlite::params![key],
              |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?,
        )
      })
      .await?;

    row
      .map(|(json, version)| {
        let value: Value = serde_json::from_str(&json)?;
        Ok::<_, Error>(Versioned { value, version: Version::new(version) })
      })
      .transpose()
  }

  async fn commit(
    &self,
    writes: Vec<DocumentWrite>,
    guards: Vec<Guard>,
  ) -> Result<CommitOutcome> {
    let now = encode_dt(Utc::now());
    let mut rows = Vec::with_capacity(writes.len());
    for write in writes {
      let json = serde_json::to_string(&write.value)?;
      let version = document_version(&json);
      rows.push((write.key, json, version, write.precondition));
    }

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // Returning before `tx.commit()` rolls the batch back.
        for (key, _, _, precondition) in &rows {
          if !precondition.holds(document_version_at(&tx, key)?.as_ref()) {
            return Ok(CommitOutcome::Stale { key: key.clone() });
          }
        }
        if let Some(key) = failed_guard(&tx, &guards)? {
          return Ok(CommitOutcome::Stale { key });
        }

        for (key, json, version, _) in &rows {
          tx.execute(
            "INSERT INTO documents (key, value_json, version, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET
               value_json = excluded.value_json,
               version    = excluded.version,
               updated_at = excluded.updated_at",
            rusqlite::params![key, json, version.as_str(), now],
          )?;
        }

        tx.commit()?;
        Ok(CommitOutcome::Committed)
      })
      .await?;

    Ok(outcome)
  }
}

// ─── MemberDirectory impl ────────────────────────────────────────────────────

impl MemberDirectory for SqliteStore {
  type Error = Error;

  async fn list_members(&self, tenant: &TenantId) -> Result<Roster> {
    let tenant = tenant.as_str().to_owned();

    let rows = self
      .conn
      .call(move |conn| Ok(roster_rows(conn, &tenant)?))
      .await?;

    let version = roster_version(&rows);
    let members = rows
      .into_iter()
      .map(RawMember::into_subject)
      .collect::<Result<Vec<_>>>()?;
    Ok(Roster { members, version })
  }

  async fn get_member(&self, tenant: &TenantId, id: &SubjectId) -> Result<Option<Subject>> {
    let tenant = tenant.as_str().to_owned();
    let id = id.as_str().to_owned();

    let row = self
      .conn
      .call(move |conn| Ok(member_row(conn, &tenant, &id)?))
      .await?;

    row.map(RawMember::into_subject).transpose()
  }

  async fn insert_member(&self, tenant: &TenantId, subject: Subject) -> Result<InsertOutcome> {
    let raw = RawMember::encode(&subject)?;
    let tenant = tenant.as_str().to_owned();
    let joined_at = encode_dt(Utc::now());

    let inserted = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "INSERT OR IGNORE INTO members
             (tenant_id, subject_id, status, poles, officer_role, term, joined_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            tenant,
            raw.subject_id,
            raw.status,
            raw.poles,
            raw.officer_role,
            raw.term,
            joined_at,
          ],
        )?;
        Ok(changed == 1)
      })
      .await?;

    Ok(if inserted { InsertOutcome::Inserted } else { InsertOutcome::Exists })
  }

  async fn update_member(
    &self,
    tenant: &TenantId,
    id: &SubjectId,
    patch: MemberPatch,
    guards: Vec<Guard>,
  ) -> Result<UpdateOutcome> {
    let raw = RawPatch::encode(&patch)?;
    let tenant = tenant.as_str().to_owned();
    let id = id.as_str().to_owned();

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if let Some(key) = failed_guard(&tx, &guards)? {
          return Ok(RawUpdate::Stale(key));
        }

        let changed = tx.execute(
          "UPDATE members SET
             status       = COALESCE(?3, status),
             poles        = COALESCE(?4, poles),
             officer_role = CASE WHEN ?5 THEN ?6 ELSE officer_role END,
             term         = CASE WHEN ?7 THEN ?8 ELSE term END
           WHERE tenant_id = ?1 AND subject_id = ?2",
          rusqlite::params![
            tenant,
            id,
            raw.status,
            raw.poles,
            raw.set_officer_role,
            raw.officer_role,
            raw.set_term,
            raw.term,
          ],
        )?;
        if changed == 0 {
          return Ok(RawUpdate::NotFound);
        }

        let row = member_row(&tx, &tenant, &id)?;
        tx.commit()?;
        Ok(row.map_or(RawUpdate::NotFound, RawUpdate::Updated))
      })
      .await?;

    Ok(match outcome {
      RawUpdate::Updated(row) => UpdateOutcome::Updated(row.into_subject()?),
      RawUpdate::NotFound => UpdateOutcome::NotFound,
      RawUpdate::Stale(key) => UpdateOutcome::Stale { key },
    })
  }
}
