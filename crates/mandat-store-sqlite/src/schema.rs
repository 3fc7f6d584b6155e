//! SQL schema for the Mandat SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Pole lists and permission sets, one JSON document per key.
CREATE TABLE IF NOT EXISTS documents (
    key         TEXT PRIMARY KEY,
    value_json  TEXT NOT NULL,
    version     TEXT NOT NULL,   -- content hash of value_json
    updated_at  TEXT NOT NULL    -- ISO 8601 UTC
);

-- Subjects are never deleted; leaving downgrades the status.
CREATE TABLE IF NOT EXISTS members (
    tenant_id     TEXT NOT NULL,
    subject_id    TEXT NOT NULL,
    status        TEXT NOT NULL,             -- 'superadmin' | 'admin' | 'member' | 'etudiant'
    poles         TEXT NOT NULL DEFAULT '[]',-- JSON array of pole memberships
    officer_role  TEXT,                      -- NULL when none
    term          TEXT,                      -- NULL when no term
    joined_at     TEXT NOT NULL,
    PRIMARY KEY (tenant_id, subject_id)
);

CREATE INDEX IF NOT EXISTS members_term_idx ON members(tenant_id, term);

PRAGMA user_version = 1;
";
