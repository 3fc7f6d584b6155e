//! Version tokens.
//!
//! Documents are versioned by a SHA-256 of their stored JSON. A roster is
//! versioned by a SHA-256 over every member row of the tenant, taken in
//! subject-id order so the token does not depend on query order.

use mandat_core::store::Version;
use sha2::{Digest, Sha256};

use crate::encode::RawMember;

pub fn document_version(value_json: &str) -> Version {
  Version::new(hex::encode(Sha256::digest(value_json.as_bytes())))
}

/// `rows` must be sorted by `subject_id`.
pub fn roster_version(rows: &[RawMember]) -> Version {
  let mut hasher = Sha256::new();
  for row in rows {
    for field in [
      Some(row.subject_id.as_str()),
      Some(row.status.as_str()),
      Some(row.poles.as_str()),
      row.officer_role.as_deref(),
      row.term.as_deref(),
    ] {
      // Length-prefix each field so adjacent values cannot run together.
      let bytes = field.unwrap_or("\0null").as_bytes();
      hasher.update((bytes.len() as u64).to_le_bytes());
      hasher.update(bytes);
    }
  }
  Version::new(hex::encode(hasher.finalize()))
}
