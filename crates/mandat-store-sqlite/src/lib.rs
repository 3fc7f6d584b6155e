//! SQLite backend for Mandat.
//!
//! One [`SqliteStore`] implements both collaborators the engine consumes:
//! the [`mandat_core::store::DocumentStore`] and the
//! [`mandat_core::store::MemberDirectory`]. It wraps [`tokio_rusqlite`] so
//! all database access runs on a dedicated thread without blocking the async
//! runtime, and every conditional write runs inside a single transaction.

mod encode;
mod schema;
mod store;
mod version;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
