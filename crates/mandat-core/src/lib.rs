//! Core types and the authorization / term-assignment engine for Mandat.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Persistence is injected through the [`store::DocumentStore`] and
//! [`store::MemberDirectory`] traits; everything else is derived from them on
//! each call, so the engine itself carries no shared mutable state.

pub mod access;
pub mod assignment;
pub mod error;
pub mod ids;
pub mod organization;
pub mod permission;
pub mod pole;
pub mod role;
pub mod store;
pub mod subject;
pub mod term;

pub use error::{Error, Result};
pub use organization::{Organization, Settings};

#[cfg(test)]
mod testing;
