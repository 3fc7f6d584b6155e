//! Error types for `mandat-core`.

use std::time::Duration;

use thiserror::Error;

use crate::{
  ids::{PoleId, ResourceId, SubjectId},
  permission::Action,
  subject::Term,
};

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid input: {0}")]
  Validation(String),

  #[error("a pole named {0:?} already exists")]
  DuplicateName(String),

  #[error("pole {pole} is still assigned to {members} member(s)")]
  InUse { pole: PoleId, members: usize },

  #[error("pole not found: {0}")]
  PoleNotFound(PoleId),

  #[error("member not found: {0}")]
  MemberNotFound(SubjectId),

  #[error("term {term} already has a president ({holder})")]
  PresidentConflict { term: Term, holder: SubjectId },

  #[error("forbidden: {action} access to {resource} denied")]
  Forbidden { resource: ResourceId, action: Action },

  /// A conditional write lost against a concurrent writer. Nothing was
  /// written; the caller may reload and retry.
  #[error("{0} was modified concurrently")]
  VersionConflict(String),

  #[error("store unavailable: {0}")]
  StoreUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

/// A collaborator call that did not answer within the configured bound.
#[derive(Debug, Error)]
#[error("store call exceeded {0:?}")]
pub struct TimedOut(pub Duration);

pub type Result<T, E = Error> = std::result::Result<T, E>;
