//! Caller extractor.
//!
//! The identity layer in front of this API authenticates the request and
//! forwards the subject id in the `x-subject-id` header. The subject is then
//! loaded from the tenant's directory so grants see its current status and
//! poles.

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use mandat_core::{
  Error as CoreError, Organization,
  ids::SubjectId,
  store::{DocumentStore, MemberDirectory},
  subject::Subject,
};

use crate::error::ApiError;

pub const SUBJECT_HEADER: &str = "x-subject-id";

/// The subject making the request.
pub struct Caller(pub Subject);

impl<D, M> FromRequestParts<Arc<Organization<D, M>>> for Caller
where
  D: DocumentStore + 'static,
  M: MemberDirectory + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    org: &Arc<Organization<D, M>>,
  ) -> Result<Self, Self::Rejection> {
    let id = parts
      .headers
      .get(SUBJECT_HEADER)
      .and_then(|v| v.to_str().ok())
      .map(str::trim)
      .filter(|v| !v.is_empty())
      .ok_or(ApiError::Unauthorized)?;

    match org.member(&SubjectId::new(id)).await {
      Ok(subject) => Ok(Caller(subject)),
      Err(CoreError::MemberNotFound(_)) => Err(ApiError::Unauthorized),
      Err(e) => Err(e.into()),
    }
  }
}
