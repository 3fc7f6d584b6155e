//! Handler for `/access`: which grant, if any, lets the caller through.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/access/{resource}/{action}` | `action` is `read` or `write` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use mandat_core::{
  Organization,
  access::Decision,
  ids::ResourceId,
  permission::Action,
  store::{DocumentStore, MemberDirectory},
};
use serde::Serialize;

use crate::{caller::Caller, error::ApiError};

#[derive(Debug, Serialize)]
pub struct AccessResponse {
  pub resource: ResourceId,
  pub action:   Action,
  pub allowed:  bool,
  pub decision: Decision,
}

/// `GET /access/{resource}/{action}`
pub async fn explain<D, M>(
  State(org): State<Arc<Organization<D, M>>>,
  Caller(caller): Caller,
  Path((resource, action)): Path<(String, String)>,
) -> Result<Json<AccessResponse>, ApiError>
where
  D: DocumentStore + 'static,
  M: MemberDirectory + 'static,
{
  let resource = ResourceId::new(resource);
  let action: Action = action.parse()?;
  let decision = org.explain(&caller, &resource, action).await?;
  Ok(Json(AccessResponse { allowed: decision.is_allowed(), resource, action, decision }))
}
