//! Handlers for `/permissions` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/permissions/{resource}/{action}` | Needs `read` on `admin` |
//! | `PUT`  | `/permissions/{resource}/{action}` | Body: a permission set |
//! | `PUT`  | `/permissions/{resource}` | Body: `{"read":{..},"write":{..}}`, saved together |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use mandat_core::{
  Organization,
  ids::ResourceId,
  permission::{Action, PermissionSet},
  store::{DocumentStore, MemberDirectory},
};
use serde::{Deserialize, Serialize};

use crate::{caller::Caller, error::ApiError};

// ─── Get ─────────────────────────────────────────────────────────────────────

/// `GET /permissions/{resource}/{action}`
pub async fn get_one<D, M>(
  State(org): State<Arc<Organization<D, M>>>,
  Caller(caller): Caller,
  Path((resource, action)): Path<(String, String)>,
) -> Result<Json<PermissionSet>, ApiError>
where
  D: DocumentStore + 'static,
  M: MemberDirectory + 'static,
{
  let action: Action = action.parse()?;
  org.require(&caller, &ResourceId::admin(), Action::Read).await?;
  let set = org.get_permission(&ResourceId::new(resource), action).await?;
  Ok(Json(set))
}

// ─── Set ─────────────────────────────────────────────────────────────────────

/// `PUT /permissions/{resource}/{action}`
pub async fn set_one<D, M>(
  State(org): State<Arc<Organization<D, M>>>,
  Caller(caller): Caller,
  Path((resource, action)): Path<(String, String)>,
  Json(set): Json<PermissionSet>,
) -> Result<Json<PermissionSet>, ApiError>
where
  D: DocumentStore + 'static,
  M: MemberDirectory + 'static,
{
  let action: Action = action.parse()?;
  let saved = org
    .set_permission(&caller, &ResourceId::new(resource), action, set)
    .await?;
  Ok(Json(saved))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PermissionPair {
  #[serde(default)]
  pub read:  PermissionSet,
  #[serde(default)]
  pub write: PermissionSet,
}

/// `PUT /permissions/{resource}`
pub async fn set_pair<D, M>(
  State(org): State<Arc<Organization<D, M>>>,
  Caller(caller): Caller,
  Path(resource): Path<String>,
  Json(pair): Json<PermissionPair>,
) -> Result<Json<PermissionPair>, ApiError>
where
  D: DocumentStore + 'static,
  M: MemberDirectory + 'static,
{
  let (read, write) = org
    .set_permission_pair(&caller, &ResourceId::new(resource), pair.read, pair.write)
    .await?;
  Ok(Json(PermissionPair { read, write }))
}
