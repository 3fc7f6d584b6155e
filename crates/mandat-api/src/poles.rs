//! Handlers for `/poles` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/poles` | Registered poles, officer poles excluded |
//! | `POST`   | `/poles` | Body: `{"name":"Trésorerie"}` |
//! | `PATCH`  | `/poles/{id}` | Body: `{"name":"..."}` |
//! | `DELETE` | `/poles/{id}` | 409 while a member still belongs to it |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use mandat_core::{
  Organization,
  ids::PoleId,
  pole::Pole,
  store::{DocumentStore, MemberDirectory},
};
use serde::Deserialize;

use crate::{caller::Caller, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct NameBody {
  pub name: String,
}

/// `GET /poles`
pub async fn list<D, M>(
  State(org): State<Arc<Organization<D, M>>>,
  Caller(_): Caller,
) -> Result<Json<Vec<Pole>>, ApiError>
where
  D: DocumentStore + 'static,
  M: MemberDirectory + 'static,
{
  Ok(Json(org.list_poles().await?))
}

/// `POST /poles`
pub async fn create<D, M>(
  State(org): State<Arc<Organization<D, M>>>,
  Caller(caller): Caller,
  Json(body): Json<NameBody>,
) -> Result<impl IntoResponse, ApiError>
where
  D: DocumentStore + 'static,
  M: MemberDirectory + 'static,
{
  let pole = org.add_pole(&caller, &body.name).await?;
  Ok((StatusCode::CREATED, Json(pole)))
}

/// `PATCH /poles/{id}`
pub async fn rename<D, M>(
  State(org): State<Arc<Organization<D, M>>>,
  Caller(caller): Caller,
  Path(id): Path<String>,
  Json(body): Json<NameBody>,
) -> Result<Json<Pole>, ApiError>
where
  D: DocumentStore + 'static,
  M: MemberDirectory + 'static,
{
  let pole = org.rename_pole(&caller, &PoleId::new(id), &body.name).await?;
  Ok(Json(pole))
}

/// `DELETE /poles/{id}`
pub async fn remove<D, M>(
  State(org): State<Arc<Organization<D, M>>>,
  Caller(caller): Caller,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
  D: DocumentStore + 'static,
  M: MemberDirectory + 'static,
{
  org.remove_pole(&caller, &PoleId::new(id)).await?;
  Ok(StatusCode::NO_CONTENT)
}
