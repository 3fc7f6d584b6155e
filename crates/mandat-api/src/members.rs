//! Handlers for `/members` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/members` | Needs `read` on `members` |
//! | `PUT`  | `/members/{id}/assignment` | Body: `{"term":..,"poles":[..],"officer_role":..}` |
//! | `POST` | `/members/{id}/admit` | etudiant → member |
//! | `POST` | `/members/{id}/remove` | member → etudiant, assignment cleared |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use mandat_core::{
  Organization,
  assignment::Assignment,
  ids::{ResourceId, SubjectId},
  permission::Action,
  store::{DocumentStore, MemberDirectory},
  subject::Subject,
};

use crate::{caller::Caller, error::ApiError};

/// `GET /members`
pub async fn list<D, M>(
  State(org): State<Arc<Organization<D, M>>>,
  Caller(caller): Caller,
) -> Result<Json<Vec<Subject>>, ApiError>
where
  D: DocumentStore + 'static,
  M: MemberDirectory + 'static,
{
  org.require(&caller, &ResourceId::members(), Action::Read).await?;
  Ok(Json(org.members().await?))
}

/// `PUT /members/{id}/assignment`
pub async fn assign<D, M>(
  State(org): State<Arc<Organization<D, M>>>,
  Caller(caller): Caller,
  Path(id): Path<String>,
  Json(assignment): Json<Assignment>,
) -> Result<Json<Subject>, ApiError>
where
  D: DocumentStore + 'static,
  M: MemberDirectory + 'static,
{
  let subject = org
    .assign_term_role(&caller, &SubjectId::new(id), assignment)
    .await?;
  Ok(Json(subject))
}

/// `POST /members/{id}/admit`
pub async fn admit<D, M>(
  State(org): State<Arc<Organization<D, M>>>,
  Caller(caller): Caller,
  Path(id): Path<String>,
) -> Result<Json<Subject>, ApiError>
where
  D: DocumentStore + 'static,
  M: MemberDirectory + 'static,
{
  Ok(Json(org.admit(&caller, &SubjectId::new(id)).await?))
}

/// `POST /members/{id}/remove`
pub async fn remove<D, M>(
  State(org): State<Arc<Organization<D, M>>>,
  Caller(caller): Caller,
  Path(id): Path<String>,
) -> Result<Json<Subject>, ApiError>
where
  D: DocumentStore + 'static,
  M: MemberDirectory + 'static,
{
  let subject = org
    .remove_from_organization(&caller, &SubjectId::new(id))
    .await?;
  Ok(Json(subject))
}
