//! Handler for `/terms`: the roster grouped by term, with a cursor.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/terms` | Cursor on the latest term |
//! | `GET`  | `/terms?term=2022-2023` | Cursor on the given term; `no term` selects the unassigned bucket |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
};
use mandat_core::{
  Organization,
  ids::ResourceId,
  permission::Action,
  store::{DocumentStore, MemberDirectory},
  subject::Term,
  term::{NO_TERM, TermBucket, TermNavigator},
};
use serde::{Deserialize, Serialize};

use crate::{caller::Caller, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct TermParams {
  pub term: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TermsView {
  pub buckets:  Vec<TermBucket>,
  pub current:  Option<String>,
  pub previous: Option<String>,
  pub next:     Option<String>,
}

impl From<TermNavigator> for TermsView {
  fn from(nav: TermNavigator) -> Self {
    let index = nav.current_index();
    let label = |i: usize| nav.buckets().get(i).map(|b| b.label().to_owned());
    let current = label(index);
    let previous = if nav.has_previous() { label(index - 1) } else { None };
    let next = if nav.has_next() { label(index + 1) } else { None };
    Self { buckets: nav.buckets().to_vec(), current, previous, next }
  }
}

/// `GET /terms[?term=<label>]`
pub async fn browse<D, M>(
  State(org): State<Arc<Organization<D, M>>>,
  Caller(caller): Caller,
  Query(params): Query<TermParams>,
) -> Result<Json<TermsView>, ApiError>
where
  D: DocumentStore + 'static,
  M: MemberDirectory + 'static,
{
  org.require(&caller, &ResourceId::members(), Action::Read).await?;
  let mut nav = org.terms().await?;

  if let Some(label) = params.term {
    let term = if label == NO_TERM { None } else { Term::new(&label) };
    if !nav.select(term.as_ref()) {
      return Err(ApiError::NotFound(format!("no members in term {label:?}")));
    }
  }
  Ok(Json(nav.into()))
}
