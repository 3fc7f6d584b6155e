//! JSON REST API for Mandat.
//!
//! Exposes an axum [`Router`] over one tenant's
//! [`mandat_core::Organization`]. Authentication and TLS are the caller's
//! responsibility; the authenticated subject id arrives in the
//! [`caller::SUBJECT_HEADER`] header.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", mandat_api::api_router(org.clone()))
//! ```

pub mod access;
pub mod caller;
pub mod error;
pub mod members;
pub mod permissions;
pub mod poles;
pub mod terms;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, patch, post, put},
};
use mandat_core::{
  Organization,
  store::{DocumentStore, MemberDirectory},
};

pub use error::ApiError;

/// Build a fully-materialised API router for `org`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<D, M>(org: Arc<Organization<D, M>>) -> Router<()>
where
  D: DocumentStore + 'static,
  M: MemberDirectory + 'static,
{
  Router::new()
    // Access
    .route("/access/{resource}/{action}", get(access::explain::<D, M>))
    // Permissions
    .route(
      "/permissions/{resource}/{action}",
      get(permissions::get_one::<D, M>).put(permissions::set_one::<D, M>),
    )
    .route("/permissions/{resource}", put(permissions::set_pair::<D, M>))
    // Poles
    .route("/poles", get(poles::list::<D, M>).post(poles::create::<D, M>))
    .route("/poles/{id}", patch(poles::rename::<D, M>).delete(poles::remove::<D, M>))
    // Members
    .route("/members", get(members::list::<D, M>))
    .route("/members/{id}/assignment", put(members::assign::<D, M>))
    .route("/members/{id}/admit", post(members::admit::<D, M>))
    .route("/members/{id}/remove", post(members::remove::<D, M>))
    // Terms
    .route("/terms", get(terms::browse::<D, M>))
    .with_state(org)
}
