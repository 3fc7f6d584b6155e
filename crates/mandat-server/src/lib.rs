//! HTTP server for Mandat.
//!
//! Wires one tenant's [`Organization`] over a [`SqliteStore`] into the
//! [`mandat_api`] router, mounted under `/api`.

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::Router;
use mandat_core::{
  Organization, Settings,
  ids::TenantId,
  role::Status,
  subject::Subject,
};
use mandat_store_sqlite::SqliteStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

pub type SqliteOrganization = Organization<SqliteStore, SqliteStore>;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `MANDAT_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                 String,
  #[serde(default = "default_port")]
  pub port:                 u16,
  pub store_path:           PathBuf,
  pub tenant:               String,
  #[serde(default = "default_store_timeout_ms")]
  pub store_timeout_ms:     u64,
  /// Subject enrolled as superadmin at startup if not yet known.
  #[serde(default)]
  pub bootstrap_superadmin: Option<String>,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_store_timeout_ms() -> u64 { 5000 }

impl ServerConfig {
  pub fn settings(&self) -> Settings {
    Settings {
      store_timeout: Duration::from_millis(self.store_timeout_ms),
      ..Settings::default()
    }
  }
}

// ─── Wiring ───────────────────────────────────────────────────────────────────

/// Build the tenant's engine over `store` and run the superadmin bootstrap.
pub async fn organization(
  config: &ServerConfig,
  store: SqliteStore,
) -> mandat_core::Result<Arc<SqliteOrganization>> {
  let store = Arc::new(store);
  let org = Organization::new(
    TenantId::new(config.tenant.as_str()),
    Arc::clone(&store),
    store,
    config.settings(),
  );

  if let Some(id) = &config.bootstrap_superadmin
    && org.enroll(Subject::new(id.as_str(), Status::Superadmin)).await?
  {
    tracing::info!(tenant = %config.tenant, subject = %id, "bootstrap superadmin enrolled");
  }
  Ok(Arc::new(org))
}

/// Build the axum [`Router`] for the server.
pub fn router(org: Arc<SqliteOrganization>) -> Router {
  Router::new()
    .nest("/api", mandat_api::api_router(org))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use tower::ServiceExt as _;

  fn config() -> ServerConfig {
    ServerConfig {
      host:                 "127.0.0.1".to_string(),
      port:                 0,
      store_path:           PathBuf::from(":memory:"),
      tenant:               "acme".to_string(),
      store_timeout_ms:     1000,
      bootstrap_superadmin: Some("root".to_string()),
    }
  }

  async fn make_org() -> Arc<SqliteOrganization> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    organization(&config(), store).await.unwrap()
  }

  #[tokio::test]
  async fn bootstrap_superadmin_is_enrolled_once() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let org = organization(&config(), store.clone()).await.unwrap();
    let root = org.member(&"root".into()).await.unwrap();
    assert_eq!(root.status, Status::Superadmin);

    // A second start over the same store leaves the subject alone.
    let again = organization(&config(), store).await.unwrap();
    assert_eq!(again.members().await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn api_is_mounted_under_prefix() {
    let app = router(make_org().await);
    let req = Request::builder()
      .uri("/api/poles")
      .header("x-subject-id", "root")
      .body(Body::empty())
      .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let poles: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(poles, serde_json::json!([]));
  }

  #[tokio::test]
  async fn unmounted_path_is_404() {
    let app = router(make_org().await);
    let req = Request::builder().uri("/poles").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

  #[test]
  fn timeout_flows_into_settings() {
    assert_eq!(config().settings().store_timeout, Duration::from_secs(1));
  }
}
