//! Adventure Path HTTP server.
//!
//! Exposes the progression service over a small JSON API and persists
//! sessions as JSON files.

pub mod file_store;
pub mod routes;

use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use adventure_game::{Manifest, ProgressService, SessionStore};

pub use file_store::FileSessionStore;
pub use routes::{ApiFailure, SharedService};

/// Build the API router over `store`.
pub fn app<S: SessionStore + 'static>(store: S, manifest: Manifest) -> Router {
    router(Arc::new(ProgressService::new(store, manifest)))
}

pub fn router<S: SessionStore + 'static>(service: SharedService<S>) -> Router {
    Router::new()
        .route("/api/manifest", get(routes::manifest::<S>))
        .route("/api/session/start", post(routes::start_session::<S>))
        .route("/api/session/update", post(routes::update_session::<S>))
        .route(
            "/api/admin/sessions",
            get(routes::list_sessions::<S>).delete(routes::clear_sessions::<S>),
        )
        .layer(CorsLayer::permissive())
        .with_state(service)
}
