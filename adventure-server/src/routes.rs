//! Request handlers for the JSON API.
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use adventure_game::{
    ClearResponse, ErrorBody, Manifest, ProgressService, ServiceError, Session, SessionStore,
    StartSessionRequest, UpdateRequest, UpdateResponse,
};

pub type SharedService<S> = Arc<ProgressService<S>>;

/// Error half of every handler.
#[derive(Debug)]
pub enum ApiFailure {
    NotFound,
    Internal(String),
}

impl From<ServiceError> for ApiFailure {
    fn from(err: ServiceError) -> Self {
        if err.is_not_found() {
            Self::NotFound
        } else {
            log::error!("request failed: {err}");
            Self::Internal(err.to_string())
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound => {
                (StatusCode::NOT_FOUND, Json(ErrorBody::session_not_found())).into_response()
            }
            Self::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody::new(message))).into_response()
            }
        }
    }
}

/// Run store work off the async workers.
async fn blocking<T, F>(work: F) -> Result<T, ApiFailure>
where
    F: FnOnce() -> Result<T, ServiceError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| ApiFailure::Internal(format!("storage task failed: {err}")))?
        .map_err(ApiFailure::from)
}

pub async fn manifest<S: SessionStore + 'static>(
    State(service): State<SharedService<S>>,
) -> Json<Manifest> {
    Json(service.manifest().clone())
}

pub async fn start_session<S: SessionStore + 'static>(
    State(service): State<SharedService<S>>,
    Json(request): Json<StartSessionRequest>,
) -> Result<Json<Session>, ApiFailure> {
    let session = blocking(move || service.start_session(request)).await?;
    Ok(Json(session))
}

pub async fn update_session<S: SessionStore + 'static>(
    State(service): State<SharedService<S>>,
    Json(request): Json<UpdateRequest>,
) -> Result<Json<UpdateResponse>, ApiFailure> {
    let (state, _) =
        blocking(move || service.apply_result(&request.session_id, &request.result)).await?;
    Ok(Json(UpdateResponse::ok(state)))
}

/// Lists every session; a store that cannot be read yields an empty list.
pub async fn list_sessions<S: SessionStore + 'static>(
    State(service): State<SharedService<S>>,
) -> Json<Vec<Session>> {
    match blocking(move || service.sessions()).await {
        Ok(sessions) => Json(sessions),
        Err(failure) => {
            log::error!("listing sessions failed: {failure:?}");
            Json(Vec::new())
        }
    }
}

pub async fn clear_sessions<S: SessionStore + 'static>(
    State(service): State<SharedService<S>>,
) -> Result<Json<ClearResponse>, ApiFailure> {
    let deleted = blocking(move || service.clear_sessions()).await?;
    Ok(Json(ClearResponse {
        success: true,
        deleted,
    }))
}
