//! services/api/src/web/access.rs
//!
//! Entitlement, onboarding and routing endpoints.

use crate::web::{
    protocol::{AccessQuery, AccessResponse, EntitlementResponse},
    state::AppState,
};
use access_core::CoreError;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use std::sync::Arc;
use tracing::error;

/// Maps a core storage failure onto an HTTP error.
pub(crate) fn core_failure(e: CoreError) -> (StatusCode, String) {
    error!("Access core failure: {:?}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Failed to update access state".to_string(),
    )
}

pub(crate) fn requested_path(query: &AccessQuery) -> &str {
    query.path.as_deref().unwrap_or("/")
}

/// Route decision, entitlement and prompt state for a navigation.
#[utoipa::path(
    get,
    path = "/access",
    params(AccessQuery),
    responses(
        (status = 200, description = "Current access state", body = AccessResponse)
    )
)]
pub async fn get_access_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AccessQuery>,
) -> Json<AccessResponse> {
    let session = state.session.lock().await;
    Json(session.status(requested_path(&query)).into())
}

/// Marks onboarding complete, starting the trial if it never started.
#[utoipa::path(
    post,
    path = "/onboarding/complete",
    responses(
        (status = 200, description = "Onboarding completed", body = EntitlementResponse),
        (status = 500, description = "Flag store failure")
    )
)]
pub async fn complete_onboarding_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<EntitlementResponse>, (StatusCode, String)> {
    let mut session = state.session.lock().await;
    let snapshot = session.complete_onboarding().map_err(core_failure)?;
    Ok(Json(snapshot.into()))
}

/// Signs out. The trial stamp is kept.
#[utoipa::path(
    post,
    path = "/session/signout",
    responses(
        (status = 204, description = "Signed out"),
        (status = 500, description = "Flag store failure")
    )
)]
pub async fn sign_out_handler(
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, (StatusCode, String)> {
    let mut session = state.session.lock().await;
    session.sign_out().map_err(core_failure)?;
    Ok(StatusCode::NO_CONTENT)
}
