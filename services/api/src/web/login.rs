//! services/api/src/web/login.rs
//!
//! Credential/OTP login endpoints. The session lock is released while the auth
//! service is being called; a reset that lands in the meantime wins.

use crate::web::{
    access::core_failure,
    protocol::{CompletedLoginResponse, CredentialsRequest, LoginResponse, OtpRequest},
    state::AppState,
};
use access_core::{Applied, LoginError};
use axum::{extract::State, http::StatusCode, response::Json};
use std::sync::Arc;
use tracing::info;

fn login_failure(e: &LoginError) -> (StatusCode, String) {
    let status = match e {
        LoginError::InvalidCredentials | LoginError::WrongCode => StatusCode::UNAUTHORIZED,
        LoginError::MalformedCode | LoginError::MissingCredentials => StatusCode::BAD_REQUEST,
        LoginError::Unreachable(_) => StatusCode::BAD_GATEWAY,
        LoginError::Busy | LoginError::WrongStep => StatusCode::CONFLICT,
    };
    (status, e.to_string())
}

fn dismissed() -> (StatusCode, String) {
    (
        StatusCode::CONFLICT,
        "Login was reset while the request was in flight".to_string(),
    )
}

/// Current login step.
#[utoipa::path(
    get,
    path = "/login",
    responses((status = 200, description = "Login state", body = LoginResponse))
)]
pub async fn get_login_handler(State(state): State<Arc<AppState>>) -> Json<LoginResponse> {
    let session = state.session.lock().await;
    Json(session.login().view().into())
}

/// Submits email and password. On success the flow moves to the OTP step.
#[utoipa::path(
    post,
    path = "/login/credentials",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Credentials accepted, awaiting code", body = LoginResponse),
        (status = 400, description = "Missing email or password"),
        (status = 401, description = "Credentials rejected"),
        (status = 409, description = "Wrong step, or a request is already in flight"),
        (status = 502, description = "Auth service unreachable")
    )
)]
pub async fn submit_credentials_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, String)> {
    let ticket = {
        let mut session = state.session.lock().await;
        session
            .login_mut()
            .begin_credentials(&req.email, &req.password)
            .map_err(|e| login_failure(&e))?
    };

    let result = state
        .auth
        .initiate_login(&ticket.email, &ticket.password)
        .await;

    let mut session = state.session.lock().await;
    match session.login_mut().finish_credentials(ticket, result) {
        Applied::Applied(Ok(())) => Ok(Json(session.login().view().into())),
        Applied::Applied(Err(e)) => Err(login_failure(&e)),
        Applied::Stale => Err(dismissed()),
    }
}

/// Submits the one-time code. On success the login is handed off: onboarding is
/// marked complete and the trial starts if it never has.
#[utoipa::path(
    post,
    path = "/login/otp",
    request_body = OtpRequest,
    responses(
        (status = 200, description = "Login completed", body = CompletedLoginResponse),
        (status = 400, description = "Code is not numeric"),
        (status = 401, description = "Wrong code"),
        (status = 409, description = "Wrong step, or a request is already in flight"),
        (status = 502, description = "Auth service unreachable")
    )
)]
pub async fn submit_otp_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OtpRequest>,
) -> Result<Json<CompletedLoginResponse>, (StatusCode, String)> {
    let ticket = {
        let mut session = state.session.lock().await;
        session
            .login_mut()
            .begin_otp(&req.code)
            .map_err(|e| login_failure(&e))?
    };

    let result = state.auth.verify_otp(&ticket.email, ticket.otp).await;

    let mut session = state.session.lock().await;
    let completed = match session.login_mut().finish_otp(ticket, result) {
        Applied::Applied(Ok(completed)) => completed,
        Applied::Applied(Err(e)) => return Err(login_failure(&e)),
        Applied::Stale => return Err(dismissed()),
    };

    let snapshot = session.establish(&completed).map_err(core_failure)?;
    info!("Session {} established for {}.", session.id(), completed.email);
    Ok(Json(CompletedLoginResponse::new(completed, snapshot)))
}

/// Abandons the login; any answer still in flight is ignored.
#[utoipa::path(
    post,
    path = "/login/reset",
    responses((status = 200, description = "Login reset", body = LoginResponse))
)]
pub async fn reset_login_handler(State(state): State<Arc<AppState>>) -> Json<LoginResponse> {
    let mut session = state.session.lock().await;
    session.login_mut().reset();
    Json(session.login().view().into())
}
