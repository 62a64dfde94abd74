//! services/api/src/web/subscription.rs
//!
//! Upgrade prompt endpoints. Every handler answers with the full access state for
//! the requested path so the client can re-render in one round trip.

use crate::web::{
    access::requested_path,
    protocol::{AccessQuery, AccessResponse, SelectPlanRequest},
    state::AppState,
};
use access_core::{Applied, SubscriptionError};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use std::sync::Arc;
use tracing::{error, info};

fn subscription_failure(e: &SubscriptionError) -> (StatusCode, String) {
    let status = match e {
        SubscriptionError::Declined(_) => StatusCode::PAYMENT_REQUIRED,
        SubscriptionError::Unreachable(_) => StatusCode::BAD_GATEWAY,
        SubscriptionError::Busy
        | SubscriptionError::NotOpen
        | SubscriptionError::NotOnboarded => StatusCode::CONFLICT,
    };
    (status, e.to_string())
}

#[utoipa::path(
    post,
    path = "/subscription/open",
    params(AccessQuery),
    responses((status = 200, description = "Prompt opened", body = AccessResponse))
)]
pub async fn open_prompt_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AccessQuery>,
) -> Json<AccessResponse> {
    let mut session = state.session.lock().await;
    session.subscription_mut().open();
    Json(session.status(requested_path(&query)).into())
}

/// Dismisses the prompt. A prompt forced by lapsed access stays visible.
#[utoipa::path(
    post,
    path = "/subscription/close",
    params(AccessQuery),
    responses((status = 200, description = "Prompt closed", body = AccessResponse))
)]
pub async fn close_prompt_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AccessQuery>,
) -> Json<AccessResponse> {
    let mut session = state.session.lock().await;
    session.subscription_mut().close();
    Json(session.status(requested_path(&query)).into())
}

#[utoipa::path(
    post,
    path = "/subscription/plan",
    params(AccessQuery),
    request_body = SelectPlanRequest,
    responses(
        (status = 200, description = "Plan selected", body = AccessResponse),
        (status = 409, description = "A payment is being processed")
    )
)]
pub async fn select_plan_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AccessQuery>,
    Json(req): Json<SelectPlanRequest>,
) -> Result<Json<AccessResponse>, (StatusCode, String)> {
    let mut session = state.session.lock().await;
    session
        .subscription_mut()
        .select_plan(req.plan.into())
        .map_err(|e| subscription_failure(&e))?;
    Ok(Json(session.status(requested_path(&query)).into()))
}

/// Charges the selected plan and, on success, grants premium.
///
/// A charge that succeeds after the prompt was closed still upgrades the user and
/// is answered with 200.
#[utoipa::path(
    post,
    path = "/subscription/checkout",
    params(AccessQuery),
    responses(
        (status = 200, description = "Premium granted", body = AccessResponse),
        (status = 402, description = "Payment declined"),
        (status = 409, description = "Prompt not shown, a charge is still outstanding, onboarding incomplete, or the prompt was dismissed before a failure came back"),
        (status = 502, description = "Payment service unreachable")
    )
)]
pub async fn checkout_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AccessQuery>,
) -> Result<Json<AccessResponse>, (StatusCode, String)> {
    let path = requested_path(&query).to_string();
    let ticket = {
        let mut session = state.session.lock().await;
        session
            .begin_payment(&path)
            .map_err(|e| subscription_failure(&e))?
    };

    // Detached so the ticket is always settled, even if the client goes away.
    let task_state = state.clone();
    let applied = tokio::spawn(async move {
        let result = task_state
            .payments
            .charge(ticket.plan, ticket.idempotency_key)
            .await;
        let mut session = task_state.session.lock().await;
        session.finish_payment(ticket, result)
    })
    .await
    .map_err(|e| {
        error!("Checkout task failed: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Checkout did not complete".to_string(),
        )
    })?;

    let session = state.session.lock().await;
    match applied {
        Applied::Applied(Ok(snapshot)) => {
            info!(
                "Session {} upgraded to premium (days remaining: {}).",
                session.id(),
                snapshot.days_remaining
            );
            Ok(Json(session.status(&path).into()))
        }
        Applied::Applied(Err(e)) => Err(subscription_failure(&e)),
        Applied::Stale => Err((
            StatusCode::CONFLICT,
            "The subscription prompt was closed before the payment failed".to_string(),
        )),
    }
}
