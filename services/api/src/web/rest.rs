//! services/api/src/web/rest.rs
//!
//! Contains the master definition for the OpenAPI specification and the router
//! that wires every REST endpoint to its handler.

use crate::web::{
    access::{
        __path_complete_onboarding_handler, __path_get_access_handler, __path_sign_out_handler,
        complete_onboarding_handler, get_access_handler, sign_out_handler,
    },
    login::{
        __path_get_login_handler, __path_reset_login_handler, __path_submit_credentials_handler,
        __path_submit_otp_handler, get_login_handler, reset_login_handler,
        submit_credentials_handler, submit_otp_handler,
    },
    protocol::{
        AccessResponse, CompletedLoginResponse, CredentialsRequest, EntitlementResponse,
        LoginResponse, LoginStepDto, OtpRequest, PlanDto, PromptResponse, RouteResponse,
        SelectPlanRequest,
    },
    state::AppState,
    subscription::{
        __path_checkout_handler, __path_close_prompt_handler, __path_open_prompt_handler,
        __path_select_plan_handler, checkout_handler, close_prompt_handler, open_prompt_handler,
        select_plan_handler,
    },
};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        get_access_handler,
        complete_onboarding_handler,
        sign_out_handler,
        get_login_handler,
        submit_credentials_handler,
        submit_otp_handler,
        reset_login_handler,
        open_prompt_handler,
        close_prompt_handler,
        select_plan_handler,
        checkout_handler,
    ),
    components(
        schemas(
            AccessResponse,
            EntitlementResponse,
            RouteResponse,
            PromptResponse,
            PlanDto,
            SelectPlanRequest,
            CredentialsRequest,
            OtpRequest,
            LoginResponse,
            LoginStepDto,
            CompletedLoginResponse,
        )
    ),
    tags(
        (name = "Access API", description = "Entitlement, onboarding and login endpoints for the health-records client.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Router
//=========================================================================================

/// All API routes, without CORS or documentation layers.
pub fn api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/access", get(get_access_handler))
        .route("/onboarding/complete", post(complete_onboarding_handler))
        .route("/session/signout", post(sign_out_handler))
        .route("/login", get(get_login_handler))
        .route("/login/credentials", post(submit_credentials_handler))
        .route("/login/otp", post(submit_otp_handler))
        .route("/login/reset", post(reset_login_handler))
        .route("/subscription/open", post(open_prompt_handler))
        .route("/subscription/close", post(close_prompt_handler))
        .route("/subscription/plan", post(select_plan_handler))
        .route("/subscription/checkout", post(checkout_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use access_core::ports::ManualClock;
    use access_core::{
        AccessSession, AuthTransport, ChargeOutcome, CredentialCheck, MemoryFlagStore, OtpCheck,
        PaymentTransport, Plan, PortResult,
    };
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use chrono::{Duration, TimeZone, Utc};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tokio::sync::Notify;
    use tower::ServiceExt;
    use uuid::Uuid;

    struct FakeAuth;

    #[async_trait]
    impl AuthTransport for FakeAuth {
        async fn initiate_login(&self, _email: &str, password: &str) -> PortResult<CredentialCheck> {
            Ok(match password {
                "s3cret" => CredentialCheck::Accepted,
                _ => CredentialCheck::Rejected {
                    status: "invalid".into(),
                },
            })
        }

        async fn verify_otp(&self, _email: &str, otp: u32) -> PortResult<OtpCheck> {
            Ok(match otp {
                271828 => OtpCheck::Verified {
                    display_name: Some("Emmy".into()),
                },
                _ => OtpCheck::Rejected {
                    status: "invalid".into(),
                },
            })
        }
    }

    struct FakePayments;

    #[async_trait]
    impl PaymentTransport for FakePayments {
        async fn charge(&self, _plan: Plan, _key: Uuid) -> PortResult<ChargeOutcome> {
            Ok(ChargeOutcome::Succeeded)
        }
    }

    /// Holds every charge until released.
    struct GatedPayments {
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl PaymentTransport for GatedPayments {
        async fn charge(&self, _plan: Plan, _key: Uuid) -> PortResult<ChargeOutcome> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(ChargeOutcome::Succeeded)
        }
    }

    fn app() -> (Router, Arc<ManualClock>) {
        app_with(Arc::new(FakePayments))
    }

    fn app_with(payments: Arc<dyn PaymentTransport>) -> (Router, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 4, 2, 10, 0, 0).unwrap(),
        ));
        let session = AccessSession::builder()
            .flag_store(Arc::new(MemoryFlagStore::new()))
            .clock(clock.clone())
            .build()
            .unwrap();
        let state = AppState::new(session, Arc::new(FakeAuth), payments);
        (api_router(Arc::new(state)), clock)
    }

    async fn call(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(body) => Body::from(body.to_string()),
                None => Body::empty(),
            })
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn fresh_install_redirects_to_onboarding_without_prompt() {
        let (router, _clock) = app();

        let (status, body) = call(&router, "GET", "/access?path=/records", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["route"]["decision"], "redirect");
        assert_eq!(body["route"]["to"], "/onboarding");
        assert_eq!(body["entitlement"]["daysRemaining"], 0);

        let (_, body) = call(&router, "GET", "/access?path=/onboarding", None).await;
        assert_eq!(body["route"]["decision"], "render");
        assert_eq!(body["prompt"]["visible"], false);
    }

    #[tokio::test]
    async fn login_flow_hands_off_to_onboarding_and_trial() {
        let (router, _clock) = app();

        let (status, _) = call(
            &router,
            "POST",
            "/login/credentials",
            Some(json!({ "email": "emmy@example.com", "password": "nope" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = call(
            &router,
            "POST",
            "/login/credentials",
            Some(json!({ "email": "emmy@example.com", "password": "s3cret" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["step"], "awaiting_otp");

        let (status, _) = call(&router, "POST", "/login/otp", Some(json!({ "code": "000000" }))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (_, body) = call(&router, "GET", "/login", None).await;
        assert_eq!(body["step"], "awaiting_otp");
        assert_eq!(body["error"], "Wrong verification code");

        let (status, body) = call(&router, "POST", "/login/otp", Some(json!({ "code": "271828" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["displayName"], "Emmy");
        assert_eq!(body["entitlement"]["daysRemaining"], 21);

        let (_, body) = call(&router, "GET", "/access?path=/records", None).await;
        assert_eq!(body["route"]["decision"], "render");
        assert_eq!(body["onboarded"], true);
    }

    #[tokio::test]
    async fn expired_trial_forces_prompt_until_checkout() {
        let (router, clock) = app();
        let (status, _) = call(&router, "POST", "/onboarding/complete", None).await;
        assert_eq!(status, StatusCode::OK);
        clock.advance(Duration::days(25));

        let (_, body) = call(&router, "GET", "/access?path=/timeline", None).await;
        assert_eq!(body["route"]["decision"], "render");
        assert_eq!(body["prompt"]["visible"], true);
        assert_eq!(body["prompt"]["forced"], true);

        let (_, body) = call(&router, "POST", "/subscription/close?path=/timeline", None).await;
        assert_eq!(body["prompt"]["visible"], true);

        let (status, _) = call(
            &router,
            "POST",
            "/subscription/plan",
            Some(json!({ "plan": "annual" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&router, "POST", "/subscription/checkout?path=/timeline", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["entitlement"]["isPremium"], true);
        assert_eq!(body["entitlement"]["hasAccess"], true);
        assert_eq!(body["prompt"]["visible"], false);
    }

    #[tokio::test]
    async fn sign_out_sends_user_back_to_onboarding() {
        let (router, _clock) = app();
        call(&router, "POST", "/onboarding/complete", None).await;

        let (status, _) = call(&router, "POST", "/session/signout", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = call(&router, "GET", "/access?path=/chat", None).await;
        assert_eq!(body["route"]["decision"], "redirect");
        assert_eq!(body["entitlement"]["daysRemaining"], 21);
    }

    #[tokio::test]
    async fn checkout_without_open_prompt_conflicts() {
        let (router, _clock) = app();
        call(&router, "POST", "/onboarding/complete", None).await;

        let (status, _) = call(&router, "POST", "/subscription/checkout", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn checkout_is_refused_during_onboarding() {
        let (router, clock) = app();

        let (status, _) = call(&router, "POST", "/subscription/checkout?path=/onboarding", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let (_, body) = call(&router, "GET", "/access?path=/onboarding", None).await;
        assert_eq!(body["entitlement"]["isPremium"], false);

        call(&router, "POST", "/onboarding/complete", None).await;
        clock.advance(Duration::days(30));
        let (status, _) = call(&router, "POST", "/subscription/checkout?path=/onboarding", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let (_, body) = call(&router, "GET", "/access?path=/records", None).await;
        assert_eq!(body["entitlement"]["isPremium"], false);
    }

    #[tokio::test]
    async fn charge_landing_after_close_reports_the_upgrade() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let (router, clock) = app_with(Arc::new(GatedPayments {
            entered: entered.clone(),
            release: release.clone(),
        }));
        call(&router, "POST", "/onboarding/complete", None).await;
        clock.advance(Duration::days(25));

        let pending = {
            let router = router.clone();
            tokio::spawn(async move {
                call(&router, "POST", "/subscription/checkout?path=/timeline", None).await
            })
        };
        entered.notified().await;

        let (_, body) = call(&router, "POST", "/subscription/close?path=/timeline", None).await;
        assert_eq!(body["prompt"]["processing"], false);
        let (status, _) = call(&router, "POST", "/subscription/checkout?path=/timeline", None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        release.notify_one();
        let (status, body) = pending.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["entitlement"]["isPremium"], true);
        assert_eq!(body["prompt"]["visible"], false);
    }

    #[test]
    fn openapi_document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/access",
            "/onboarding/complete",
            "/session/signout",
            "/login",
            "/login/credentials",
            "/login/otp",
            "/login/reset",
            "/subscription/open",
            "/subscription/close",
            "/subscription/plan",
            "/subscription/checkout",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
