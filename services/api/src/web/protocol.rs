//! services/api/src/web/protocol.rs
//!
//! Defines the JSON message protocol between the presentation layer and the API
//! server. Core types are mirrored here so the core stays free of wire concerns.

use access_core::{
    AccessStatus, CompletedLogin, EntitlementSnapshot, LoginStep, LoginView, Plan, PromptView,
    RouteDecision,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

//=========================================================================================
// Requests FROM the Client
//=========================================================================================

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AccessQuery {
    /// The path about to be rendered. Defaults to the application root.
    pub path: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct OtpRequest {
    /// The code as typed, e.g. `"042137"`.
    pub code: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PlanDto {
    Monthly,
    Annual,
}

#[derive(Deserialize, ToSchema)]
pub struct SelectPlanRequest {
    pub plan: PlanDto,
}

//=========================================================================================
// Responses TO the Client
//=========================================================================================

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntitlementResponse {
    pub is_premium: bool,
    pub days_remaining: u32,
    pub has_access: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum RouteResponse {
    Render,
    Redirect { to: String },
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PromptResponse {
    pub visible: bool,
    pub forced: bool,
    pub selected_plan: PlanDto,
    pub processing: bool,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccessResponse {
    pub entitlement: EntitlementResponse,
    pub onboarded: bool,
    pub route: RouteResponse,
    pub prompt: PromptResponse,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LoginStepDto {
    AwaitingCredentials,
    AwaitingOtp,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub step: LoginStepDto,
    pub email: String,
    pub in_flight: bool,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompletedLoginResponse {
    pub email: String,
    pub display_name: String,
    pub entitlement: EntitlementResponse,
}

//=========================================================================================
// Conversions
//=========================================================================================

impl From<PlanDto> for Plan {
    fn from(plan: PlanDto) -> Self {
        match plan {
            PlanDto::Monthly => Plan::Monthly,
            PlanDto::Annual => Plan::Annual,
        }
    }
}

impl From<Plan> for PlanDto {
    fn from(plan: Plan) -> Self {
        match plan {
            Plan::Monthly => PlanDto::Monthly,
            Plan::Annual => PlanDto::Annual,
        }
    }
}

impl From<EntitlementSnapshot> for EntitlementResponse {
    fn from(snapshot: EntitlementSnapshot) -> Self {
        Self {
            is_premium: snapshot.is_premium,
            days_remaining: snapshot.days_remaining,
            has_access: snapshot.has_access,
        }
    }
}

impl From<RouteDecision> for RouteResponse {
    fn from(decision: RouteDecision) -> Self {
        match decision {
            RouteDecision::Render => RouteResponse::Render,
            RouteDecision::Redirect { to } => RouteResponse::Redirect { to },
        }
    }
}

impl From<PromptView> for PromptResponse {
    fn from(view: PromptView) -> Self {
        Self {
            visible: view.visible,
            forced: view.forced,
            selected_plan: view.selected_plan.into(),
            processing: view.processing,
            error: view.error,
        }
    }
}

impl From<AccessStatus> for AccessResponse {
    fn from(status: AccessStatus) -> Self {
        Self {
            entitlement: status.entitlement.into(),
            onboarded: status.onboarded,
            route: status.route.into(),
            prompt: status.prompt.into(),
        }
    }
}

impl From<LoginView> for LoginResponse {
    fn from(view: LoginView) -> Self {
        Self {
            step: match view.step {
                LoginStep::AwaitingCredentials => LoginStepDto::AwaitingCredentials,
                LoginStep::AwaitingOtp => LoginStepDto::AwaitingOtp,
            },
            email: view.email,
            in_flight: view.in_flight,
            error: view.error,
        }
    }
}

impl CompletedLoginResponse {
    pub fn new(login: CompletedLogin, snapshot: EntitlementSnapshot) -> Self {
        Self {
            email: login.email,
            display_name: login.display_name,
            entitlement: snapshot.into(),
        }
    }
}
