//! crates/access_core/src/domain.rs
//!
//! Defines the pure, core data structures for the access and entitlement core.
//! These structs are independent of any storage backend or transport format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Length of the free trial, counted from the moment onboarding completes.
pub const TRIAL_LENGTH_DAYS: u32 = 21;

/// The two persisted entries the core reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagKey {
    /// Boolean, stored as `"true"` / `"false"`.
    Onboarded,
    /// ISO-8601 timestamp of the first onboarding completion.
    TrialStart,
}

impl FlagKey {
    /// The string key used by persistent stores.
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagKey::Onboarded => "onboarded",
            FlagKey::TrialStart => "trialStart",
        }
    }
}

/// The anchor of a trial. Written once, never moved while it exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialWindow {
    pub started_at: DateTime<Utc>,
}

/// Derived view of the user's entitlement. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitlementSnapshot {
    pub is_premium: bool,
    pub days_remaining: u32,
    pub has_access: bool,
}

impl EntitlementSnapshot {
    pub fn new(is_premium: bool, days_remaining: u32) -> Self {
        Self {
            is_premium,
            days_remaining,
            has_access: is_premium || days_remaining > 0,
        }
    }
}

// Billing plans offered by the upgrade prompt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    #[default]
    Monthly,
    Annual,
}

/// What the presentation layer needs to render the upgrade prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptView {
    pub visible: bool,
    pub forced: bool,
    pub selected_plan: Plan,
    pub processing: bool,
    pub error: Option<String>,
}

/// The two steps of the credential/OTP login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStep {
    AwaitingCredentials,
    AwaitingOtp,
}

/// Read-only view of an in-progress login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginView {
    pub step: LoginStep,
    pub email: String,
    pub in_flight: bool,
    pub error: Option<String>,
}

/// Terminal value of a successful login, handed to the caller for session setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedLogin {
    pub email: String,
    pub display_name: String,
}

/// Routes the gate knows how to classify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// The onboarding entry point. Always reachable.
    Onboarding,
    /// Anything under the main application tree.
    App(String),
}

/// Outcome of evaluating the route gate for a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Render,
    Redirect { to: String },
}

/// Everything the presentation layer needs to render one navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessStatus {
    pub entitlement: EntitlementSnapshot,
    pub onboarded: bool,
    pub route: RouteDecision,
    pub prompt: PromptView,
}

/// Whether a late asynchronous result was applied to the flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied<T> {
    Applied(T),
    /// The flow was reset or dismissed after the request was issued.
    Stale,
}
