//! crates/access_core/src/error.rs
//!
//! Error types surfaced by the access core.

use crate::ports::PortError;

/// Wiring and storage failures. Flow-level problems use `LoginError` and
/// `SubscriptionError` instead.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A required collaborator was not supplied when building a session.
    #[error("Access session is missing its {0}")]
    MissingDependency(&'static str),

    /// A persisted write could not be completed.
    #[error("Flag store error: {0}")]
    Storage(#[from] PortError),
}

/// A convenience type alias for `Result<T, CoreError>`.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors surfaced by the credential/OTP flow. All of them keep the flow in its
/// current step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoginError {
    #[error("Incorrect email or password")]
    InvalidCredentials,

    #[error("Wrong verification code")]
    WrongCode,

    #[error("Verification code must be numeric")]
    MalformedCode,

    #[error("Email and password are required")]
    MissingCredentials,

    #[error("Could not reach the server: {0}")]
    Unreachable(String),

    #[error("A request is already in progress")]
    Busy,

    #[error("This step is not available right now")]
    WrongStep,
}

impl LoginError {
    /// True for network-level failures, false for answers the server gave.
    pub fn is_transport(&self) -> bool {
        matches!(self, LoginError::Unreachable(_))
    }
}

/// Errors surfaced by the subscription prompt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubscriptionError {
    #[error("Payment was declined: {0}")]
    Declined(String),

    #[error("Could not reach the payment service: {0}")]
    Unreachable(String),

    #[error("A payment is already being processed")]
    Busy,

    #[error("The subscription prompt is not open")]
    NotOpen,

    #[error("Onboarding must be completed before subscribing")]
    NotOnboarded,
}
