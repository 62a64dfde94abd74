pub mod domain;
pub mod entitlement;
pub mod error;
pub mod login;
pub mod ports;
pub mod route_gate;
pub mod session;
pub mod subscription;
pub mod trial;

pub use domain::{
    AccessStatus, Applied, CompletedLogin, EntitlementSnapshot, FlagKey, LoginStep, LoginView,
    Plan, PromptView, Route, RouteDecision, TrialWindow, TRIAL_LENGTH_DAYS,
};
pub use entitlement::Entitlement;
pub use error::{CoreError, CoreResult, LoginError, SubscriptionError};
pub use login::LoginFlow;
pub use ports::{
    AuthTransport, ChargeOutcome, Clock, CredentialCheck, FlagStore, MemoryFlagStore, OtpCheck,
    PaymentTransport, PortError, PortResult, SystemClock,
};
pub use session::{AccessSession, AccessSessionBuilder};
pub use subscription::SubscriptionController;
