//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use access_core::{AccessSession, AuthTransport, PaymentTransport};
use std::sync::Arc;
use tokio::sync::Mutex;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
///
/// The session lock is only ever held for synchronous state transitions, never
/// across a transport call.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Mutex<AccessSession>>,
    pub auth: Arc<dyn AuthTransport>,
    pub payments: Arc<dyn PaymentTransport>,
}

impl AppState {
    pub fn new(
        session: AccessSession,
        auth: Arc<dyn AuthTransport>,
        payments: Arc<dyn PaymentTransport>,
    ) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            auth,
            payments,
        }
    }
}
