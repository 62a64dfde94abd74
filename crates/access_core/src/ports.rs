//! crates/access_core/src/ports.rs
//!
//! Defines the service contracts (traits) the access core depends on.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the persistence backend and of the network transports.

use crate::domain::{FlagKey, Plan};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (file system, network).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    /// The connection was never established, so the request cannot have been seen.
    #[error("Connection failed: {0}")]
    Connect(String),
    #[error("Transport failure: {0}")]
    Transport(String),
    #[error("Request timed out")]
    Timeout,
    #[error("Storage failure: {0}")]
    Storage(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    /// Network-level failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PortError::Connect(_) | PortError::Transport(_) | PortError::Timeout
        )
    }

    /// True only when the request certainly never reached the server. Non-idempotent
    /// calls may be retried on these and nothing else.
    pub fn is_undelivered(&self) -> bool {
        matches!(self, PortError::Connect(_))
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Transport Outcomes
//=========================================================================================

/// Well-formed answer to `initiate-login`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialCheck {
    Accepted,
    Rejected { status: String },
}

/// Well-formed answer to `verify-otp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtpCheck {
    Verified { display_name: Option<String> },
    Rejected { status: String },
}

/// Well-formed answer to a charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeOutcome {
    Succeeded,
    Declined { reason: String },
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Durable, synchronous key/value storage. A missing key is `Ok(None)`.
pub trait FlagStore: Send + Sync {
    fn get(&self, key: FlagKey) -> PortResult<Option<String>>;

    fn set(&self, key: FlagKey, value: &str) -> PortResult<()>;

    fn remove(&self, key: FlagKey) -> PortResult<()>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[async_trait]
pub trait AuthTransport: Send + Sync {
    /// Starts a login with email and password. A non-success status is a rejection.
    async fn initiate_login(&self, email: &str, password: &str) -> PortResult<CredentialCheck>;

    /// Verifies the one-time code sent after a successful credential check.
    async fn verify_otp(&self, email: &str, otp: u32) -> PortResult<OtpCheck>;
}

#[async_trait]
pub trait PaymentTransport: Send + Sync {
    /// Charges `plan`. Repeated calls with the same `idempotency_key` must capture
    /// at most once.
    async fn charge(&self, plan: Plan, idempotency_key: Uuid) -> PortResult<ChargeOutcome>;
}

//=========================================================================================
// Reference Implementations
//=========================================================================================

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Used to exercise day boundaries.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        if let Ok(mut now) = self.now.lock() {
            *now = to;
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Process-local flag storage. Does not survive restarts.
#[derive(Debug, Default)]
pub struct MemoryFlagStore {
    entries: Mutex<HashMap<FlagKey, String>>,
}

impl MemoryFlagStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FlagStore for MemoryFlagStore {
    fn get(&self, key: FlagKey) -> PortResult<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| PortError::Storage(e.to_string()))?;
        Ok(entries.get(&key).cloned())
    }

    fn set(&self, key: FlagKey, value: &str) -> PortResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| PortError::Storage(e.to_string()))?;
        entries.insert(key, value.to_string());
        Ok(())
    }

    fn remove(&self, key: FlagKey) -> PortResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| PortError::Storage(e.to_string()))?;
        entries.remove(&key);
        Ok(())
    }
}

//=========================================================================================
// Test Mocks
//=========================================================================================
