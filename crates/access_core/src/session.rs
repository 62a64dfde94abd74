//! crates/access_core/src/session.rs
//!
//! The per-session composition root. One `AccessSession` owns the entitlement
//! machine, the subscription prompt and the login flow, and is handed explicitly
//! to whoever needs them.

use crate::domain::{
    AccessStatus, Applied, CompletedLogin, EntitlementSnapshot, Route, RouteDecision,
    TRIAL_LENGTH_DAYS,
};
use crate::entitlement::Entitlement;
use crate::error::{CoreError, CoreResult, SubscriptionError};
use crate::login::LoginFlow;
use crate::ports::{ChargeOutcome, Clock, FlagStore, PaymentTransport, PortResult, SystemClock};
use crate::route_gate;
use crate::subscription::{PaymentTicket, SubscriptionController};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Builds an `AccessSession`, refusing to produce one with missing collaborators.
pub struct AccessSessionBuilder {
    store: Option<Arc<dyn FlagStore>>,
    clock: Arc<dyn Clock>,
    trial_length_days: u32,
}

impl Default for AccessSessionBuilder {
    fn default() -> Self {
        Self {
            store: None,
            clock: Arc::new(SystemClock),
            trial_length_days: TRIAL_LENGTH_DAYS,
        }
    }
}

impl AccessSessionBuilder {
    pub fn flag_store(mut self, store: Arc<dyn FlagStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn trial_length_days(mut self, days: u32) -> Self {
        self.trial_length_days = days;
        self
    }

    /// Builds and initializes the session.
    pub fn build(self) -> CoreResult<AccessSession> {
        let store = self.store.ok_or(CoreError::MissingDependency("flag store"))?;
        let mut entitlement = Entitlement::new(store, self.clock, self.trial_length_days);
        let snapshot = entitlement.initialize()?;

        let id = Uuid::new_v4();
        info!(
            "Access session {} started (premium: {}, days remaining: {}).",
            id, snapshot.is_premium, snapshot.days_remaining
        );
        Ok(AccessSession {
            id,
            entitlement,
            subscription: SubscriptionController::new(),
            login: LoginFlow::new(),
        })
    }
}

pub struct AccessSession {
    id: Uuid,
    entitlement: Entitlement,
    subscription: SubscriptionController,
    login: LoginFlow,
}

impl AccessSession {
    pub fn builder() -> AccessSessionBuilder {
        AccessSessionBuilder::default()
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn entitlement(&self) -> &Entitlement {
        &self.entitlement
    }

    pub fn subscription(&self) -> &SubscriptionController {
        &self.subscription
    }

    pub fn subscription_mut(&mut self) -> &mut SubscriptionController {
        &mut self.subscription
    }

    pub fn login(&self) -> &LoginFlow {
        &self.login
    }

    pub fn login_mut(&mut self) -> &mut LoginFlow {
        &mut self.login
    }

    pub fn snapshot(&self) -> EntitlementSnapshot {
        self.entitlement.snapshot()
    }

    pub fn gate(&self, path: &str) -> RouteDecision {
        route_gate::evaluate(&Route::from_path(path), self.entitlement.is_onboarded())
    }

    /// Gate decision, entitlement and prompt state for a navigation to `path`.
    pub fn status(&self, path: &str) -> AccessStatus {
        let route = Route::from_path(path);
        let onboarded = self.entitlement.is_onboarded();
        let entitlement = self.entitlement.snapshot();
        AccessStatus {
            entitlement,
            onboarded,
            route: route_gate::evaluate(&route, onboarded),
            prompt: self.subscription.view(&route, entitlement.has_access),
        }
    }

    pub fn complete_onboarding(&mut self) -> CoreResult<EntitlementSnapshot> {
        self.entitlement.complete_onboarding()
    }

    /// Turns a finished login into session state: onboarding is marked complete and
    /// the trial starts if it never has.
    pub fn establish(&mut self, login: &CompletedLogin) -> CoreResult<EntitlementSnapshot> {
        info!("Establishing session for {}.", login.email);
        self.entitlement.complete_onboarding()
    }

    /// Grants premium from a trusted external trigger and dismisses the prompt.
    pub fn grant_premium(&mut self) -> EntitlementSnapshot {
        let snapshot = self.entitlement.grant_premium();
        self.subscription.close();
        snapshot
    }

    pub fn sign_out(&mut self) -> CoreResult<()> {
        self.entitlement.sign_out()?;
        self.login.reset();
        self.subscription.close();
        Ok(())
    }

    /// Starts a checkout from the prompt shown at `path`. Refused before onboarding
    /// completes, since there is no account to attach the subscription to.
    pub fn begin_payment(&mut self, path: &str) -> Result<PaymentTicket, SubscriptionError> {
        if !self.entitlement.is_onboarded() {
            return Err(SubscriptionError::NotOnboarded);
        }
        let has_access = self.entitlement.has_access();
        self.subscription
            .begin_payment(&Route::from_path(path), has_access)
    }

    pub fn finish_payment(
        &mut self,
        ticket: PaymentTicket,
        result: PortResult<ChargeOutcome>,
    ) -> Applied<Result<EntitlementSnapshot, SubscriptionError>> {
        self.subscription
            .finish_payment(ticket, result, &mut self.entitlement)
    }

    pub async fn submit_payment(
        &mut self,
        transport: &dyn PaymentTransport,
        path: &str,
    ) -> Result<EntitlementSnapshot, SubscriptionError> {
        let ticket = self.begin_payment(path)?;
        let result = transport.charge(ticket.plan, ticket.idempotency_key).await;
        match self.finish_payment(ticket, result) {
            Applied::Applied(outcome) => outcome,
            Applied::Stale => Err(SubscriptionError::NotOpen),
        }
    }
}
