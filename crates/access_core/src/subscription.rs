//! crates/access_core/src/subscription.rs
//!
//! The upgrade prompt and its payment sub-state.
//!
//! The prompt is visible when the user opened it or when access has lapsed, and
//! never on the onboarding route. Payment follows the same ticket/epoch scheme as
//! the login flow so that closing the prompt invalidates an in-flight charge.

use crate::domain::{Applied, EntitlementSnapshot, Plan, PromptView, Route};
use crate::entitlement::Entitlement;
use crate::error::SubscriptionError;
use crate::ports::{ChargeOutcome, PaymentTransport, PortResult};
use tracing::{info, warn};
use uuid::Uuid;

/// Issued by `begin_payment`.
#[derive(Debug)]
pub struct PaymentTicket {
    epoch: u64,
    pub plan: Plan,
    /// Sent with the charge. Stays the same across attempts whose outcome is unknown.
    pub idempotency_key: Uuid,
}

#[derive(Debug, Default)]
pub struct SubscriptionController {
    opened: bool,
    selected_plan: Plan,
    error: Option<SubscriptionError>,
    epoch: u64,
    // Epoch of the charge still awaiting an answer. Survives `close`.
    in_flight: Option<u64>,
    // Key of the last charge whose outcome is unknown, with the plan it was for.
    pending: Option<(Plan, Uuid)>,
}

impl SubscriptionController {
    pub fn new() -> Self {
        Self::default()
    }

    /// User-initiated open. No-op when already open.
    pub fn open(&mut self) {
        if !self.opened {
            info!("Subscription prompt opened.");
            self.opened = true;
        }
    }

    /// Dismisses the prompt and resets its transient state. A payment still in
    /// flight is orphaned: its late failure is dropped, and no new payment can
    /// start until it answers.
    ///
    /// A prompt forced by lapsed access stays visible after this call.
    pub fn close(&mut self) {
        if self.opened || self.is_processing() {
            info!("Subscription prompt closed.");
        }
        self.opened = false;
        self.selected_plan = Plan::default();
        self.error = None;
        self.epoch += 1;
    }

    pub fn select_plan(&mut self, plan: Plan) -> Result<(), SubscriptionError> {
        if self.is_processing() {
            return Err(SubscriptionError::Busy);
        }
        self.selected_plan = plan;
        Ok(())
    }

    pub fn selected_plan(&self) -> Plan {
        self.selected_plan
    }

    /// Whether this prompt is waiting on its own charge.
    pub fn is_processing(&self) -> bool {
        self.in_flight == Some(self.epoch)
    }

    /// Whether the prompt is forced on the user at `route`.
    pub fn is_forced(route: &Route, has_access: bool) -> bool {
        !has_access && *route != Route::Onboarding
    }

    pub fn is_visible(&self, route: &Route, has_access: bool) -> bool {
        *route != Route::Onboarding && (self.opened || !has_access)
    }

    pub fn view(&self, route: &Route, has_access: bool) -> PromptView {
        PromptView {
            visible: self.is_visible(route, has_access),
            forced: Self::is_forced(route, has_access),
            selected_plan: self.selected_plan,
            processing: self.is_processing(),
            error: self.error.as_ref().map(ToString::to_string),
        }
    }

    /// Starts a charge for the selected plan. Only a prompt visible at `route` can
    /// pay, and only one charge may be outstanding, orphaned or not.
    pub fn begin_payment(
        &mut self,
        route: &Route,
        has_access: bool,
    ) -> Result<PaymentTicket, SubscriptionError> {
        if self.in_flight.is_some() {
            return Err(SubscriptionError::Busy);
        }
        if !self.is_visible(route, has_access) {
            return Err(SubscriptionError::NotOpen);
        }

        let plan = self.selected_plan;
        let idempotency_key = match self.pending {
            Some((pending_plan, key)) if pending_plan == plan => key,
            _ => Uuid::new_v4(),
        };
        self.pending = Some((plan, idempotency_key));
        self.in_flight = Some(self.epoch);
        self.error = None;
        info!("Submitting payment for the {:?} plan.", plan);
        Ok(PaymentTicket {
            epoch: self.epoch,
            plan,
            idempotency_key,
        })
    }

    /// Applies a charge result. Success grants premium and hides the prompt; any
    /// failure returns the prompt to an interactive state with the error set.
    ///
    /// A success that arrives after the prompt was closed still grants premium,
    /// since the charge went through, and is reported as applied. It leaves the
    /// prompt alone. A late failure is `Stale`.
    pub fn finish_payment(
        &mut self,
        ticket: PaymentTicket,
        result: PortResult<ChargeOutcome>,
        entitlement: &mut Entitlement,
    ) -> Applied<Result<EntitlementSnapshot, SubscriptionError>> {
        if self.in_flight == Some(ticket.epoch) {
            self.in_flight = None;
        }
        let current = ticket.epoch == self.epoch;

        let outcome = match result {
            Ok(ChargeOutcome::Succeeded) => {
                self.pending = None;
                let snapshot = entitlement.grant_premium();
                if current {
                    self.close();
                } else {
                    info!("Late payment success for a dismissed prompt.");
                }
                Ok(snapshot)
            }
            Ok(ChargeOutcome::Declined { reason }) => {
                self.pending = None;
                if !current {
                    return Applied::Stale;
                }
                warn!("Payment declined: {}", reason);
                Err(self.fail(SubscriptionError::Declined(reason)))
            }
            Err(e) => {
                if !current {
                    return Applied::Stale;
                }
                warn!("Payment request failed: {}", e);
                Err(self.fail(SubscriptionError::Unreachable(e.to_string())))
            }
        };
        Applied::Applied(outcome)
    }

    /// Runs a payment end to end against `transport`.
    pub async fn submit_payment(
        &mut self,
        transport: &dyn PaymentTransport,
        route: &Route,
        entitlement: &mut Entitlement,
    ) -> Result<EntitlementSnapshot, SubscriptionError> {
        let ticket = self.begin_payment(route, entitlement.has_access())?;
        let result = transport.charge(ticket.plan, ticket.idempotency_key).await;
        match self.finish_payment(ticket, result, entitlement) {
            Applied::Applied(outcome) => outcome,
            Applied::Stale => Err(SubscriptionError::NotOpen),
        }
    }

    fn fail(&mut self, error: SubscriptionError) -> SubscriptionError {
        self.error = Some(error.clone());
        error
    }
}
