//! crates/access_core/src/login.rs
//!
//! The two-step credential/OTP login flow.
//!
//! Each network step is split into `begin_*` and `finish_*` so a host that keeps the
//! flow behind a lock can release it while the transport call is in flight. Every
//! `begin_*` hands out a ticket stamped with the flow's epoch; `reset` bumps the
//! epoch, so an answer that arrives after the flow was dismissed is ignored.
//!
//! The flow only authenticates. Turning a `CompletedLogin` into onboarding or trial
//! state is the caller's job.

use crate::domain::{Applied, CompletedLogin, LoginStep, LoginView};
use crate::error::LoginError;
use crate::ports::{AuthTransport, CredentialCheck, OtpCheck, PortResult};
use tracing::{info, warn};

/// Issued by `begin_credentials`; carries what the transport call needs.
#[derive(Debug)]
pub struct CredentialTicket {
    epoch: u64,
    pub email: String,
    pub password: String,
}

/// Issued by `begin_otp`.
#[derive(Debug)]
pub struct OtpTicket {
    epoch: u64,
    pub email: String,
    pub otp: u32,
}

#[derive(Debug)]
pub struct LoginFlow {
    step: LoginStep,
    email: String,
    error: Option<LoginError>,
    in_flight: Option<u64>,
    epoch: u64,
}

impl Default for LoginFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl LoginFlow {
    pub fn new() -> Self {
        Self {
            step: LoginStep::AwaitingCredentials,
            email: String::new(),
            error: None,
            in_flight: None,
            epoch: 0,
        }
    }

    pub fn step(&self) -> LoginStep {
        self.step
    }

    pub fn error(&self) -> Option<&LoginError> {
        self.error.as_ref()
    }

    pub fn view(&self) -> LoginView {
        LoginView {
            step: self.step,
            email: self.email.clone(),
            in_flight: self.in_flight.is_some(),
            error: self.error.as_ref().map(ToString::to_string),
        }
    }

    /// Returns to the credential step and invalidates any request still in flight.
    pub fn reset(&mut self) {
        self.step = LoginStep::AwaitingCredentials;
        self.email.clear();
        self.error = None;
        self.in_flight = None;
        self.epoch += 1;
    }

    pub fn begin_credentials(
        &mut self,
        email: &str,
        password: &str,
    ) -> Result<CredentialTicket, LoginError> {
        self.ensure_ready(LoginStep::AwaitingCredentials)?;

        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(self.fail(LoginError::MissingCredentials));
        }

        self.email = email.to_string();
        self.error = None;
        self.in_flight = Some(self.epoch);
        Ok(CredentialTicket {
            epoch: self.epoch,
            email: self.email.clone(),
            password: password.to_string(),
        })
    }

    pub fn finish_credentials(
        &mut self,
        ticket: CredentialTicket,
        result: PortResult<CredentialCheck>,
    ) -> Applied<Result<(), LoginError>> {
        if !self.accepts(ticket.epoch) {
            info!("Dropping credential response for a dismissed login.");
            return Applied::Stale;
        }
        self.in_flight = None;

        let outcome = match result {
            Ok(CredentialCheck::Accepted) => {
                info!("Credentials accepted, awaiting one-time code.");
                self.step = LoginStep::AwaitingOtp;
                self.error = None;
                Ok(())
            }
            Ok(CredentialCheck::Rejected { status }) => {
                warn!("Credentials rejected with status {:?}.", status);
                Err(self.fail(LoginError::InvalidCredentials))
            }
            Err(e) => {
                warn!("Credential request failed: {}", e);
                Err(self.fail(LoginError::Unreachable(e.to_string())))
            }
        };
        Applied::Applied(outcome)
    }

    pub fn begin_otp(&mut self, code: &str) -> Result<OtpTicket, LoginError> {
        self.ensure_ready(LoginStep::AwaitingOtp)?;

        let code = code.trim();
        let otp = if !code.is_empty() && code.chars().all(|c| c.is_ascii_digit()) {
            code.parse::<u32>().ok()
        } else {
            None
        };
        let Some(otp) = otp else {
            return Err(self.fail(LoginError::MalformedCode));
        };

        self.error = None;
        self.in_flight = Some(self.epoch);
        Ok(OtpTicket {
            epoch: self.epoch,
            email: self.email.clone(),
            otp,
        })
    }

    /// On success the flow terminates: it is reset and the login is handed back.
    pub fn finish_otp(
        &mut self,
        ticket: OtpTicket,
        result: PortResult<OtpCheck>,
    ) -> Applied<Result<CompletedLogin, LoginError>> {
        if !self.accepts(ticket.epoch) {
            info!("Dropping verification response for a dismissed login.");
            return Applied::Stale;
        }
        self.in_flight = None;

        let outcome = match result {
            Ok(OtpCheck::Verified { display_name }) => {
                let display_name = display_name
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| display_name_from_email(&ticket.email));
                let completed = CompletedLogin {
                    email: ticket.email,
                    display_name,
                };
                info!("Login completed for {}.", completed.email);
                self.reset();
                Ok(completed)
            }
            Ok(OtpCheck::Rejected { status }) => {
                warn!("One-time code rejected with status {:?}.", status);
                Err(self.fail(LoginError::WrongCode))
            }
            Err(e) => {
                warn!("Verification request failed: {}", e);
                Err(self.fail(LoginError::Unreachable(e.to_string())))
            }
        };
        Applied::Applied(outcome)
    }

    /// Runs the credential step end to end against `transport`.
    pub async fn submit_credentials(
        &mut self,
        transport: &dyn AuthTransport,
        email: &str,
        password: &str,
    ) -> Result<(), LoginError> {
        let ticket = self.begin_credentials(email, password)?;
        let result = transport
            .initiate_login(&ticket.email, &ticket.password)
            .await;
        match self.finish_credentials(ticket, result) {
            Applied::Applied(outcome) => outcome,
            Applied::Stale => Err(LoginError::WrongStep),
        }
    }

    /// Runs the OTP step end to end against `transport`.
    pub async fn submit_otp(
        &mut self,
        transport: &dyn AuthTransport,
        code: &str,
    ) -> Result<CompletedLogin, LoginError> {
        let ticket = self.begin_otp(code)?;
        let result = transport.verify_otp(&ticket.email, ticket.otp).await;
        match self.finish_otp(ticket, result) {
            Applied::Applied(outcome) => outcome,
            Applied::Stale => Err(LoginError::WrongStep),
        }
    }

    // Wrong-step and busy refusals are not recorded as the flow's error: the flow
    // itself is fine, the caller asked at the wrong moment.
    fn ensure_ready(&self, expected: LoginStep) -> Result<(), LoginError> {
        if self.in_flight.is_some() {
            return Err(LoginError::Busy);
        }
        if self.step != expected {
            return Err(LoginError::WrongStep);
        }
        Ok(())
    }

    fn accepts(&self, epoch: u64) -> bool {
        epoch == self.epoch && self.in_flight == Some(epoch)
    }

    fn fail(&mut self, error: LoginError) -> LoginError {
        self.error = Some(error.clone());
        error
    }
}

fn display_name_from_email(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}
