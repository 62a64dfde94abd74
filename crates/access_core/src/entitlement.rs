//! crates/access_core/src/entitlement.rs
//!
//! The entitlement state machine. Access is a continuous function of the premium
//! flag and the trial clock, re-derived from the clock on every read.

use crate::domain::{EntitlementSnapshot, FlagKey, TrialWindow};
use crate::error::CoreResult;
use crate::ports::{Clock, FlagStore};
use crate::trial;
use std::sync::Arc;
use tracing::{info, warn};

pub struct Entitlement {
    store: Arc<dyn FlagStore>,
    clock: Arc<dyn Clock>,
    trial_length_days: u32,
    is_premium: bool,
}

impl Entitlement {
    pub fn new(store: Arc<dyn FlagStore>, clock: Arc<dyn Clock>, trial_length_days: u32) -> Self {
        Self {
            store,
            clock,
            trial_length_days,
            is_premium: false,
        }
    }

    /// Runs once when a session activates.
    ///
    /// A user who finished onboarding but has no readable trial stamp gets one
    /// stamped now. An existing stamp is never touched.
    pub fn initialize(&mut self) -> CoreResult<EntitlementSnapshot> {
        if self.is_onboarded() && self.trial_window().is_none() {
            info!("Onboarded session without a trial window, stamping one now.");
            self.stamp_trial()?;
        }
        Ok(self.snapshot())
    }

    /// Marks onboarding complete and starts the trial if none exists yet.
    pub fn complete_onboarding(&mut self) -> CoreResult<EntitlementSnapshot> {
        if self.trial_window().is_none() {
            self.stamp_trial()?;
        }
        self.store.set(FlagKey::Onboarded, "true")?;
        info!("Onboarding marked complete.");
        Ok(self.snapshot())
    }

    /// Grants premium. Idempotent, and leaves the trial window alone.
    pub fn grant_premium(&mut self) -> EntitlementSnapshot {
        if !self.is_premium {
            info!("Premium granted.");
        }
        self.is_premium = true;
        self.snapshot()
    }

    /// Clears the onboarding flag only. The trial stamp and premium flag stay,
    /// so signing out and back in does not restart the trial.
    pub fn sign_out(&mut self) -> CoreResult<()> {
        self.store.remove(FlagKey::Onboarded)?;
        info!("Signed out, onboarding flag cleared.");
        Ok(())
    }

    pub fn is_premium(&self) -> bool {
        self.is_premium
    }

    pub fn is_onboarded(&self) -> bool {
        match self.read(FlagKey::Onboarded).as_deref() {
            None => false,
            Some("true") => true,
            Some("false") => false,
            Some(other) => {
                warn!("Ignoring corrupted onboarding flag value {:?}.", other);
                false
            }
        }
    }

    /// The persisted trial window, if one exists and parses.
    pub fn trial_window(&self) -> Option<TrialWindow> {
        let raw = self.read(FlagKey::TrialStart)?;
        match trial::parse_stamp(&raw) {
            Some(started_at) => Some(TrialWindow { started_at }),
            None => {
                warn!("Ignoring malformed trial start stamp {:?}.", raw);
                None
            }
        }
    }

    /// Zero when no trial window exists yet.
    pub fn days_remaining(&self) -> u32 {
        self.trial_window()
            .map(|window| {
                trial::days_remaining(self.clock.now(), window.started_at, self.trial_length_days)
            })
            .unwrap_or(0)
    }

    pub fn has_access(&self) -> bool {
        self.snapshot().has_access
    }

    pub fn snapshot(&self) -> EntitlementSnapshot {
        EntitlementSnapshot::new(self.is_premium, self.days_remaining())
    }

    fn stamp_trial(&self) -> CoreResult<()> {
        let now = self.clock.now();
        self.store.set(FlagKey::TrialStart, &trial::format_stamp(now))?;
        info!("Trial window started at {}.", now);
        Ok(())
    }

    // Storage read failures degrade to "not set" rather than failing the caller.
    fn read(&self, key: FlagKey) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!("Failed to read flag {}: {}", key.as_str(), e);
                None
            }
        }
    }
}
