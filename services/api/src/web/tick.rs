//! services/api/src/web/tick.rs
//!
//! Background task that re-derives the entitlement snapshot on a fixed period and
//! logs when it changes. Request handlers never depend on it: every read already
//! recomputes from the clock.

use crate::web::state::AppState;
use access_core::EntitlementSnapshot;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Describes what changed between two snapshots, if anything worth logging.
pub fn describe_transition(
    previous: EntitlementSnapshot,
    current: EntitlementSnapshot,
) -> Option<String> {
    if previous.has_access && !current.has_access {
        return Some("access lapsed, the upgrade prompt is now forced".to_string());
    }
    if !previous.has_access && current.has_access {
        return Some("access restored".to_string());
    }
    if previous.days_remaining != current.days_remaining {
        return Some(format!(
            "trial days remaining {} -> {}",
            previous.days_remaining, current.days_remaining
        ));
    }
    None
}

/// Runs until `token` is cancelled, then returns the last snapshot it observed.
pub async fn entitlement_watch(
    state: Arc<AppState>,
    period: Duration,
    token: CancellationToken,
) -> Option<EntitlementSnapshot> {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last: Option<EntitlementSnapshot> = None;

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                info!("Entitlement watch stopped.");
                return last;
            }
            _ = interval.tick() => {
                let current = state.session.lock().await.snapshot();
                if let Some(previous) = last {
                    match describe_transition(previous, current) {
                        Some(change) if !current.has_access => warn!("Entitlement: {}", change),
                        Some(change) => info!("Entitlement: {}", change),
                        None => {}
                    }
                }
                last = Some(current);
            }
        }
    }
}
