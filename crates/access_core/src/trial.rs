//! crates/access_core/src/trial.rs
//!
//! The trial clock: a pure function from (now, trial start, trial length) to the
//! number of whole days left, plus parsing of the persisted start stamp.

use chrono::{DateTime, SecondsFormat, Utc};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Whole days left in a trial of `trial_length_days` that started at `started_at`.
///
/// Elapsed time is the absolute distance between `now` and `started_at`, rounded
/// up to whole days. A start stamp that appears to be in the future therefore
/// consumes trial days instead of adding them.
pub fn days_remaining(now: DateTime<Utc>, started_at: DateTime<Utc>, trial_length_days: u32) -> u32 {
    let diff_ms = (now - started_at).num_milliseconds().unsigned_abs();
    let day = MILLIS_PER_DAY as u64;
    let elapsed_days = diff_ms.div_ceil(day);

    u64::from(trial_length_days)
        .saturating_sub(elapsed_days)
        .try_into()
        .unwrap_or(0)
}

/// Parses a persisted trial stamp. Anything unparseable is treated as absent.
pub fn parse_stamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|stamp| stamp.with_timezone(&Utc))
}

/// Formats a trial stamp the way it is persisted (ISO-8601, millisecond precision).
pub fn format_stamp(stamp: DateTime<Utc>) -> String {
    stamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
