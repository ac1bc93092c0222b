//! The escalation rule as pure functions of `(now, created_on, threshold)`.
//!
//! Creation dates carry no time of day, so an incident is aged from midnight
//! UTC of the day it was opened. An incident opened late in the day therefore
//! looks older than it really is; the rule deliberately keeps that behavior.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Outcome of evaluating one open incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationDecision {
    /// Age exceeds the customer's threshold.
    Escalate,
    /// Age is at or below the threshold.
    WithinThreshold,
    /// The customer has no threshold; the incident is left alone.
    Unconfigured,
}

/// Midnight UTC on the creation date.
pub fn creation_instant(created_on: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&created_on.and_time(NaiveTime::MIN))
}

pub fn incident_age(now: DateTime<Utc>, created_on: NaiveDate) -> Duration {
    now - creation_instant(created_on)
}

/// Strictly greater than: an incident exactly at its threshold stays open.
pub fn should_escalate(now: DateTime<Utc>, created_on: NaiveDate, threshold: Duration) -> bool {
    incident_age(now, created_on) > threshold
}

pub fn decide(
    now: DateTime<Utc>,
    created_on: NaiveDate,
    threshold: Option<Duration>,
) -> EscalationDecision {
    match threshold {
        None => EscalationDecision::Unconfigured,
        Some(t) if should_escalate(now, created_on, t) => EscalationDecision::Escalate,
        Some(_) => EscalationDecision::WithinThreshold,
    }
}

/// Convert a stored hour count into a duration, rounded to the millisecond.
///
/// Returns `None` for non-finite or out-of-range values.
pub fn hours_to_duration(hours: f64) -> Option<Duration> {
    if !hours.is_finite() {
        return None;
    }
    let millis = (hours * MILLIS_PER_HOUR).round();
    if millis.abs() >= i64::MAX as f64 {
        return None;
    }
    Duration::try_milliseconds(millis as i64)
}

/// Fractional hours, for log output.
pub fn as_hours(duration: Duration) -> f64 {
    duration.num_milliseconds() as f64 / MILLIS_PER_HOUR
}
