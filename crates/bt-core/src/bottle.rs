//! Bottle lifecycle calculator.
//!
//! Bottle state is never stored; it is derived from the feed payload on every
//! read. Expiry is likewise a pure function of the payload, the preparation
//! time, and the caregiver's refrigeration policy, evaluated against a `now`
//! the caller supplies. Transitions run one way only:
//! Prepared/Refrigerated → Feeding → Finished.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::baby::BabySettings;
use crate::event::FeedData;
use crate::timestamp::Timestamp;

/// Derived lifecycle state of a bottle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BottleState {
    /// Prepared at room temperature, feeding not started.
    Prepared,
    /// Prepared and stored in the refrigerator.
    Refrigerated,
    /// Baby is currently feeding from this bottle.
    Feeding,
    /// Feeding is complete. Terminal.
    Finished,
}

impl BottleState {
    /// Whether the bottle still counts toward active tracking.
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::Finished)
    }
}

impl FeedData {
    /// The current lifecycle state, derived from the payload fields.
    pub const fn state(&self) -> BottleState {
        if self.amount_remaining_oz.is_some() {
            BottleState::Finished
        } else if self.feeding_started_at.is_some() {
            BottleState::Feeding
        } else if self.is_refrigerated {
            BottleState::Refrigerated
        } else {
            BottleState::Prepared
        }
    }
}

/// Urgency of an approaching bottle expiry, relative to a given clock reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningLevel {
    /// No deadline applies (finished bottle).
    None,
    /// At least 30 minutes remaining.
    Safe,
    /// Between 15 and 30 minutes remaining.
    Warning,
    /// Less than 15 minutes remaining.
    Urgent,
    /// Past the deadline.
    Expired,
}

/// When the bottle expires, or `None` for finished bottles.
///
/// - Prepared (room temperature): 2 hours from preparation.
/// - Refrigerated: `policy_hours` from preparation, clamped to `[1, 24]`.
/// - Feeding: 1 hour from when the feeding started.
///
/// A bottle in the Feeding state carries its feeding start time by
/// construction, so the match below covers every reachable shape.
pub fn expiry_deadline(
    prepared_at: &Timestamp,
    data: &FeedData,
    policy_hours: i64,
) -> Option<DateTime<Utc>> {
    match (data.amount_remaining_oz, &data.feeding_started_at) {
        (Some(_), _) => None,
        (None, Some(feeding_started)) => Some(feeding_started.utc + Duration::hours(1)),
        (None, None) => {
            let hours = if data.is_refrigerated {
                policy_hours.clamp(BabySettings::MIN_EXPIRY_HOURS, BabySettings::MAX_EXPIRY_HOURS)
            } else {
                2
            };
            Some(prepared_at.utc + Duration::hours(hours))
        }
    }
}

/// Signed time remaining until expiry, or `None` when no deadline applies.
pub fn time_until_expiry(
    prepared_at: &Timestamp,
    data: &FeedData,
    policy_hours: i64,
    now: DateTime<Utc>,
) -> Option<Duration> {
    expiry_deadline(prepared_at, data, policy_hours).map(|deadline| deadline - now)
}

/// The warning level for a bottle at `now`.
pub fn warning_level(
    prepared_at: &Timestamp,
    data: &FeedData,
    policy_hours: i64,
    now: DateTime<Utc>,
) -> WarningLevel {
    let Some(remaining) = time_until_expiry(prepared_at, data, policy_hours, now) else {
        return WarningLevel::None;
    };

    if remaining <= Duration::zero() {
        WarningLevel::Expired
    } else if remaining < Duration::minutes(15) {
        WarningLevel::Urgent
    } else if remaining < Duration::minutes(30) {
        WarningLevel::Warning
    } else {
        WarningLevel::Safe
    }
}

/// Whether the bottle is past its deadline at `now`.
pub fn is_expired(
    prepared_at: &Timestamp,
    data: &FeedData,
    policy_hours: i64,
    now: DateTime<Utc>,
) -> bool {
    warning_level(prepared_at, data, policy_hours, now) == WarningLevel::Expired
}
