//! Shared helpers for subcommand implementations.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use chrono::{DateTime, FixedOffset, Utc};
use uuid::Uuid;

use bt_core::{
    Baby, BottleState, EventTracker, ExpiryReminder, ReminderDispatcher, SystemClock, Timestamp,
    TrackerError, ValidationError, WarningLevel,
};
use bt_db::Database;

/// The registered baby, or an actionable error if none exists.
pub fn require_baby(db: &Database) -> Result<Baby> {
    db.first_baby()?.ok_or_else(|| {
        anyhow!("no baby registered; run `bt baby add --name <NAME> --birth-date <DATE>` first")
    })
}

/// A tracker for the baby with freshly derived projections, logging as the
/// primary caregiver.
pub fn tracker(db: &Arc<Database>, baby: &Baby) -> Result<EventTracker<Database, SystemClock>> {
    let mut tracker = EventTracker::new(
        Arc::clone(db),
        Arc::new(SystemClock),
        baby.id,
        baby.primary_caregiver_id,
    );
    tracker.refresh_state()?;
    Ok(tracker)
}

/// Renders recoverable conflicts as hints naming the command that resolves
/// them; other errors pass through unchanged.
pub fn explain(err: TrackerError) -> anyhow::Error {
    match &err {
        TrackerError::Validation(ValidationError::SleepAlreadyActive {
            started_at,
            active_seconds,
        }) => anyhow!(
            "a sleep session is already active (started {}, {}m ago); run `bt sleep end` first",
            local_time(started_at),
            active_seconds / 60,
        ),
        TrackerError::Validation(ValidationError::FeedingAlreadyActive {
            started_at,
            active_seconds,
        }) => anyhow!(
            "a feeding is already in progress (started {}, {}m ago); run `bt bottle finish <REMAINING>` first",
            local_time(started_at),
            active_seconds / 60,
        ),
        TrackerError::Validation(ValidationError::BottleExpired) => {
            anyhow!("that bottle has expired; discard it with `bt bottle discard`")
        }
        _ => anyhow::Error::new(err),
    }
}

/// Renders a timestamp in its originating timezone, e.g. `2025-06-01 10:30`.
pub fn local_time(ts: &Timestamp) -> String {
    local_instant(ts.utc, ts.offset_seconds)
}

/// Renders a UTC instant in the given offset.
pub fn local_instant(utc: DateTime<Utc>, offset_seconds: i32) -> String {
    FixedOffset::east_opt(offset_seconds).map_or_else(
        || utc.format("%Y-%m-%d %H:%M UTC").to_string(),
        |offset| {
            utc.with_timezone(&offset)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        },
    )
}

/// Short event ID for display.
pub fn short_id(id: Uuid) -> String {
    id.to_string()[..8].to_string()
}

pub const fn state_label(state: BottleState) -> &'static str {
    match state {
        BottleState::Prepared => "prepared",
        BottleState::Refrigerated => "refrigerated",
        BottleState::Feeding => "feeding",
        BottleState::Finished => "finished",
    }
}

pub const fn warning_label(level: WarningLevel) -> &'static str {
    match level {
        WarningLevel::None => "no deadline",
        WarningLevel::Safe => "safe",
        WarningLevel::Warning => "use soon",
        WarningLevel::Urgent => "use now",
        WarningLevel::Expired => "EXPIRED",
    }
}

/// Dispatcher that only logs scheduled reminders. The CLI has no notification
/// daemon; the computed fire time is printed for the user instead.
pub struct TracingDispatcher;

impl ReminderDispatcher for TracingDispatcher {
    fn schedule(&self, reminder: ExpiryReminder) {
        tracing::debug!(
            event_id = %reminder.event_id,
            fire_at = %reminder.fire_at,
            "expiry reminder scheduled"
        );
    }

    fn cancel(&self, event_id: Uuid) {
        tracing::debug!(%event_id, "expiry reminder cancelled");
    }

    fn cancel_all(&self) {}
}
