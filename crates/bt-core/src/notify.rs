//! Bottle-expiry reminder scheduling.
//!
//! Computes when an expiry reminder should fire (fifteen minutes before the
//! deadline, deferred out of a quiet-hours window) and hands it to a
//! [`ReminderDispatcher`]. Delivery itself is a collaborator concern; this
//! module only does the arithmetic and the cancel bookkeeping.

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bottle;
use crate::event::Event;
use crate::timestamp::Clock;

/// How many minutes before the deadline the reminder fires.
pub const REMINDER_LEAD_MINUTES: i64 = 15;

/// A half-open `[start, end)` window of local hours in which reminders must
/// not fire. Wrap-around windows (e.g. 22 to 6) are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuietHours {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl QuietHours {
    /// Whether the given local hour falls inside the window.
    pub const fn contains(&self, hour: u32) -> bool {
        if self.start_hour > self.end_hour {
            // Crosses midnight (e.g. 22:00 - 06:00)
            hour >= self.start_hour || hour < self.end_hour
        } else {
            hour >= self.start_hour && hour < self.end_hour
        }
    }
}

impl Default for QuietHours {
    /// 22:00 to 06:00.
    fn default() -> Self {
        Self {
            start_hour: 22,
            end_hour: 6,
        }
    }
}

/// Defers a fire time that lands in quiet hours to the window's end hour.
///
/// The hour is evaluated in the timezone given by `offset_seconds` (the
/// bottle's originating offset). If the end hour on the same local day is not
/// after the original time, the reminder moves to the next day.
pub fn adjust_for_quiet_hours(
    fire_at: DateTime<Utc>,
    offset_seconds: i32,
    quiet: QuietHours,
) -> DateTime<Utc> {
    let Some(offset) = FixedOffset::east_opt(offset_seconds) else {
        return fire_at;
    };
    let local = fire_at.with_timezone(&offset);
    if !quiet.contains(local.hour()) {
        return fire_at;
    }

    let Some(end_of_quiet) = local.date_naive().and_hms_opt(quiet.end_hour, 0, 0) else {
        return fire_at;
    };
    let adjusted = if end_of_quiet <= local.naive_local() {
        end_of_quiet + Duration::days(1)
    } else {
        end_of_quiet
    };

    offset
        .from_local_datetime(&adjusted)
        .single()
        .map_or(fire_at, |deferred| deferred.with_timezone(&Utc))
}

/// A scheduled expiry reminder for one bottle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpiryReminder {
    /// The feed event this reminder belongs to.
    pub event_id: Uuid,
    /// When the reminder fires, in UTC.
    pub fire_at: DateTime<Utc>,
    /// Prepared amount, for the reminder text.
    pub amount_prepared_oz: f64,
}

/// Consumer of computed reminders. Implementations deliver platform
/// notifications; cancellation is keyed by event so a finished or discarded
/// bottle drops its pending reminder.
pub trait ReminderDispatcher {
    fn schedule(&self, reminder: ExpiryReminder);
    fn cancel(&self, event_id: Uuid);
    fn cancel_all(&self);
}

/// Computes reminder times for bottle events and forwards them to a
/// dispatcher.
pub struct ExpiryScheduler<D: ReminderDispatcher, C: Clock> {
    dispatcher: D,
    clock: C,
    quiet_hours: Option<QuietHours>,
}

impl<D: ReminderDispatcher, C: Clock> ExpiryScheduler<D, C> {
    pub const fn new(dispatcher: D, clock: C, quiet_hours: Option<QuietHours>) -> Self {
        Self {
            dispatcher,
            clock,
            quiet_hours,
        }
    }

    /// Schedules a reminder at `deadline - 15min` for a bottle event.
    ///
    /// Returns the fire time, or `None` when the event has no deadline
    /// (finished bottle, non-feed event) or the fire time is already past.
    pub fn schedule_expiry_reminder(
        &self,
        event: &Event,
        policy_hours: i64,
    ) -> Option<DateTime<Utc>> {
        let data = event.feed_data()?;
        let deadline = bottle::expiry_deadline(&event.start_time, data, policy_hours)?;

        let mut fire_at = deadline - Duration::minutes(REMINDER_LEAD_MINUTES);
        if let Some(quiet) = self.quiet_hours {
            fire_at = adjust_for_quiet_hours(fire_at, event.start_time.offset_seconds, quiet);
        }
        if fire_at <= self.clock.instant() {
            tracing::debug!(event_id = %event.id, "expiry reminder already past, not scheduled");
            return None;
        }

        self.dispatcher.schedule(ExpiryReminder {
            event_id: event.id,
            fire_at,
            amount_prepared_oz: data.amount_prepared_oz,
        });
        Some(fire_at)
    }

    /// Drops the pending reminder for one bottle.
    pub fn cancel(&self, event_id: Uuid) {
        self.dispatcher.cancel(event_id);
    }

    /// Drops all pending bottle reminders.
    pub fn cancel_all(&self) {
        self.dispatcher.cancel_all();
    }
}
