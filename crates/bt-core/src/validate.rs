//! Business-rule validation for sleep and feeding sessions.
//!
//! Validators run before any mutation is attempted. Conflicts
//! (`*AlreadyActive`) are expected, recoverable states carrying enough data
//! for the caller to offer a resolution; the remaining variants are caller or
//! stale-state errors surfaced as-is.

use chrono::DateTime;
use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::bottle::{self, BottleState};
use crate::event::{Event, EventCategory};
use crate::store::{EventStore, StoreError};
use crate::timestamp::Timestamp;
use crate::tracker::TrackerError;

/// A business-rule violation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// A sleep session is already in progress for this baby.
    #[error("a sleep session is already active ({}m elapsed)", active_seconds / 60)]
    SleepAlreadyActive {
        started_at: Timestamp,
        active_seconds: i64,
    },

    /// A bottle is already in the Feeding state for this baby.
    #[error("a feeding is already in progress ({}m elapsed)", active_seconds / 60)]
    FeedingAlreadyActive {
        started_at: Timestamp,
        active_seconds: i64,
    },

    /// The event's category does not fit the requested operation.
    #[error("wrong event category for this operation")]
    WrongEventCategory,

    /// The event already has an end time or was deleted.
    #[error("this event has already ended")]
    EventAlreadyEnded,

    /// The bottle is past its expiry deadline.
    #[error("this bottle has expired and should be discarded")]
    BottleExpired,

    /// The amount is negative, non-finite, or exceeds what was prepared.
    #[error("invalid amount: {amount_oz} oz")]
    InvalidAmount { amount_oz: f64 },
}

impl ValidationError {
    /// Whether this is a recoverable conflict (caller can offer to end the
    /// existing session) rather than a hard error.
    pub const fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::SleepAlreadyActive { .. } | Self::FeedingAlreadyActive { .. }
        )
    }
}

/// Enforces: at most one active sleep event per baby at any time.
pub struct SleepValidator<'a, S: EventStore> {
    store: &'a S,
}

impl<'a, S: EventStore> SleepValidator<'a, S> {
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// The currently active sleep event, if any.
    pub fn active_sleep(&self, baby_id: Uuid) -> Result<Option<Event>, StoreError> {
        let active = self
            .store
            .fetch_active_events(baby_id, EventCategory::Sleep)?;
        Ok(active.into_iter().next())
    }

    /// Checks that a new sleep may start for this baby.
    pub fn validate_new_sleep(&self, baby_id: Uuid, now: DateTime<Utc>) -> Result<(), TrackerError> {
        if let Some(active) = self.active_sleep(baby_id)? {
            return Err(ValidationError::SleepAlreadyActive {
                active_seconds: active.active_duration(now).num_seconds(),
                started_at: active.start_time,
            }
            .into());
        }
        Ok(())
    }

    /// Checks that the given event is a sleep that can still be ended.
    pub fn validate_end_sleep(event: &Event) -> Result<(), ValidationError> {
        if event.category() != EventCategory::Sleep {
            return Err(ValidationError::WrongEventCategory);
        }
        if !event.is_active() {
            return Err(ValidationError::EventAlreadyEnded);
        }
        Ok(())
    }
}

/// Enforces: at most one bottle in the Feeding state per baby. Multiple
/// Prepared/Refrigerated bottles may coexist.
pub struct FeedingValidator<'a, S: EventStore> {
    store: &'a S,
}

impl<'a, S: EventStore> FeedingValidator<'a, S> {
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// The feed event currently in the Feeding state, if any.
    pub fn active_feeding(&self, baby_id: Uuid) -> Result<Option<Event>, StoreError> {
        let active = self.store.fetch_active_events(baby_id, EventCategory::Feed)?;
        Ok(active
            .into_iter()
            .find(|event| event.feed_data().is_some_and(|d| d.state() == BottleState::Feeding)))
    }

    /// Prepared and refrigerated bottles waiting to be used, start time
    /// descending.
    pub fn prepared_bottles(&self, baby_id: Uuid) -> Result<Vec<Event>, StoreError> {
        let active = self.store.fetch_active_events(baby_id, EventCategory::Feed)?;
        Ok(active
            .into_iter()
            .filter(|event| {
                event.feed_data().is_some_and(|d| {
                    matches!(d.state(), BottleState::Prepared | BottleState::Refrigerated)
                })
            })
            .collect())
    }

    /// Prepared bottles already past their expiry deadline at `now`.
    pub fn expired_bottles(
        &self,
        baby_id: Uuid,
        policy_hours: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<Event>, StoreError> {
        let bottles = self.prepared_bottles(baby_id)?;
        Ok(bottles
            .into_iter()
            .filter(|event| {
                event
                    .feed_data()
                    .is_some_and(|d| bottle::is_expired(&event.start_time, d, policy_hours, now))
            })
            .collect())
    }

    /// Checks that a feeding may start for this baby.
    pub fn validate_feeding_start(
        &self,
        baby_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), TrackerError> {
        if let Some(feeding) = self.active_feeding(baby_id)? {
            // The Feeding state guarantees a feeding start time; fall back to
            // the event start if the payload is somehow missing one.
            let started_at = feeding
                .feed_data()
                .and_then(|d| d.feeding_started_at.clone())
                .unwrap_or_else(|| feeding.start_time.clone());
            return Err(ValidationError::FeedingAlreadyActive {
                active_seconds: started_at.duration_until_instant(now).num_seconds(),
                started_at,
            }
            .into());
        }
        Ok(())
    }

    /// Checks that the bottle has not expired at `now`.
    pub fn validate_bottle_not_expired(
        event: &Event,
        policy_hours: i64,
        now: DateTime<Utc>,
    ) -> Result<(), ValidationError> {
        let Some(data) = event.feed_data() else {
            return Err(ValidationError::WrongEventCategory);
        };
        if bottle::is_expired(&event.start_time, data, policy_hours, now) {
            return Err(ValidationError::BottleExpired);
        }
        Ok(())
    }

    /// Checks the remaining amount recorded when finishing a feeding.
    ///
    /// Remaining equal to the prepared amount is legal (the baby consumed
    /// nothing).
    pub fn validate_finish_feeding(
        event: &Event,
        amount_remaining_oz: f64,
    ) -> Result<(), ValidationError> {
        let Some(data) = event.feed_data() else {
            return Err(ValidationError::WrongEventCategory);
        };
        if !amount_remaining_oz.is_finite()
            || amount_remaining_oz < 0.0
            || amount_remaining_oz > data.amount_prepared_oz
        {
            return Err(ValidationError::InvalidAmount {
                amount_oz: amount_remaining_oz,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::event::{EventPayload, FeedData, SleepData};
    use crate::testutil::MemoryStore;

    use super::*;

    fn ts(iso: &str) -> Timestamp {
        Timestamp::from_utc(iso.parse().unwrap())
    }

    fn sleep_event(baby_id: Uuid, start: &str) -> Event {
        Event::new(
            baby_id,
            Uuid::new_v4(),
            ts(start),
            EventPayload::Sleep(SleepData::default()),
        )
    }

    fn bottle_event(baby_id: Uuid, start: &str) -> Event {
        Event::new(
            baby_id,
            Uuid::new_v4(),
            ts(start),
            EventPayload::Feed(FeedData::new(4.0, false).unwrap()),
        )
    }

    #[test]
    fn new_sleep_conflicts_with_active_sleep() {
        let baby_id = Uuid::new_v4();
        let store = MemoryStore::new();
        store.seed(sleep_event(baby_id, "2025-06-01T10:00:00Z"));

        let validator = SleepValidator::new(&store);
        let err = validator
            .validate_new_sleep(baby_id, "2025-06-01T10:45:00Z".parse().unwrap())
            .unwrap_err();

        match err {
            TrackerError::Validation(ValidationError::SleepAlreadyActive {
                active_seconds, ..
            }) => {
                assert_eq!(active_seconds, 45 * 60);
            }
            other => panic!("expected SleepAlreadyActive, got {other:?}"),
        }
        assert!(err.is_conflict());
    }

    #[test]
    fn new_sleep_allowed_when_none_active() {
        let baby_id = Uuid::new_v4();
        let store = MemoryStore::new();

        // An ended sleep does not block a new one
        let mut ended = sleep_event(baby_id, "2025-06-01T08:00:00Z");
        ended.end_time = Some(ts("2025-06-01T09:00:00Z"));
        store.seed(ended);

        let validator = SleepValidator::new(&store);
        assert!(validator
            .validate_new_sleep(baby_id, "2025-06-01T10:00:00Z".parse().unwrap())
            .is_ok());
    }

    #[test]
    fn end_sleep_rejects_wrong_category_and_ended_events() {
        let baby_id = Uuid::new_v4();

        let bottle = bottle_event(baby_id, "2025-06-01T10:00:00Z");
        assert_eq!(
            SleepValidator::<MemoryStore>::validate_end_sleep(&bottle),
            Err(ValidationError::WrongEventCategory)
        );

        let mut sleep = sleep_event(baby_id, "2025-06-01T10:00:00Z");
        sleep.end_time = Some(ts("2025-06-01T11:00:00Z"));
        assert_eq!(
            SleepValidator::<MemoryStore>::validate_end_sleep(&sleep),
            Err(ValidationError::EventAlreadyEnded)
        );
    }

    #[test]
    fn feeding_start_conflicts_only_with_feeding_state() {
        let baby_id = Uuid::new_v4();
        let store = MemoryStore::new();

        // Two prepared bottles coexist without conflict
        store.seed(bottle_event(baby_id, "2025-06-01T09:00:00Z"));
        store.seed(bottle_event(baby_id, "2025-06-01T09:30:00Z"));

        let validator = FeedingValidator::new(&store);
        let now: DateTime<Utc> = "2025-06-01T10:00:00Z".parse().unwrap();
        assert!(validator.validate_feeding_start(baby_id, now).is_ok());

        // One bottle enters the Feeding state
        let mut feeding = bottle_event(baby_id, "2025-06-01T09:45:00Z");
        feeding.feed_data_mut().unwrap().feeding_started_at = Some(ts("2025-06-01T09:50:00Z"));
        store.seed(feeding);

        let err = validator.validate_feeding_start(baby_id, now).unwrap_err();
        assert!(matches!(
            err,
            TrackerError::Validation(ValidationError::FeedingAlreadyActive {
                active_seconds: 600,
                ..
            })
        ));
    }

    #[test]
    fn prepared_bottles_excludes_feeding_and_finished() {
        let baby_id = Uuid::new_v4();
        let store = MemoryStore::new();

        store.seed(bottle_event(baby_id, "2025-06-01T09:00:00Z"));

        let mut feeding = bottle_event(baby_id, "2025-06-01T09:30:00Z");
        feeding.feed_data_mut().unwrap().feeding_started_at = Some(ts("2025-06-01T09:40:00Z"));
        store.seed(feeding);

        let validator = FeedingValidator::new(&store);
        let bottles = validator.prepared_bottles(baby_id).unwrap();
        assert_eq!(bottles.len(), 1);
        assert_eq!(bottles[0].start_time, ts("2025-06-01T09:00:00Z"));
    }

    #[test]
    fn expired_bottles_filters_by_deadline() {
        let baby_id = Uuid::new_v4();
        let store = MemoryStore::new();

        store.seed(bottle_event(baby_id, "2025-06-01T06:00:00Z")); // expired at 08:00
        store.seed(bottle_event(baby_id, "2025-06-01T09:30:00Z")); // fresh

        let validator = FeedingValidator::new(&store);
        let now: DateTime<Utc> = "2025-06-01T10:00:00Z".parse().unwrap();
        let expired = validator.expired_bottles(baby_id, 24, now).unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].start_time, ts("2025-06-01T06:00:00Z"));
    }

    #[test]
    fn bottle_not_expired_check() {
        let baby_id = Uuid::new_v4();
        let event = bottle_event(baby_id, "2025-06-01T10:00:00Z");

        assert!(FeedingValidator::<MemoryStore>::validate_bottle_not_expired(
            &event,
            24,
            "2025-06-01T11:00:00Z".parse().unwrap()
        )
        .is_ok());

        assert_eq!(
            FeedingValidator::<MemoryStore>::validate_bottle_not_expired(
                &event,
                24,
                "2025-06-01T12:00:01Z".parse().unwrap()
            ),
            Err(ValidationError::BottleExpired)
        );
    }

    #[test]
    fn finish_feeding_amount_bounds() {
        let baby_id = Uuid::new_v4();
        let event = bottle_event(baby_id, "2025-06-01T10:00:00Z"); // 4.0 oz prepared

        let check = FeedingValidator::<MemoryStore>::validate_finish_feeding;
        assert!(matches!(
            check(&event, -0.5),
            Err(ValidationError::InvalidAmount { .. })
        ));
        assert!(matches!(
            check(&event, 4.5),
            Err(ValidationError::InvalidAmount { .. })
        ));
        // Baby consumed nothing: legal
        assert!(check(&event, 4.0).is_ok());
        assert!(check(&event, 0.0).is_ok());
    }
}
