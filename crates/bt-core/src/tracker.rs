//! Event orchestrator: the use-case layer for logging caregiving events.
//!
//! Each use case sequences validation, event construction or mutation, a
//! persistence call, and a projection update, in that order. The in-memory
//! projections (`active_sleep`, `active_feeding`, `prepared_bottles`) are a
//! cache over the store, never the source of truth: they change only after a
//! confirmed write, and [`EventTracker::refresh_state`] rebuilds them from a
//! fresh query after any external mutation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use uuid::Uuid;

use crate::event::{DiaperContents, DiaperData, Event, EventPayload, FeedData, SleepData};
use crate::store::{EventStore, StoreError};
use crate::timestamp::Clock;
use crate::validate::{FeedingValidator, SleepValidator, ValidationError};

/// Error from an orchestrator use case.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// A business rule rejected the operation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The persistence collaborator failed; no local state was changed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TrackerError {
    /// Whether this is a recoverable conflict the caller can resolve (e.g. by
    /// offering to end the existing session).
    pub const fn is_conflict(&self) -> bool {
        match self {
            Self::Validation(err) => err.is_conflict(),
            Self::Store(_) => false,
        }
    }
}

/// Which action a [`EventTracker::toggle_sleep`] call performed.
#[derive(Debug, Clone, PartialEq)]
pub enum SleepToggle {
    Started(Event),
    Ended(Event),
}

/// Orchestrates event logging for one baby on behalf of one caregiver.
///
/// Not internally synchronized; concurrent use for the same baby must go
/// through [`TrackerRegistry`], which hands out one lock per subject.
pub struct EventTracker<S: EventStore, C: Clock> {
    store: Arc<S>,
    clock: Arc<C>,
    baby_id: Uuid,
    logged_by: Uuid,
    active_sleep: Option<Event>,
    active_feeding: Option<Event>,
    prepared_bottles: Vec<Event>,
}

impl<S: EventStore, C: Clock> EventTracker<S, C> {
    /// Creates a tracker with empty projections. Call
    /// [`refresh_state`](Self::refresh_state) before trusting them.
    pub fn new(store: Arc<S>, clock: Arc<C>, baby_id: Uuid, logged_by: Uuid) -> Self {
        Self {
            store,
            clock,
            baby_id,
            logged_by,
            active_sleep: None,
            active_feeding: None,
            prepared_bottles: Vec::new(),
        }
    }

    /// The cached active sleep event, if any.
    pub const fn active_sleep(&self) -> Option<&Event> {
        self.active_sleep.as_ref()
    }

    /// The cached active feeding event, if any.
    pub const fn active_feeding(&self) -> Option<&Event> {
        self.active_feeding.as_ref()
    }

    /// Cached prepared bottles, start time descending.
    pub fn prepared_bottles(&self) -> &[Event] {
        &self.prepared_bottles
    }

    /// Re-derives all three projections from the store.
    ///
    /// This is the only way projections become trustworthy after a mutation
    /// outside this tracker.
    pub fn refresh_state(&mut self) -> Result<(), TrackerError> {
        let sleep = SleepValidator::new(self.store.as_ref());
        let feeding = FeedingValidator::new(self.store.as_ref());

        self.active_sleep = sleep.active_sleep(self.baby_id)?;
        self.active_feeding = feeding.active_feeding(self.baby_id)?;
        self.prepared_bottles = feeding.prepared_bottles(self.baby_id)?;
        tracing::debug!(
            baby_id = %self.baby_id,
            sleeping = self.active_sleep.is_some(),
            feeding = self.active_feeding.is_some(),
            prepared = self.prepared_bottles.len(),
            "refreshed tracker state"
        );
        Ok(())
    }

    /// Starts a new sleep session.
    pub fn start_sleep(&mut self) -> Result<Event, TrackerError> {
        let now = self.clock.now();
        SleepValidator::new(self.store.as_ref()).validate_new_sleep(self.baby_id, now.utc)?;

        let event = Event::new(
            self.baby_id,
            self.logged_by,
            now,
            EventPayload::Sleep(SleepData::default()),
        );
        let created = self.store.create(&event)?;
        tracing::debug!(event_id = %created.id, "sleep started");
        self.active_sleep = Some(created.clone());
        Ok(created)
    }

    /// Ends an active sleep session.
    pub fn end_sleep(&mut self, event: &Event) -> Result<Event, TrackerError> {
        SleepValidator::<S>::validate_end_sleep(event)?;

        let now = self.clock.now();
        let mut updated = event.clone();
        updated.updated_at = now.utc;
        updated.end_time = Some(now);

        let stored = self.store.update(&updated)?;
        tracing::debug!(event_id = %stored.id, "sleep ended");
        if self.active_sleep.as_ref().is_some_and(|e| e.id == stored.id) {
            self.active_sleep = None;
        }
        Ok(stored)
    }

    /// Starts or ends a sleep based on the current projection.
    pub fn toggle_sleep(&mut self) -> Result<SleepToggle, TrackerError> {
        match self.active_sleep.clone() {
            Some(active) => Ok(SleepToggle::Ended(self.end_sleep(&active)?)),
            None => Ok(SleepToggle::Started(self.start_sleep()?)),
        }
    }

    /// Prepares a new bottle. Never conflicts; multiple prepared bottles may
    /// coexist.
    pub fn prepare_bottle(
        &mut self,
        amount_oz: f64,
        is_refrigerated: bool,
    ) -> Result<Event, TrackerError> {
        let data = FeedData::new(amount_oz, is_refrigerated)?;
        let event = Event::new(
            self.baby_id,
            self.logged_by,
            self.clock.now(),
            EventPayload::Feed(data),
        );
        let created = self.store.create(&event)?;
        tracing::debug!(event_id = %created.id, amount_oz, is_refrigerated, "bottle prepared");
        self.prepared_bottles.insert(0, created.clone());
        Ok(created)
    }

    /// Starts feeding from a prepared bottle.
    pub fn start_feeding(
        &mut self,
        event: &Event,
        policy_hours: i64,
    ) -> Result<Event, TrackerError> {
        let now = self.clock.now();
        let feeding = FeedingValidator::new(self.store.as_ref());
        feeding.validate_feeding_start(self.baby_id, now.utc)?;
        FeedingValidator::<S>::validate_bottle_not_expired(event, policy_hours, now.utc)?;

        let mut updated = event.clone();
        updated.updated_at = now.utc;
        let Some(data) = updated.feed_data_mut() else {
            return Err(ValidationError::WrongEventCategory.into());
        };
        data.feeding_started_at = Some(now);

        let stored = self.store.update(&updated)?;
        tracing::debug!(event_id = %stored.id, "feeding started");
        self.prepared_bottles.retain(|e| e.id != stored.id);
        self.active_feeding = Some(stored.clone());
        Ok(stored)
    }

    /// Finishes a feeding, recording how much was left in the bottle.
    pub fn finish_feeding(
        &mut self,
        event: &Event,
        amount_remaining_oz: f64,
    ) -> Result<Event, TrackerError> {
        FeedingValidator::<S>::validate_finish_feeding(event, amount_remaining_oz)?;

        let now = self.clock.now();
        let mut updated = event.clone();
        updated.updated_at = now.utc;
        updated.end_time = Some(now);
        let Some(data) = updated.feed_data_mut() else {
            return Err(ValidationError::WrongEventCategory.into());
        };
        data.amount_remaining_oz = Some(amount_remaining_oz);

        let stored = self.store.update(&updated)?;
        tracing::debug!(event_id = %stored.id, amount_remaining_oz, "feeding finished");
        if self.active_feeding.as_ref().is_some_and(|e| e.id == stored.id) {
            self.active_feeding = None;
        }
        self.prepared_bottles.retain(|e| e.id != stored.id);
        Ok(stored)
    }

    /// Discards a bottle without going through the Finished state.
    pub fn discard_bottle(&mut self, event: &Event) -> Result<(), TrackerError> {
        self.store.soft_delete(event, self.clock.instant())?;
        tracing::debug!(event_id = %event.id, "bottle discarded");
        self.prepared_bottles.retain(|e| e.id != event.id);
        if self.active_feeding.as_ref().is_some_and(|e| e.id == event.id) {
            self.active_feeding = None;
        }
        Ok(())
    }

    /// Logs a diaper change. Instantaneous; no active-state tracking.
    pub fn log_diaper(&mut self, contents: DiaperContents) -> Result<Event, TrackerError> {
        let event = Event::new(
            self.baby_id,
            self.logged_by,
            self.clock.now(),
            EventPayload::Diaper(DiaperData { contents }),
        );
        let created = self.store.create(&event)?;
        tracing::debug!(event_id = %created.id, %contents, "diaper logged");
        Ok(created)
    }

    /// Replaces an event's free-text notes.
    pub fn update_notes(
        &mut self,
        event: &Event,
        notes: Option<String>,
    ) -> Result<Event, TrackerError> {
        let mut updated = event.clone();
        updated.notes = notes;
        updated.updated_at = self.clock.instant();
        Ok(self.store.update(&updated)?)
    }

    /// Soft-deletes any event and re-derives the projections.
    pub fn delete_event(&mut self, event: &Event) -> Result<(), TrackerError> {
        self.store.soft_delete(event, self.clock.instant())?;
        self.refresh_state()
    }
}

/// Hands out one serialized [`EventTracker`] per baby.
///
/// Use-case calls for the same subject must not interleave (two concurrent
/// `start_sleep` calls could both observe "no active sleep"), so each baby
/// gets its own mutex. Unrelated babies proceed concurrently.
pub struct TrackerRegistry<S: EventStore, C: Clock> {
    store: Arc<S>,
    clock: Arc<C>,
    trackers: Mutex<HashMap<Uuid, Arc<Mutex<EventTracker<S, C>>>>>,
}

impl<S: EventStore, C: Clock> TrackerRegistry<S, C> {
    pub fn new(store: Arc<S>, clock: Arc<C>) -> Self {
        Self {
            store,
            clock,
            trackers: Mutex::new(HashMap::new()),
        }
    }

    /// The tracker for `baby_id`, created on first use.
    pub fn tracker(&self, baby_id: Uuid, logged_by: Uuid) -> Arc<Mutex<EventTracker<S, C>>> {
        let mut trackers = self
            .trackers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(trackers.entry(baby_id).or_insert_with(|| {
            Arc::new(Mutex::new(EventTracker::new(
                Arc::clone(&self.store),
                Arc::clone(&self.clock),
                baby_id,
                logged_by,
            )))
        }))
    }
}
