//! Test fixtures: an in-memory store fake and a controllable clock.

use std::io;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::baby::Baby;
use crate::event::{Event, EventCategory};
use crate::store::{BabyStore, EventStore, StoreError};
use crate::timestamp::{Clock, Timestamp};

/// In-memory [`EventStore`]/[`BabyStore`] used by unit tests.
///
/// Mirrors the real store's ordering contract (start time descending) and can
/// be switched into a failing mode to exercise persistence-failure paths.
pub struct MemoryStore {
    events: Mutex<Vec<Event>>,
    babies: Mutex<Vec<Baby>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            babies: Mutex::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Inserts an event directly, bypassing the write-failure switch.
    pub fn seed(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    /// Makes subsequent writes fail with a backend error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn event_count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn event(&self, id: Uuid) -> Option<Event> {
        self.events.lock().unwrap().iter().find(|e| e.id == id).cloned()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::backend(io::Error::other("injected write failure")));
        }
        Ok(())
    }

    fn sorted_desc(mut events: Vec<Event>) -> Vec<Event> {
        events.sort_by(|a, b| b.start_time.utc.cmp(&a.start_time.utc));
        events
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStore for MemoryStore {
    fn fetch_active_events(
        &self,
        baby_id: Uuid,
        category: EventCategory,
    ) -> Result<Vec<Event>, StoreError> {
        let events = self.events.lock().unwrap();
        Ok(Self::sorted_desc(
            events
                .iter()
                .filter(|e| e.baby_id == baby_id && e.category() == category && e.is_active())
                .cloned()
                .collect(),
        ))
    }

    fn fetch_events_in_range(
        &self,
        baby_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Event>, StoreError> {
        let events = self.events.lock().unwrap();
        Ok(Self::sorted_desc(
            events
                .iter()
                .filter(|e| {
                    e.baby_id == baby_id
                        && !e.is_deleted()
                        && e.start_time.utc >= from
                        && e.start_time.utc <= to
                })
                .cloned()
                .collect(),
        ))
    }

    fn fetch_events(
        &self,
        baby_id: Uuid,
        include_deleted: bool,
    ) -> Result<Vec<Event>, StoreError> {
        let events = self.events.lock().unwrap();
        Ok(Self::sorted_desc(
            events
                .iter()
                .filter(|e| e.baby_id == baby_id && (include_deleted || !e.is_deleted()))
                .cloned()
                .collect(),
        ))
    }

    fn create(&self, event: &Event) -> Result<Event, StoreError> {
        self.check_writable()?;
        self.events.lock().unwrap().push(event.clone());
        Ok(event.clone())
    }

    fn update(&self, event: &Event) -> Result<Event, StoreError> {
        self.check_writable()?;
        let mut events = self.events.lock().unwrap();
        let stored = events
            .iter_mut()
            .find(|e| e.id == event.id)
            .ok_or(StoreError::NotFound {
                entity: "event",
                id: event.id,
            })?;
        *stored = event.clone();
        Ok(event.clone())
    }

    fn soft_delete(&self, event: &Event, deleted_at: DateTime<Utc>) -> Result<Event, StoreError> {
        let mut deleted = event.clone();
        deleted.deleted_at = Some(deleted_at);
        deleted.updated_at = deleted_at;
        EventStore::update(self, &deleted)
    }

    fn hard_delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut events = self.events.lock().unwrap();
        let before = events.len();
        events.retain(|e| e.id != id);
        if events.len() == before {
            return Err(StoreError::NotFound { entity: "event", id });
        }
        Ok(())
    }
}

impl BabyStore for MemoryStore {
    fn create(&self, baby: &Baby) -> Result<Baby, StoreError> {
        self.check_writable()?;
        self.babies.lock().unwrap().push(baby.clone());
        Ok(baby.clone())
    }

    fn fetch(&self, id: Uuid) -> Result<Baby, StoreError> {
        self.babies
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or(StoreError::NotFound { entity: "baby", id })
    }

    fn update(&self, baby: &Baby) -> Result<Baby, StoreError> {
        self.check_writable()?;
        let mut babies = self.babies.lock().unwrap();
        let stored = babies
            .iter_mut()
            .find(|b| b.id == baby.id)
            .ok_or(StoreError::NotFound {
                entity: "baby",
                id: baby.id,
            })?;
        *stored = baby.clone();
        Ok(baby.clone())
    }
}

/// Clock fixed to a settable instant, in a fixed timezone.
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
    timezone_id: String,
    offset_seconds: i32,
}

impl FixedClock {
    /// A UTC clock starting at the given ISO-8601 instant.
    pub fn at(iso: &str) -> Self {
        Self {
            now: Mutex::new(iso.parse().expect("valid ISO-8601 instant")),
            timezone_id: "UTC".to_string(),
            offset_seconds: 0,
        }
    }

    /// A clock in a specific timezone offset.
    pub fn at_offset(iso: &str, timezone_id: &str, offset_seconds: i32) -> Self {
        Self {
            now: Mutex::new(iso.parse().expect("valid ISO-8601 instant")),
            timezone_id: timezone_id.to_string(),
            offset_seconds,
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        Timestamp::new(
            *self.now.lock().unwrap(),
            self.timezone_id.clone(),
            self.offset_seconds,
        )
    }
}
