//! Collaborator contracts for persistence.
//!
//! The core never talks to a concrete database; the orchestrator, validators,
//! and predictor are written against these traits. `bt-db` provides the
//! `rusqlite` implementation, and tests use an in-memory fake.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::baby::Baby;
use crate::event::{Event, EventCategory};

/// Errors surfaced by a store implementation.
///
/// Store failures are propagated unmodified; the core performs no retries,
/// and in-memory projections are updated only after a confirmed write.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested entity does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    /// The underlying storage backend failed.
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl StoreError {
    /// Wraps a backend error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(err))
    }
}

/// Persistence contract for caregiving events.
///
/// Query results are ordered by start time descending wherever ordering
/// matters, and exclude soft-deleted events unless stated otherwise.
pub trait EventStore: Send + Sync {
    /// Active (no end time, not deleted) events of one category for a baby.
    fn fetch_active_events(
        &self,
        baby_id: Uuid,
        category: EventCategory,
    ) -> Result<Vec<Event>, StoreError>;

    /// Non-deleted events whose start time falls within `[from, to]`.
    fn fetch_events_in_range(
        &self,
        baby_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Event>, StoreError>;

    /// All events for a baby, optionally including soft-deleted ones
    /// (audit/export path).
    fn fetch_events(&self, baby_id: Uuid, include_deleted: bool)
    -> Result<Vec<Event>, StoreError>;

    /// Persists a new event, returning the stored record.
    fn create(&self, event: &Event) -> Result<Event, StoreError>;

    /// Persists changes to an existing event. Fails with
    /// [`StoreError::NotFound`] if the event is absent.
    fn update(&self, event: &Event) -> Result<Event, StoreError>;

    /// Marks an event deleted without removing it.
    fn soft_delete(&self, event: &Event, deleted_at: DateTime<Utc>)
    -> Result<Event, StoreError>;

    /// Permanently removes an event. Explicit purge path that bypasses
    /// business rules; nothing in the orchestrator calls this.
    fn hard_delete(&self, id: Uuid) -> Result<(), StoreError>;
}

/// Persistence contract for baby records and their settings.
pub trait BabyStore: Send + Sync {
    fn create(&self, baby: &Baby) -> Result<Baby, StoreError>;

    /// Fails with [`StoreError::NotFound`] if the baby is absent.
    fn fetch(&self, id: Uuid) -> Result<Baby, StoreError>;

    /// Fails with [`StoreError::NotFound`] if the baby is absent.
    fn update(&self, baby: &Baby) -> Result<Baby, StoreError>;
}
