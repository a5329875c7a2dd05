//! Core domain logic for the baby tracker.
//!
//! This crate contains the fundamental types and logic for:
//! - Event model: sleep/feed/diaper events with per-category payloads
//! - Bottle lifecycle: derived state and expiry computation
//! - Validation: single-active-session invariants per category
//! - Orchestration: the use-case layer with cached active-state projections
//! - Prediction: age-bracketed, personalized wake-window forecasting
//!
//! Persistence and the current time are injected through the [`store`] and
//! [`timestamp::Clock`] traits; `bt-db` provides the `rusqlite` store.

pub mod baby;
pub mod bottle;
pub mod event;
pub mod notify;
pub mod predict;
pub mod store;
pub mod timestamp;
pub mod tracker;
pub mod validate;

#[cfg(test)]
pub(crate) mod testutil;

pub use baby::{Baby, BabySettings, CaregiverRole};
pub use bottle::{BottleState, WarningLevel, expiry_deadline, time_until_expiry, warning_level};
pub use event::{
    DiaperContents, DiaperData, Event, EventCategory, EventPayload, FeedData, SleepData,
};
pub use notify::{ExpiryReminder, ExpiryScheduler, QuietHours, ReminderDispatcher};
pub use predict::{NapPrediction, PredictionConfidence, WakeWindowPredictor};
pub use store::{BabyStore, EventStore, StoreError};
pub use timestamp::{Clock, SystemClock, Timestamp};
pub use tracker::{EventTracker, SleepToggle, TrackerError, TrackerRegistry};
pub use validate::{FeedingValidator, SleepValidator, ValidationError};
