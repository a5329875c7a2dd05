//! Caregiving event records with per-category payloads.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timestamp::Timestamp;
use crate::validate::ValidationError;

/// A tracked caregiving occurrence (sleep, feeding, or diaper change).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier for this event.
    pub id: Uuid,
    /// The baby this event belongs to.
    pub baby_id: Uuid,
    /// The caregiver who logged it.
    pub logged_by: Uuid,
    /// When the event started.
    pub start_time: Timestamp,
    /// When the event ended. `None` means the event is still in progress.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<Timestamp>,
    /// Category-specific payload. The category is derived from the variant,
    /// so a payload/category mismatch is unrepresentable.
    pub payload: EventPayload,
    /// Optional free-text notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker. Deleted events are excluded from active-state and
    /// prediction queries but retained for audit and export.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Event {
    /// Creates a new event with a fresh ID, starting at `start_time`.
    pub fn new(
        baby_id: Uuid,
        logged_by: Uuid,
        start_time: Timestamp,
        payload: EventPayload,
    ) -> Self {
        let created_at = start_time.utc;
        Self {
            id: Uuid::new_v4(),
            baby_id,
            logged_by,
            start_time,
            end_time: None,
            payload,
            notes: None,
            created_at,
            updated_at: created_at,
            deleted_at: None,
        }
    }

    /// The event category, derived from the payload variant.
    pub const fn category(&self) -> EventCategory {
        self.payload.category()
    }

    /// Whether this event is in progress: no end time and not soft-deleted.
    pub const fn is_active(&self) -> bool {
        self.end_time.is_none() && self.deleted_at.is_none()
    }

    /// Whether this event has been soft-deleted.
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Duration from start to end, if the event has ended.
    pub fn duration(&self) -> Option<Duration> {
        self.end_time
            .as_ref()
            .map(|end| self.start_time.duration_until(end))
    }

    /// Duration from start until `now`, for in-progress events.
    pub fn active_duration(&self, now: DateTime<Utc>) -> Duration {
        self.start_time.duration_until_instant(now)
    }

    /// The feed payload, if this is a feed event.
    pub const fn feed_data(&self) -> Option<&FeedData> {
        match &self.payload {
            EventPayload::Feed(data) => Some(data),
            _ => None,
        }
    }

    /// Mutable access to the feed payload, if this is a feed event.
    pub const fn feed_data_mut(&mut self) -> Option<&mut FeedData> {
        match &mut self.payload {
            EventPayload::Feed(data) => Some(data),
            _ => None,
        }
    }

    /// The diaper payload, if this is a diaper event.
    pub const fn diaper_data(&self) -> Option<&DiaperData> {
        match &self.payload {
            EventPayload::Diaper(data) => Some(data),
            _ => None,
        }
    }
}

/// The category of a caregiving event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Sleep,
    Feed,
    Diaper,
}

impl EventCategory {
    /// String representation for database storage.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sleep => "sleep",
            Self::Feed => "feed",
            Self::Diaper => "diaper",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EventCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sleep" => Ok(Self::Sleep),
            "feed" => Ok(Self::Feed),
            "diaper" => Ok(Self::Diaper),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}

/// Error for a category string that does not name a known category.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event category: {0}")]
pub struct UnknownCategory(pub String);

/// Category-specific event payload.
///
/// Stored as `{"type": ..., "data": ...}` so the discriminator survives
/// serialization alongside the variant fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum EventPayload {
    Sleep(SleepData),
    Feed(FeedData),
    Diaper(DiaperData),
}

impl EventPayload {
    /// The category this payload belongs to.
    pub const fn category(&self) -> EventCategory {
        match self {
            Self::Sleep(_) => EventCategory::Sleep,
            Self::Feed(_) => EventCategory::Feed,
            Self::Diaper(_) => EventCategory::Diaper,
        }
    }
}

/// Payload for sleep events.
///
/// Timing lives on the parent event's start/end, so there are no fields yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SleepData {}

/// Payload for bottle feeding events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedData {
    /// Amount of formula prepared, in ounces.
    pub amount_prepared_oz: f64,
    /// Amount left after feeding. `None` until the feeding is finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_remaining_oz: Option<f64>,
    /// When the baby started feeding from this bottle. `None` while prepared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feeding_started_at: Option<Timestamp>,
    /// Whether the bottle is stored in the refrigerator.
    pub is_refrigerated: bool,
}

impl FeedData {
    /// Creates a feed payload for a freshly prepared bottle.
    ///
    /// Fails with [`ValidationError::InvalidAmount`] unless the prepared
    /// amount is positive and finite.
    pub fn new(amount_prepared_oz: f64, is_refrigerated: bool) -> Result<Self, ValidationError> {
        if !amount_prepared_oz.is_finite() || amount_prepared_oz <= 0.0 {
            return Err(ValidationError::InvalidAmount {
                amount_oz: amount_prepared_oz,
            });
        }
        Ok(Self {
            amount_prepared_oz,
            amount_remaining_oz: None,
            feeding_started_at: None,
            is_refrigerated,
        })
    }

    /// Amount consumed (prepared minus remaining), once remaining is known.
    pub fn amount_consumed_oz(&self) -> Option<f64> {
        self.amount_remaining_oz
            .map(|remaining| self.amount_prepared_oz - remaining)
    }
}

/// Payload for diaper change events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiaperData {
    /// What was in the diaper.
    pub contents: DiaperContents,
}

/// What was found in the diaper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiaperContents {
    Wet,
    Dirty,
    Both,
}

impl DiaperContents {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wet => "wet",
            Self::Dirty => "dirty",
            Self::Both => "both",
        }
    }
}

impl fmt::Display for DiaperContents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DiaperContents {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wet" => Ok(Self::Wet),
            "dirty" => Ok(Self::Dirty),
            "both" => Ok(Self::Both),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}
