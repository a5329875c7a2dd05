//! Wake-window prediction.
//!
//! Predicts the next nap window by blending an age-bracketed population
//! default with a rolling personalized average over the last two weeks of
//! sleep history, then nudging for time of day. Deterministic for fixed
//! inputs; all constants are behavioral and preserved exactly, including the
//! truncating integer arithmetic.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::baby::Baby;
use crate::event::{Event, EventCategory};
use crate::store::{EventStore, StoreError};
use crate::timestamp::{Clock, Timestamp};

/// Trailing window for the personalized average, in days.
pub const ROLLING_WINDOW_DAYS: i64 = 14;

/// Minimum sleep duration that counts as a successful sleep.
const MIN_SLEEP_MINUTES: i64 = 20;

/// Qualifying sleeps required before personalization applies at all.
const MIN_DATA_POINTS: usize = 5;

/// Wake-window gaps contributing to the average required for high confidence.
const HIGH_CONFIDENCE_POINTS: usize = 10;

/// Age thresholds (in days) where the default bracket changes.
const TRANSITION_DAYS: [i64; 7] = [28, 84, 120, 210, 300, 420, 540];

/// Days over which a bracket transition is smoothed.
const TRANSITION_SPAN_DAYS: i64 = 7;

/// Self-reported reliability of a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionConfidence {
    /// Personalized with at least ten contributing wake windows.
    High,
    /// Population defaults, or personalization on thin data.
    Learning,
}

/// A predicted nap window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NapPrediction {
    pub baby_id: Uuid,
    /// Earliest predicted nap start.
    pub predicted_start: DateTime<Utc>,
    /// Latest predicted nap start.
    pub predicted_end: DateTime<Utc>,
    /// The adjusted wake-window bounds in minutes.
    pub window_minutes: (i64, i64),
    pub confidence: PredictionConfidence,
    /// Wake-window gaps that contributed to personalization (0 if none).
    pub based_on_data_points: usize,
    /// Human-readable justification for the window.
    pub explanation: String,
}

/// Rolling personalized average computed from sleep history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersonalizedWindow {
    /// Average wake-window length in whole minutes.
    pub avg_minutes: i64,
    /// Number of gaps that contributed.
    pub data_points: usize,
}

/// Default wake-window range in minutes for a baby's age.
///
/// Brackets are keyed by whole weeks (`days / 7`) then whole months
/// (`days / 30`).
pub fn age_based_range(age_days: i64) -> (i64, i64) {
    let weeks = age_days / 7;
    let months = age_days / 30;

    if weeks < 4 {
        (30, 60)
    } else if weeks < 12 {
        (60, 90)
    } else if months < 4 {
        (75, 120)
    } else if months < 7 {
        (120, 180)
    } else if months < 10 {
        (150, 210)
    } else if months < 14 {
        (180, 240)
    } else if months < 18 {
        (240, 360)
    } else {
        (300, 420)
    }
}

/// Age-based range with bracket transitions smoothed over seven days.
///
/// Within seven days after a threshold the previous bracket blends into the
/// current one: `old_weight = 1 - progress*0.8`, `new_weight =
/// progress*0.8 + 0.2`. The weights intentionally do not sum to one at the
/// edges; the curve is preserved from the source behavior rather than
/// renormalized.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    reason = "truncating minute arithmetic is the specified behavior"
)]
pub fn blended_range(age_days: i64) -> (i64, i64) {
    let current = age_based_range(age_days);

    let Some(&threshold) = TRANSITION_DAYS
        .iter()
        .find(|&&t| age_days >= t && age_days - t < TRANSITION_SPAN_DAYS)
    else {
        return current;
    };

    let progress = (age_days - threshold) as f64 / TRANSITION_SPAN_DAYS as f64;
    let previous = age_based_range(age_days - TRANSITION_SPAN_DAYS);

    let old_weight = progress.mul_add(-0.8, 1.0);
    let new_weight = progress.mul_add(0.8, 0.2);

    (
        (previous.0 as f64).mul_add(old_weight, current.0 as f64 * new_weight) as i64,
        (previous.1 as f64).mul_add(old_weight, current.1 as f64 * new_weight) as i64,
    )
}

/// Computes the personalized wake-window average from sleep history.
///
/// Keeps sleeps of at least twenty minutes, requires at least five of them,
/// measures the gap from each sleep's end to the next sleep's start, and
/// discards gaps outside fifteen minutes to eight hours as noise (missed
/// logging, overnight stretches).
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    reason = "truncating minute arithmetic is the specified behavior"
)]
pub fn personalized_window(events: &[Event]) -> Option<PersonalizedWindow> {
    let mut sleeps: Vec<&Event> = events
        .iter()
        .filter(|e| e.category() == EventCategory::Sleep && !e.is_deleted())
        .filter(|e| {
            e.duration()
                .is_some_and(|d| d >= Duration::minutes(MIN_SLEEP_MINUTES))
        })
        .collect();
    sleeps.sort_by_key(|e| e.start_time.utc);

    if sleeps.len() < MIN_DATA_POINTS {
        return None;
    }

    let mut gaps: Vec<Duration> = Vec::new();
    for pair in sleeps.windows(2) {
        let Some(previous_end) = &pair[0].end_time else {
            continue;
        };
        let gap = previous_end.duration_until(&pair[1].start_time);
        if gap >= Duration::minutes(15) && gap <= Duration::hours(8) {
            gaps.push(gap);
        }
    }

    if gaps.is_empty() {
        return None;
    }

    let total_seconds: i64 = gaps.iter().map(Duration::num_seconds).sum();
    let avg_seconds = total_seconds as f64 / gaps.len() as f64;
    Some(PersonalizedWindow {
        avg_minutes: (avg_seconds / 60.0) as i64,
        data_points: gaps.len(),
    })
}

/// Blends the age-based range with a personalized average, when available.
///
/// The average is clamped to `[0.8 * age_min, 1.2 * age_max]` to bound drift
/// from population norms, then spread into a range of plus/minus 15%.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    reason = "truncating minute arithmetic is the specified behavior"
)]
fn blend_ranges(age_range: (i64, i64), personalized: Option<&PersonalizedWindow>) -> (i64, i64) {
    let Some(personal) = personalized else {
        return age_range;
    };

    let floor = (age_range.0 as f64 * 0.8) as i64;
    let ceiling = (age_range.1 as f64 * 1.2) as i64;
    let clamped_avg = personal.avg_minutes.min(ceiling).max(floor);

    const SPREAD: f64 = 0.15;
    (
        (clamped_avg as f64 * (1.0 - SPREAD)) as i64,
        (clamped_avg as f64 * (1.0 + SPREAD)) as i64,
    )
}

/// Multiplier applied to both bounds based on the local hour of the last wake.
///
/// Early wakes run shorter wake windows; evening wakes run longer.
fn time_of_day_adjustment(local_hour: u32) -> f64 {
    if local_hour < 9 {
        0.9
    } else if local_hour >= 17 {
        1.1
    } else {
        1.0
    }
}

/// Predicts the next nap window for a baby.
pub struct WakeWindowPredictor<S: EventStore, C: Clock> {
    store: Arc<S>,
    clock: Arc<C>,
}

impl<S: EventStore, C: Clock> WakeWindowPredictor<S, C> {
    pub const fn new(store: Arc<S>, clock: Arc<C>) -> Self {
        Self { store, clock }
    }

    /// Computes the predicted nap window following `last_wake`.
    ///
    /// Pure given the baby, the last wake time, the stored sleep history, and
    /// the clock; repeated calls with the same inputs produce the same window.
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        reason = "truncating minute arithmetic is the specified behavior"
    )]
    pub fn predict_next_nap(
        &self,
        baby: &Baby,
        last_wake: &Timestamp,
    ) -> Result<NapPrediction, StoreError> {
        let now = self.clock.instant();
        let age_days = baby.age_in_days(now.date_naive());
        let age_range = blended_range(age_days);

        let history = self.store.fetch_events_in_range(
            baby.id,
            now - Duration::days(ROLLING_WINDOW_DAYS),
            now,
        )?;
        let personalized = personalized_window(&history);

        let (min_minutes, max_minutes) = blend_ranges(age_range, personalized.as_ref());

        let adjustment = time_of_day_adjustment(last_wake.local_hour());
        let adjusted_min = (min_minutes as f64 * adjustment) as i64;
        let adjusted_max = (max_minutes as f64 * adjustment) as i64;

        let confidence = match personalized {
            Some(p) if p.data_points >= HIGH_CONFIDENCE_POINTS => PredictionConfidence::High,
            _ => PredictionConfidence::Learning,
        };

        let explanation = explanation(baby, age_days, personalized.as_ref());
        tracing::debug!(
            baby_id = %baby.id,
            age_days,
            adjusted_min,
            adjusted_max,
            personalized = personalized.is_some(),
            "nap window predicted"
        );

        Ok(NapPrediction {
            baby_id: baby.id,
            predicted_start: last_wake.utc + Duration::minutes(adjusted_min),
            predicted_end: last_wake.utc + Duration::minutes(adjusted_max),
            window_minutes: (adjusted_min, adjusted_max),
            confidence,
            based_on_data_points: personalized.map_or(0, |p| p.data_points),
            explanation,
        })
    }
}

/// Human-readable age (e.g. "3 months", "6 weeks", "4 days").
fn age_display(age_days: i64) -> String {
    let months = age_days / 30;
    let weeks = age_days / 7;
    if months >= 2 {
        format!("{months} months")
    } else if weeks >= 1 {
        format!("{weeks} {}", if weeks == 1 { "week" } else { "weeks" })
    } else {
        format!("{age_days} {}", if age_days == 1 { "day" } else { "days" })
    }
}

fn format_minutes(minutes: i64) -> String {
    let hours = minutes / 60;
    let mins = minutes % 60;
    if hours > 0 {
        format!("{hours}h {mins}m")
    } else {
        format!("{mins}m")
    }
}

fn explanation(baby: &Baby, age_days: i64, personalized: Option<&PersonalizedWindow>) -> String {
    let age = age_display(age_days);
    personalized.map_or_else(
        || {
            format!(
                "Based on typical wake windows at {age}. Predictions will improve as {}'s patterns are learned.",
                baby.name
            )
        },
        |personal| {
            format!(
                "Based on {}'s age ({age}) and an average wake window of {} over the last two weeks.",
                baby.name,
                format_minutes(personal.avg_minutes)
            )
        },
    )
}
