//! Nap prediction command.

use std::sync::Arc;

use anyhow::{Result, bail};

use bt_core::{
    Clock, EventCategory, EventStore, PredictionConfidence, SystemClock, WakeWindowPredictor,
};
use bt_db::Database;

use super::util;

pub fn run(db: &Arc<Database>) -> Result<()> {
    let baby = util::require_baby(db)?;
    let tracker = util::tracker(db, &baby)?;

    if let Some(active) = tracker.active_sleep() {
        bail!(
            "{} is asleep (since {}); predict again after waking",
            baby.name,
            util::local_time(&active.start_time)
        );
    }

    let clock = Arc::new(SystemClock);
    // Last wake is the end of the most recent finished sleep; with no sleep
    // history yet, assume the baby just woke.
    let last_wake = db
        .fetch_events(baby.id, false)?
        .iter()
        .filter(|e| e.category() == EventCategory::Sleep)
        .filter_map(|e| e.end_time.clone())
        .max_by_key(|t| t.utc)
        .unwrap_or_else(|| clock.now());

    let predictor = WakeWindowPredictor::new(Arc::clone(db), clock);
    let prediction = predictor.predict_next_nap(&baby, &last_wake)?;

    let (min, max) = prediction.window_minutes;
    println!(
        "Next nap window: {} - {}",
        util::local_instant(prediction.predicted_start, last_wake.offset_seconds),
        util::local_instant(prediction.predicted_end, last_wake.offset_seconds)
    );
    println!(
        "Wake window: {min}-{max} minutes ({} confidence, {} data points)",
        confidence_label(prediction.confidence),
        prediction.based_on_data_points
    );
    println!("{}", prediction.explanation);
    Ok(())
}

const fn confidence_label(confidence: PredictionConfidence) -> &'static str {
    match confidence {
        PredictionConfidence::High => "high",
        PredictionConfidence::Learning => "learning",
    }
}
