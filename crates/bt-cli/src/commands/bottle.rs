//! Bottle preparation and feeding commands.

use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use bt_core::{
    Baby, Clock, Event, EventTracker, ExpiryScheduler, FeedData, SystemClock, expiry_deadline,
    time_until_expiry, warning_level,
};
use bt_db::Database;

use super::util;
use crate::Config;

pub fn prepare(
    db: &Arc<Database>,
    config: &Config,
    amount: Option<f64>,
    refrigerated: bool,
) -> Result<()> {
    let baby = util::require_baby(db)?;
    let mut tracker = util::tracker(db, &baby)?;

    let amount = amount.unwrap_or(baby.settings.default_bottle_size_oz);
    let event = tracker
        .prepare_bottle(amount, refrigerated)
        .map_err(util::explain)?;

    let policy = baby.settings.refrigerated_expiry_hours;
    println!(
        "Prepared {} bottle {}{}",
        baby.settings.display_amount(amount),
        util::short_id(event.id),
        if refrigerated { " (refrigerated)" } else { "" }
    );
    if let Some(data) = event.feed_data() {
        if let Some(deadline) = expiry_deadline(&event.start_time, data, policy) {
            println!(
                "Expires at {}",
                util::local_instant(deadline, event.start_time.offset_seconds)
            );
        }
    }

    let scheduler = ExpiryScheduler::new(
        util::TracingDispatcher,
        SystemClock,
        Some(config.quiet_hours),
    );
    if let Some(fire_at) = scheduler.schedule_expiry_reminder(&event, policy) {
        println!(
            "Reminder at {}",
            util::local_instant(fire_at, event.start_time.offset_seconds)
        );
    }
    Ok(())
}

pub fn feed(db: &Arc<Database>, id: Option<Uuid>) -> Result<()> {
    let baby = util::require_baby(db)?;
    let mut tracker = util::tracker(db, &baby)?;

    let bottle = select_prepared(&tracker, id)?;
    let event = tracker
        .start_feeding(&bottle, baby.settings.refrigerated_expiry_hours)
        .map_err(util::explain)?;
    println!("Feeding started from bottle {}", util::short_id(event.id));
    Ok(())
}

pub fn finish(db: &Arc<Database>, remaining: f64) -> Result<()> {
    let baby = util::require_baby(db)?;
    let mut tracker = util::tracker(db, &baby)?;

    let Some(active) = tracker.active_feeding().cloned() else {
        bail!("no feeding in progress; run `bt bottle feed` first");
    };
    let event = tracker
        .finish_feeding(&active, remaining)
        .map_err(util::explain)?;
    let consumed = event
        .feed_data()
        .and_then(FeedData::amount_consumed_oz)
        .unwrap_or_default();
    println!(
        "Feeding finished; {} consumed",
        baby.settings.display_amount(consumed)
    );
    Ok(())
}

pub fn discard(db: &Arc<Database>, id: Option<Uuid>) -> Result<()> {
    let baby = util::require_baby(db)?;
    let mut tracker = util::tracker(db, &baby)?;

    let bottle = match id {
        Some(id) => find_bottle(&tracker, id)?,
        None => tracker
            .prepared_bottles()
            .first()
            .cloned()
            .ok_or_else(|| anyhow!("no prepared bottles to discard"))?,
    };
    tracker.discard_bottle(&bottle).map_err(util::explain)?;
    println!("Discarded bottle {}", util::short_id(bottle.id));
    Ok(())
}

pub fn list(db: &Arc<Database>) -> Result<()> {
    let baby = util::require_baby(db)?;
    let tracker = util::tracker(db, &baby)?;
    let now = SystemClock.instant();
    let policy = baby.settings.refrigerated_expiry_hours;

    if tracker.prepared_bottles().is_empty() && tracker.active_feeding().is_none() {
        println!("No bottles in play.");
        return Ok(());
    }
    for event in tracker.prepared_bottles() {
        print_bottle(&baby, event, policy, now);
    }
    if let Some(feeding) = tracker.active_feeding() {
        print_bottle(&baby, feeding, policy, now);
    }
    Ok(())
}

fn print_bottle(baby: &Baby, event: &Event, policy_hours: i64, now: DateTime<Utc>) {
    let Some(data) = event.feed_data() else {
        return;
    };
    let level = warning_level(&event.start_time, data, policy_hours, now);
    let remaining = time_until_expiry(&event.start_time, data, policy_hours, now)
        .map_or_else(|| "-".to_string(), |d| format!("{}m left", d.num_minutes()));
    println!(
        "{}  {:<12}  {}  {} ({})",
        util::short_id(event.id),
        util::state_label(data.state()),
        baby.settings.display_amount(data.amount_prepared_oz),
        remaining,
        util::warning_label(level),
    );
}

/// Resolves the bottle to feed from: by ID, or the most recently prepared.
fn select_prepared(
    tracker: &EventTracker<Database, SystemClock>,
    id: Option<Uuid>,
) -> Result<Event> {
    match id {
        Some(id) => find_bottle(tracker, id),
        None => tracker.prepared_bottles().first().cloned().ok_or_else(|| {
            anyhow!("no prepared bottles; run `bt bottle prepare` first")
        }),
    }
}

fn find_bottle(tracker: &EventTracker<Database, SystemClock>, id: Uuid) -> Result<Event> {
    tracker
        .prepared_bottles()
        .iter()
        .find(|e| e.id == id)
        .cloned()
        .or_else(|| tracker.active_feeding().filter(|e| e.id == id).cloned())
        .ok_or_else(|| anyhow!("no bottle with id {id}; `bt bottle list` shows candidates"))
}
