//! Status command: one-screen summary of the baby's current state.

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;

use bt_core::{Clock, EventCategory, EventStore, SystemClock, time_until_expiry, warning_level};
use bt_db::Database;

use super::util;
use crate::Config;

pub fn run<W: Write>(writer: &mut W, db: &Arc<Database>, config: &Config) -> Result<()> {
    let baby = util::require_baby(db)?;
    let tracker = util::tracker(db, &baby)?;
    let now = SystemClock.instant();
    let policy = baby.settings.refrigerated_expiry_hours;

    writeln!(
        writer,
        "{} ({} days old)",
        baby.name,
        baby.age_in_days(now.date_naive())
    )?;
    writeln!(writer, "Database: {}", config.database_path.display())?;

    match tracker.active_sleep() {
        Some(sleep) => writeln!(
            writer,
            "Asleep for {}m (since {})",
            sleep.active_duration(now).num_minutes(),
            util::local_time(&sleep.start_time)
        )?,
        None => writeln!(writer, "Awake")?,
    }

    if let Some(feeding) = tracker.active_feeding() {
        if let Some(data) = feeding.feed_data() {
            writeln!(
                writer,
                "Feeding in progress: {} bottle {}",
                baby.settings.display_amount(data.amount_prepared_oz),
                util::short_id(feeding.id)
            )?;
        }
    }

    let prepared = tracker.prepared_bottles();
    writeln!(writer, "Prepared bottles: {}", prepared.len())?;
    for event in prepared {
        if let Some(data) = event.feed_data() {
            let level = warning_level(&event.start_time, data, policy, now);
            let remaining = time_until_expiry(&event.start_time, data, policy, now)
                .map_or_else(|| "-".to_string(), |d| format!("{}m left", d.num_minutes()));
            writeln!(
                writer,
                "- {} {}  {} ({})",
                util::short_id(event.id),
                baby.settings.display_amount(data.amount_prepared_oz),
                remaining,
                util::warning_label(level)
            )?;
        }
    }

    let events = db.fetch_events(baby.id, false)?;
    if let Some(diaper) = events
        .iter()
        .find(|e| e.category() == EventCategory::Diaper)
    {
        if let Some(data) = diaper.diaper_data() {
            writeln!(
                writer,
                "Last diaper: {} at {}",
                data.contents,
                util::local_time(&diaper.start_time)
            )?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, NaiveDate, Utc};
    use uuid::Uuid;

    use bt_core::{Baby, BabyStore, Event, EventPayload, SleepData, Timestamp};

    #[test]
    fn status_reports_active_sleep_and_bottles() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let baby = Baby::new(
            "Robin",
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            Uuid::new_v4(),
            Utc::now(),
        );
        BabyStore::create(db.as_ref(), &baby).unwrap();

        let sleep = Event::new(
            baby.id,
            baby.primary_caregiver_id,
            Timestamp::from_utc(Utc::now() - Duration::minutes(30)),
            EventPayload::Sleep(SleepData::default()),
        );
        EventStore::create(db.as_ref(), &sleep).unwrap();

        let config = Config::default();
        let mut output = Vec::new();
        run(&mut output, &db, &config).unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("Robin"));
        assert!(output.contains("Asleep for 30m"));
        assert!(output.contains("Prepared bottles: 0"));
    }

    #[test]
    fn status_without_baby_gives_registration_hint() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let mut output = Vec::new();
        let err = run(&mut output, &db, &Config::default()).unwrap_err();
        assert!(err.to_string().contains("bt baby add"));
    }
}
