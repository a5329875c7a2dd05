//! Baby registration and settings commands.

use anyhow::{Result, bail};
use chrono::NaiveDate;
use uuid::Uuid;

use bt_core::{Baby, BabySettings, BabyStore, Clock, SystemClock};
use bt_db::Database;

use super::util;

pub fn add(db: &Database, name: &str, birth_date: NaiveDate) -> Result<()> {
    if let Some(existing) = db.first_baby()? {
        bail!(
            "{} is already registered; use `bt baby set` to change settings",
            existing.name
        );
    }

    // Whoever registers the baby becomes the primary caregiver.
    let baby = Baby::new(name, birth_date, Uuid::new_v4(), SystemClock.instant());
    BabyStore::create(db, &baby)?;
    println!("Registered {} (born {})", baby.name, baby.birth_date);
    Ok(())
}

pub fn show(db: &Database) -> Result<()> {
    let baby = util::require_baby(db)?;
    let today = SystemClock.instant().date_naive();

    println!(
        "{} (born {}, {} days old)",
        baby.name,
        baby.birth_date,
        baby.age_in_days(today)
    );
    println!(
        "Default bottle size: {}",
        baby.settings
            .display_amount(baby.settings.default_bottle_size_oz)
    );
    println!(
        "Refrigerated shelf life: {}h",
        baby.settings.refrigerated_expiry_hours
    );
    println!(
        "Units: {}",
        if baby.settings.use_metric_units {
            "metric"
        } else {
            "imperial"
        }
    );
    Ok(())
}

pub fn set(
    db: &Database,
    bottle_size: Option<f64>,
    expiry_hours: Option<i64>,
    metric: Option<bool>,
) -> Result<()> {
    let mut baby = util::require_baby(db)?;
    let current = baby.settings.clone();
    baby.settings = BabySettings::new(
        bottle_size.unwrap_or(current.default_bottle_size_oz),
        expiry_hours.unwrap_or(current.refrigerated_expiry_hours),
        metric.unwrap_or(current.use_metric_units),
    );
    BabyStore::update(db, &baby)?;

    println!(
        "Settings updated: {} bottles, {}h refrigerated shelf life",
        baby.settings
            .display_amount(baby.settings.default_bottle_size_oz),
        baby.settings.refrigerated_expiry_hours
    );
    Ok(())
}
