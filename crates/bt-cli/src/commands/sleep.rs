//! Sleep session commands.

use std::sync::Arc;

use anyhow::{Result, bail};

use bt_core::SleepToggle;
use bt_db::Database;

use super::util;

pub fn start(db: &Arc<Database>) -> Result<()> {
    let baby = util::require_baby(db)?;
    let mut tracker = util::tracker(db, &baby)?;

    let event = tracker.start_sleep().map_err(util::explain)?;
    println!("Sleep started at {}", util::local_time(&event.start_time));
    Ok(())
}

pub fn end(db: &Arc<Database>) -> Result<()> {
    let baby = util::require_baby(db)?;
    let mut tracker = util::tracker(db, &baby)?;

    let Some(active) = tracker.active_sleep().cloned() else {
        bail!("no active sleep session; run `bt sleep start` first");
    };
    let ended = tracker.end_sleep(&active).map_err(util::explain)?;
    let minutes = ended.duration().map_or(0, |d| d.num_minutes());
    println!("Sleep ended after {minutes}m");
    Ok(())
}

pub fn toggle(db: &Arc<Database>) -> Result<()> {
    let baby = util::require_baby(db)?;
    let mut tracker = util::tracker(db, &baby)?;

    match tracker.toggle_sleep().map_err(util::explain)? {
        SleepToggle::Started(event) => {
            println!("Sleep started at {}", util::local_time(&event.start_time));
        }
        SleepToggle::Ended(event) => {
            let minutes = event.duration().map_or(0, |d| d.num_minutes());
            println!("Sleep ended after {minutes}m");
        }
    }
    Ok(())
}
