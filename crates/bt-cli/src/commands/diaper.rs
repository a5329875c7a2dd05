//! Diaper change command.

use std::sync::Arc;

use anyhow::Result;

use bt_core::DiaperContents;
use bt_db::Database;

use super::util;

pub fn run(db: &Arc<Database>, contents: DiaperContents) -> Result<()> {
    let baby = util::require_baby(db)?;
    let mut tracker = util::tracker(db, &baby)?;

    let event = tracker.log_diaper(contents).map_err(util::explain)?;
    println!(
        "Diaper change ({contents}) logged at {}",
        util::local_time(&event.start_time)
    );
    Ok(())
}
