//! Events command: dumps the baby's events as JSONL.

use std::sync::Arc;

use anyhow::Result;

use bt_core::EventStore;
use bt_db::Database;

use super::util;

pub fn run(db: &Arc<Database>, include_deleted: bool) -> Result<()> {
    let baby = util::require_baby(db)?;
    let events = db.fetch_events(baby.id, include_deleted)?;

    for event in events {
        let json = serde_json::to_string(&event)?;
        println!("{json}");
    }
    Ok(())
}
