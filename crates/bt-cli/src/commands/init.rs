//! Init command: create the data directory and database.

use anyhow::{Context, Result};

use crate::Config;

pub fn run(config: &Config) -> Result<()> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    bt_db::Database::open(&config.database_path).context("failed to open database")?;
    println!("Database ready at {}", config.database_path.display());
    Ok(())
}
