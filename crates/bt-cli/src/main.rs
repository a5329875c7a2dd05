use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use bt_cli::commands::{baby, bottle, diaper, events, init, predict, sleep, status};
use bt_cli::{BabyAction, BottleAction, Cli, Commands, Config, SleepAction};

/// Load config and open the database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(Arc<bt_db::Database>, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = bt_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((Arc::new(db), config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    match &cli.command {
        Some(Commands::Init) => {
            let config =
                Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
            init::run(&config)?;
        }
        Some(Commands::Baby { action }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            match action {
                BabyAction::Add { name, birth_date } => baby::add(&db, name, *birth_date)?,
                BabyAction::Show => baby::show(&db)?,
                BabyAction::Set {
                    bottle_size,
                    expiry_hours,
                    metric,
                } => baby::set(&db, *bottle_size, *expiry_hours, *metric)?,
            }
        }
        Some(Commands::Sleep { action }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            match action {
                SleepAction::Start => sleep::start(&db)?,
                SleepAction::End => sleep::end(&db)?,
                SleepAction::Toggle => sleep::toggle(&db)?,
            }
        }
        Some(Commands::Bottle { action }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            match action {
                BottleAction::Prepare {
                    amount,
                    refrigerated,
                } => bottle::prepare(&db, &config, *amount, *refrigerated)?,
                BottleAction::Feed { id } => bottle::feed(&db, *id)?,
                BottleAction::Finish { remaining } => bottle::finish(&db, *remaining)?,
                BottleAction::Discard { id } => bottle::discard(&db, *id)?,
                BottleAction::List => bottle::list(&db)?,
            }
        }
        Some(Commands::Diaper { contents }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            diaper::run(&db, (*contents).into())?;
        }
        Some(Commands::Status) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            status::run(&mut std::io::stdout(), &db, &config)?;
        }
        Some(Commands::Predict) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            predict::run(&db)?;
        }
        Some(Commands::Events { include_deleted }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            events::run(&db, *include_deleted)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
