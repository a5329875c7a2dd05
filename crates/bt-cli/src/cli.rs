//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use uuid::Uuid;

use bt_core::DiaperContents;

/// Baby caregiving tracker.
///
/// Logs sleep, bottle feeding, and diaper events, tracks bottle expiry, and
/// predicts the next nap window from age defaults and the baby's own history.
#[derive(Debug, Parser)]
#[command(name = "bt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create the data directory and database.
    Init,

    /// Manage the baby record and its settings.
    Baby {
        #[command(subcommand)]
        action: BabyAction,
    },

    /// Log sleep sessions.
    Sleep {
        #[command(subcommand)]
        action: SleepAction,
    },

    /// Manage bottles and feedings.
    Bottle {
        #[command(subcommand)]
        action: BottleAction,
    },

    /// Log a diaper change.
    Diaper {
        /// What was in the diaper.
        #[arg(value_enum)]
        contents: DiaperKind,
    },

    /// Show current tracking status.
    Status,

    /// Predict the next nap window.
    Predict,

    /// Dump the baby's events as JSONL.
    Events {
        /// Include soft-deleted events.
        #[arg(long)]
        include_deleted: bool,
    },
}

/// Baby record management.
#[derive(Debug, Subcommand)]
pub enum BabyAction {
    /// Register a baby.
    Add {
        /// The baby's name.
        #[arg(long)]
        name: String,

        /// Birth date (YYYY-MM-DD).
        #[arg(long)]
        birth_date: NaiveDate,
    },

    /// Show the baby record and settings.
    Show,

    /// Update settings. Omitted flags keep their current value.
    Set {
        /// Default bottle size in ounces.
        #[arg(long)]
        bottle_size: Option<f64>,

        /// Refrigerated bottle shelf life in hours (clamped to 1-24).
        #[arg(long)]
        expiry_hours: Option<i64>,

        /// Display amounts in milliliters instead of ounces.
        #[arg(long)]
        metric: Option<bool>,
    },
}

/// Sleep session actions.
#[derive(Debug, Subcommand)]
pub enum SleepAction {
    /// Start a sleep session.
    Start,

    /// End the active sleep session.
    End,

    /// Start a session, or end the active one.
    Toggle,
}

/// Bottle and feeding actions.
#[derive(Debug, Subcommand)]
pub enum BottleAction {
    /// Prepare a new bottle.
    Prepare {
        /// Amount in ounces. Defaults to the configured bottle size.
        #[arg(long)]
        amount: Option<f64>,

        /// Store the bottle in the refrigerator.
        #[arg(long)]
        refrigerated: bool,
    },

    /// Start feeding from a prepared bottle.
    Feed {
        /// Bottle event ID. Defaults to the most recently prepared bottle.
        id: Option<Uuid>,
    },

    /// Finish the active feeding.
    Finish {
        /// Ounces left in the bottle.
        remaining: f64,
    },

    /// Discard a bottle without feeding it.
    Discard {
        /// Bottle event ID. Defaults to the most recently prepared bottle.
        id: Option<Uuid>,
    },

    /// List prepared bottles and the active feeding.
    List,
}

/// Diaper contents as a CLI value.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DiaperKind {
    Wet,
    Dirty,
    Both,
}

impl From<DiaperKind> for DiaperContents {
    fn from(kind: DiaperKind) -> Self {
        match kind {
            DiaperKind::Wet => Self::Wet,
            DiaperKind::Dirty => Self::Dirty,
            DiaperKind::Both => Self::Both,
        }
    }
}
