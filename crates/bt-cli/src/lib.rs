//! Baby tracker CLI library.
//!
//! This crate provides the command-line interface over `bt-core` and `bt-db`.

mod cli;
pub mod commands;
mod config;

pub use cli::{BabyAction, BottleAction, Cli, Commands, DiaperKind, SleepAction};
pub use config::Config;
