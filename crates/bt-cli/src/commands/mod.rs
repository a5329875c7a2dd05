//! CLI subcommand implementations.

pub mod baby;
pub mod bottle;
pub mod diaper;
pub mod events;
pub mod init;
pub mod predict;
pub mod sleep;
pub mod status;

mod util;
