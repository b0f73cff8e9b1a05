//! CLI subcommand implementations.

pub mod audit;
pub mod clear_day;
pub mod daily;
pub mod employee;
pub mod events;
pub mod import;
pub mod punch;
pub mod stats;
pub mod util;
