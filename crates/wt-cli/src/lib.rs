//! Attendance tracker CLI library.
//!
//! This crate provides the CLI interface for the attendance tracker.

mod cli;
pub mod commands;
mod config;

pub use cli::{AuditArgs, Cli, Commands, DailyArgs, EmployeeAction, EventsAction, PunchArgs};
pub use config::Config;
