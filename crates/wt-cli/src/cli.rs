//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use wt_core::{Direction, EmployeeId};

/// Employee attendance tracker.
///
/// Records badge swipes and reconstructs worked time per local day, week and month.
#[derive(Debug, Parser)]
#[command(name = "wt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Evaluate reports as of this instant (ISO 8601 or e.g. "2 hours ago").
    #[arg(long, global = true)]
    pub now: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage employees.
    #[command(subcommand)]
    Employee(EmployeeAction),

    /// Record a badge swipe.
    Punch(PunchArgs),

    /// Import events from JSONL on stdin.
    Import,

    /// Delete all of an employee's events on one local day.
    ClearDay {
        /// Employee ID.
        employee: EmployeeId,

        /// Local date (YYYY-MM-DD).
        date: NaiveDate,
    },

    /// Show whole-history worked time, intervals and anomalies.
    Stats {
        /// Employee ID.
        employee: EmployeeId,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show daily, weekly and monthly worked time for a date range.
    Daily(DailyArgs),

    /// Inspect and correct stored events.
    #[command(subcommand)]
    Events(EventsAction),

    /// Show recent admin actions.
    Audit(AuditArgs),
}

/// Employee management actions.
#[derive(Debug, Subcommand)]
pub enum EmployeeAction {
    /// Register a new employee.
    Add {
        /// Full name.
        #[arg(long)]
        name: String,

        /// NFC badge UID.
        #[arg(long)]
        uid: String,
    },

    /// List employees.
    List {
        /// Include inactive employees.
        #[arg(long)]
        all: bool,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Stop accepting punches for an employee.
    Deactivate {
        /// Employee ID.
        id: EmployeeId,
    },

    /// Accept punches for an employee again.
    Activate {
        /// Employee ID.
        id: EmployeeId,
    },
}

/// Event inspection and manual-entry maintenance.
#[derive(Debug, Subcommand)]
pub enum EventsAction {
    /// List an employee's events on one local date.
    Day {
        /// Employee ID.
        employee: EmployeeId,

        /// Local date (YYYY-MM-DD).
        date: NaiveDate,

        /// Only show manual entries.
        #[arg(long)]
        manual: bool,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List the most recent manual entries.
    Manual {
        /// Maximum number of entries.
        #[arg(long, default_value_t = 20)]
        limit: usize,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Delete one manual entry. Terminal swipes cannot be deleted this way.
    Delete {
        /// Event ID.
        id: i64,
    },
}

#[derive(Debug, Args)]
pub struct PunchArgs {
    /// Employee ID.
    #[arg(long, conflicts_with = "uid", required_unless_present = "uid")]
    pub employee: Option<EmployeeId>,

    /// NFC badge UID.
    #[arg(long)]
    pub uid: Option<String>,

    /// IN or OUT. Derived from the event preceding the punch when omitted.
    #[arg(long)]
    pub direction: Option<Direction>,

    /// When the swipe happened (ISO 8601, local "YYYY-MM-DD HH:MM", or "N minutes ago").
    /// Makes the punch a manual entry.
    #[arg(long, requires = "comment")]
    pub at: Option<String>,

    /// Reason for a manual entry.
    #[arg(long, requires = "at")]
    pub comment: Option<String>,

    /// Event source label.
    #[arg(long, default_value = "cli")]
    pub source: String,
}

#[derive(Debug, Args)]
pub struct DailyArgs {
    /// Employee ID.
    #[arg(conflicts_with = "all", required_unless_present = "all")]
    pub employee: Option<EmployeeId>,

    /// Report every active employee.
    #[arg(long)]
    pub all: bool,

    /// First local date (YYYY-MM-DD), inclusive.
    #[arg(long)]
    pub from: NaiveDate,

    /// Last local date (YYYY-MM-DD), inclusive.
    #[arg(long)]
    pub to: NaiveDate,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct AuditArgs {
    /// Maximum number of entries.
    #[arg(long, default_value_t = 20)]
    pub limit: usize,

    /// Only show this action.
    #[arg(long)]
    pub action: Option<String>,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}
