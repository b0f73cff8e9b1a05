use std::io;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use wt_cli::commands::{audit, clear_day, daily, employee, events, import, punch, stats, util};
use wt_cli::{Cli, Commands, Config, EmployeeAction, EventsAction};
use wt_core::{ReportContext, TimeBase};
use wt_db::Database;

/// Open the configured database, ensuring the parent directory exists.
fn open_database(config: &Config) -> Result<Database> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    let db = Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?
        .with_audit_capacity(config.audit_capacity);
    Ok(db)
}

fn resolve_now(raw: Option<&str>, timebase: &TimeBase) -> Result<DateTime<Utc>> {
    let wall = Utc::now();
    match raw {
        Some(raw) => util::parse_instant(raw, timebase, wall).context("invalid --now"),
        None => Ok(wall),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config =
        Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    let timebase = config.timebase()?;
    let now = resolve_now(cli.now.as_deref(), &timebase)?;
    let ctx = ReportContext {
        now,
        timebase,
        options: config.reconstruct_options(),
    };

    let mut db = open_database(&config)?;
    let mut out = io::stdout().lock();

    match command {
        Commands::Employee(action) => match action {
            EmployeeAction::Add { name, uid } => {
                employee::add(&mut out, &mut db, &config, name, uid)?;
            }
            EmployeeAction::List { all, json } => employee::list(&mut out, &db, *all, *json)?,
            EmployeeAction::Deactivate { id } => {
                employee::set_active(&mut out, &mut db, &config, *id, false)?;
            }
            EmployeeAction::Activate { id } => {
                employee::set_active(&mut out, &mut db, &config, *id, true)?;
            }
        },
        Commands::Punch(args) => {
            punch::run(&mut out, &mut db, &config, args, &timebase, now)?;
        }
        Commands::Import => {
            let stdin = io::stdin();
            import::run(stdin.lock(), &mut out, &mut db, &config, &timebase, now)?;
        }
        Commands::ClearDay { employee, date } => {
            clear_day::run(&mut out, &mut db, &config, &timebase, *employee, *date)?;
        }
        Commands::Stats { employee, json } => {
            stats::run(&mut out, &db, *employee, &ctx, *json)?;
        }
        Commands::Daily(args) => {
            daily::run(&mut out, &db, args, &ctx)?;
        }
        Commands::Events(action) => match action {
            EventsAction::Day {
                employee,
                date,
                manual,
                json,
            } => {
                events::day(&mut out, &db, &timebase, *employee, *date, *manual, *json)?;
            }
            EventsAction::Manual { limit, json } => {
                events::manual(&mut out, &db, &timebase, *limit, *json)?;
            }
            EventsAction::Delete { id } => {
                events::delete(&mut out, &mut db, &config, &timebase, *id)?;
            }
        },
        Commands::Audit(args) => audit::run(&mut out, &db, args, &timebase)?,
    }

    Ok(())
}
