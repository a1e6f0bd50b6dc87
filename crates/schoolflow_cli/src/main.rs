//! Operator CLI for the attendance core.
//!
//! # Responsibility
//! - Verify core crate wiring (`ping`).
//! - Reset a database to the demo data set (`seed`).
//! - Print row counts of an existing database (`verify`).
//!
//! Output is `key=value` lines so scripts can grep it.

use chrono::Utc;
use clap::{Parser, Subcommand};
use log::error;
use schoolflow_core::db::open_db_with_timeout;
use schoolflow_core::{database_summary, init_logging, seed_demo_data, CoreConfig, DatabaseSummary};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "schoolflow", version, about = "SchoolFlow attendance core tools")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print core linkage info
    Ping,
    /// Replace all data with the demo roster, attendance and timetable
    Seed {
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print per-table row counts
    Verify {
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli.cmd) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=cli_failed module=cli status=error error={message}");
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cmd: Command) -> Result<(), String> {
    if let Command::Ping = cmd {
        println!("schoolflow_core ping={}", schoolflow_core::ping());
        println!("schoolflow_core version={}", schoolflow_core::core_version());
        return Ok(());
    }

    let config = CoreConfig::from_env().map_err(|err| err.to_string())?;
    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, log_dir).map_err(|err| err.to_string())?;
    }
    let conn =
        open_db_with_timeout(&config.db_path, config.busy_timeout()).map_err(|err| err.to_string())?;
    println!("db_path={}", config.db_path.display());

    match cmd {
        Command::Ping => Ok(()),
        Command::Seed { json } => {
            let zone = config.zone();
            let today = Utc::now().with_timezone(&zone).date_naive();
            let summary = seed_demo_data(&conn, today, zone).map_err(|err| err.to_string())?;
            println!("seeded_through={today}");
            print_summary(&summary, json)
        }
        Command::Verify { json } => {
            let summary = database_summary(&conn).map_err(|err| err.to_string())?;
            print_summary(&summary, json)
        }
    }
}

fn print_summary(summary: &DatabaseSummary, json: bool) -> Result<(), String> {
    if json {
        let rendered = serde_json::to_string_pretty(summary).map_err(|err| err.to_string())?;
        println!("{rendered}");
        return Ok(());
    }
    println!("users={}", summary.users);
    println!("students={}", summary.students);
    println!("subjects={}", summary.subjects);
    println!("attendance={}", summary.attendance);
    println!("timetable={}", summary.timetable);
    Ok(())
}
