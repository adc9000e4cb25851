use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;
use tracing::info;

use congregation_reports::config::{Cli, Command};
use congregation_reports::{
    count_members, count_reports, filter_options, import_members, insert_reports, load_members_csv,
    load_reports_csv, logging, open_database, Month, MonthRange, ReportEngine, ReportFilters,
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Err(e) = cli.common.validate() {
        bail!(e);
    }
    logging::init(&cli.common.log_level);

    let db_path = cli.common.database.as_path();

    match cli.command {
        Command::Init => {
            let conn = open_database(db_path)?;
            info!(path = ?db_path, "database initialized");
            print_counts(&conn)?;
        }
        Command::ImportMembers { path } => {
            let conn = open_database(db_path)?;
            let rows = load_members_csv(&path)?;
            let inserted = import_members(&conn, &rows)?;
            println!("Imported {} of {} members", inserted, rows.len());
            print_counts(&conn)?;
        }
        Command::ImportReports { path } => {
            let conn = open_database(db_path)?;
            let reports = load_reports_csv(&path)?;
            let inserted = insert_reports(&conn, &reports)?;
            println!("Imported {} of {} reports", inserted, reports.len());
            print_counts(&conn)?;
        }
        Command::Report {
            start,
            end,
            filter_type,
            filter_value,
            generated_by,
        } => {
            let conn = open_existing(db_path)?;
            let end = end.unwrap_or_else(current_month);
            let filters = ReportFilters::parse(&start, &end, &filter_type, filter_value.as_deref())?;
            let report = ReportEngine::new(&conn).generate_field_service_report(&filters, &generated_by)?;
            print_json(&report)?;
        }
        Command::Pioneers {
            start,
            end,
            generated_by,
        } => {
            let conn = open_existing(db_path)?;
            let end = end.unwrap_or_else(current_month);
            let range = MonthRange::parse(&start, &end)?;
            let report = ReportEngine::new(&conn).generate_pioneer_summary_report(&range, &generated_by)?;
            print_json(&report)?;
        }
        Command::FilterOptions => {
            let conn = open_existing(db_path)?;
            print_json(&filter_options(&conn)?)?;
        }
    }

    Ok(())
}

/// Reports never create an empty database behind the user's back
fn open_existing(path: &Path) -> Result<Connection> {
    if !path.exists() {
        bail!(
            "Database not found at {:?}. Run `congregation-reports init` and import members first.",
            path
        );
    }
    open_database(path)
}

fn current_month() -> String {
    Month::of(Utc::now().date_naive()).to_string()
}

fn print_counts(conn: &Connection) -> Result<()> {
    println!(
        "Database contains {} members and {} reports",
        count_members(conn)?,
        count_reports(conn)?
    );
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize report")?;
    println!("{}", json);
    Ok(())
}
