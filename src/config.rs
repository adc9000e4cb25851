//! Configuration for the CLI and the API server
//!
//! Command line arguments with environment fallbacks, using clap.

use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Settings shared by every binary
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// SQLite database file
    #[arg(long, env = "CONGREGATION_DB", default_value = "congregation.db", global = true)]
    pub database: PathBuf,

    /// Log level (trace, debug, info, warn, error); RUST_LOG overrides it
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,
}

impl CommonArgs {
    pub fn validate(&self) -> Result<(), String> {
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(format!(
                "invalid log level '{}': expected one of {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            ));
        }
        Ok(())
    }
}

/// Field service reporting for a congregation
#[derive(Parser, Debug, Clone)]
#[command(name = "congregation-reports")]
#[command(about = "Field service and pioneer reports over a congregation database")]
pub struct Cli {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the database schema
    Init,

    /// Import members from CSV
    /// (id,name,date_of_birth,baptism_date,gender,role,group,privileges)
    ImportMembers { path: PathBuf },

    /// Import field service reports from CSV
    /// (publisher_id,month,hours,bible_students,auxiliary_pioneer,comments)
    ImportReports { path: PathBuf },

    /// Field service report for a filtered member set
    Report {
        /// First month (YYYY-MM)
        #[arg(long)]
        start: String,

        /// Last month (YYYY-MM), defaults to the current month
        #[arg(long)]
        end: Option<String>,

        /// all, role, group, privilege or member
        #[arg(long, default_value = "all")]
        filter_type: String,

        /// Role name, group id, privilege id or member id
        #[arg(long)]
        filter_value: Option<String>,

        /// Who the report is generated for
        #[arg(long, env = "CONGREGATION_USER", default_value = "cli")]
        generated_by: String,
    },

    /// Regular and auxiliary pioneer summary
    Pioneers {
        /// First month (YYYY-MM)
        #[arg(long)]
        start: String,

        /// Last month (YYYY-MM), defaults to the current month
        #[arg(long)]
        end: Option<String>,

        #[arg(long, env = "CONGREGATION_USER", default_value = "cli")]
        generated_by: String,
    },

    /// Roles, groups, privileges and members available for filters
    FilterOptions,
}

/// API server settings
#[derive(Parser, Debug, Clone)]
#[command(name = "congregation-server")]
#[command(about = "HTTP API for congregation field service reports")]
pub struct ServerArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:3000")]
    pub listen: SocketAddr,
}
