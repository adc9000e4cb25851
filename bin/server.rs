// Congregation Reports - Web Server
// REST API over the report engine with Axum

use anyhow::{bail, Result};
use clap::Parser;
use tracing::info;

use congregation_reports::config::ServerArgs;
use congregation_reports::server::{serve, AppState};
use congregation_reports::{count_members, logging, open_database, VERSION};

#[tokio::main]
async fn main() -> Result<()> {
    let args = ServerArgs::parse();
    if let Err(e) = args.common.validate() {
        bail!(e);
    }
    logging::init(&args.common.log_level);

    let db_path = args.common.database.as_path();
    if !db_path.exists() {
        bail!(
            "Database not found at {:?}. Run `congregation-reports init` and import members first.",
            db_path
        );
    }

    let conn = open_database(db_path)?;
    info!(
        version = VERSION,
        path = ?db_path,
        members = count_members(&conn)?,
        "database opened"
    );

    serve(args.listen, AppState::new(conn)).await
}
