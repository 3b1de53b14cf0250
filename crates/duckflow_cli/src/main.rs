//! duckflow demo entry point.
//!
//! # Responsibility
//! - Load the sales CSV into a scoped session and print the category summary.
//! - Copy the loaded table to MotherDuck when a token is configured.
//!
//! Configuration comes from the environment only:
//! `MOTHERDUCK_TOKEN`, `DUCKFLOW_LOG_LEVEL`, `DUCKFLOW_LOG_DIR`,
//! `DUCKFLOW_SALES_CSV`.

use duckflow_core::{
    core_version, default_log_level, init_logging, with_session, DbError, ReportResult, SalesReport,
    SessionConfig, IN_MEMORY_TARGET, SALES_TABLE, TOKEN_ENV_VAR,
};
use log::{error, info};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

const LOG_LEVEL_ENV: &str = "DUCKFLOW_LOG_LEVEL";
const LOG_DIR_ENV: &str = "DUCKFLOW_LOG_DIR";
const SALES_CSV_ENV: &str = "DUCKFLOW_SALES_CSV";
const UPLOAD_TABLE: &str = "sales_data";
const BUNDLED_SALES_CSV: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../duckflow_core/tests/fixtures/sample_sales.csv"
);

fn main() -> ExitCode {
    let level = env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| default_log_level().to_string());
    let log_dir = env::var(LOG_DIR_ENV).ok();
    if let Err(err) = init_logging(&level, log_dir.as_deref()) {
        eprintln!("duckflow: {err}");
        return ExitCode::FAILURE;
    }

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=run module=cli status=error error={err}");
            eprintln!("duckflow: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> ReportResult<()> {
    let hosted = env::var(TOKEN_ENV_VAR).is_ok_and(|token| !token.trim().is_empty());
    let config = SessionConfig::new(IN_MEMORY_TARGET, hosted).map_err(DbError::from)?;
    let csv_path = env::var_os(SALES_CSV_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(BUNDLED_SALES_CSV));
    info!(
        "event=run module=cli status=start version={} hosted={hosted} csv={}",
        core_version(),
        csv_path.display()
    );

    with_session(config, |session| {
        session.load_csv(&csv_path, SALES_TABLE)?;
        let report = SalesReport::from_result(&session.aggregate_summary()?)?;

        println!();
        print!("{}", report.render());

        if session.uses_hosted_mode() {
            println!("\nUploading data to MotherDuck...");
            session.upload_table(SALES_TABLE, UPLOAD_TABLE)?;
            println!("Data upload complete!");
        }
        Ok(())
    })
}
