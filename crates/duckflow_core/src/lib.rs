//! Core of duckflow: scoped DuckDB sessions, CSV loading, the sales summary
//! report and MotherDuck uploads.

pub mod config;
pub mod db;
pub mod logging;
pub mod report;
pub mod result;
pub mod session;

pub use config::{
    ConfigError, SessionConfig, Target, DEFAULT_HOSTED_DATABASE, IN_MEMORY_TARGET, TOKEN_ENV_VAR,
};
pub use db::{DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use report::{format_currency, CategorySummary, ReportError, ReportResult, SalesReport};
pub use result::ResultSet;
pub use session::{with_session, Session, SALES_TABLE};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
