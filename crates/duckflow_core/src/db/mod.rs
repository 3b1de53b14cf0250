//! DuckDB connection bootstrap and the session error taxonomy.
//!
//! # Responsibility
//! - Open local (file / in-memory) and hosted (MotherDuck) connections.
//! - Classify failures as configuration, connection, statement or lifecycle
//!   errors while keeping the engine error as `source`.
//!
//! # Invariants
//! - Engine errors are never swallowed; they are wrapped and propagated.
//! - Error messages never contain the hosted access token.

use crate::config::ConfigError;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;

pub use open::{open_hosted, open_local};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Config(ConfigError),
    /// The engine failed to establish a connection to `target`.
    Connect {
        target: String,
        source: duckdb::Error,
    },
    /// The engine failed to release the connection to `target`.
    Close {
        target: String,
        source: duckdb::Error,
    },
    /// The engine rejected or failed to run `sql`.
    Statement { sql: String, source: duckdb::Error },
    /// `operation` is not allowed while the session is in `state`.
    Lifecycle {
        operation: &'static str,
        state: &'static str,
    },
}

impl DbError {
    pub(crate) fn statement(sql: &str, source: duckdb::Error) -> Self {
        Self::Statement {
            sql: sql.to_string(),
            source,
        }
    }

    /// Returns `true` for missing credentials and hosted-only misuse.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "configuration error: {err}"),
            Self::Connect { target, source } => {
                write!(f, "failed to connect to `{target}`: {source}")
            }
            Self::Close { target, source } => {
                write!(f, "failed to close connection to `{target}`: {source}")
            }
            Self::Statement { sql, source } => {
                write!(f, "failed to execute `{}`: {source}", sql.trim())
            }
            Self::Lifecycle { operation, state } => {
                write!(f, "cannot {operation} a session that is {state}")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Connect { source, .. } => Some(source),
            Self::Close { source, .. } => Some(source),
            Self::Statement { source, .. } => Some(source),
            Self::Lifecycle { .. } => None,
        }
    }
}

impl From<ConfigError> for DbError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}
