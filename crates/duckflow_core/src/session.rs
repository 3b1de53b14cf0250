//! Scoped DuckDB session.
//!
//! # Responsibility
//! - Own exactly one connection for the lifetime of a session.
//! - Run caller SQL, CSV loads, the sales summary and hosted uploads.
//!
//! # Invariants
//! - State only moves `Unopened -> Open -> Closed`; `Closed` is terminal.
//! - The connection is released exactly once, on `end`, on `Drop`, or by
//!   [`with_session`] after the body returns.
//! - Hosted-only operations are rejected before any SQL is issued.

use crate::config::{quote_literal, validate_table_name, ConfigError, SessionConfig, Target};
use crate::db::{open_hosted, open_local, DbError, DbResult};
use crate::result::ResultSet;
use duckdb::types::Value;
use duckdb::Connection;
use log::{debug, error, info, warn};
use std::path::Path;
use std::time::Instant;

/// Table read by [`Session::aggregate_summary`].
pub const SALES_TABLE: &str = "sales";

const SALES_SUMMARY_SQL: &str = "SELECT
    category,
    COUNT(*) AS total_transactions,
    CAST(SUM(quantity) AS BIGINT) AS total_items_sold,
    CAST(SUM(price * quantity) AS DOUBLE) AS total_revenue
FROM sales
GROUP BY category
ORDER BY total_revenue DESC";

enum SessionState {
    Unopened,
    Open(Connection),
    Closed,
}

impl SessionState {
    fn name(&self) -> &'static str {
        match self {
            Self::Unopened => "unopened",
            Self::Open(_) => "open",
            Self::Closed => "closed",
        }
    }
}

/// One DuckDB connection bound to a resolved [`SessionConfig`].
pub struct Session {
    config: SessionConfig,
    state: SessionState,
}

impl Session {
    /// Creates an unopened session. No connection is made until [`Session::start`].
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: SessionState::Unopened,
        }
    }

    /// Resolves configuration from the process environment and creates a session.
    ///
    /// # Errors
    /// - `DbError::Config` when `hosted` is set and no token is available.
    pub fn from_env(target: impl Into<String>, hosted: bool) -> DbResult<Self> {
        let config = SessionConfig::new(target, hosted).inspect_err(|err| {
            error!("event=session_config module=session status=error error={err}");
        })?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn uses_hosted_mode(&self) -> bool {
        self.config.is_hosted()
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, SessionState::Open(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, SessionState::Closed)
    }

    /// Opens the connection.
    ///
    /// Hosted sessions create the target database when missing and select it.
    ///
    /// # Errors
    /// - `Lifecycle` when the session is already open or closed.
    /// - `Connect` / `Statement` when the engine fails; never retried.
    pub fn start(&mut self) -> DbResult<()> {
        if !matches!(self.state, SessionState::Unopened) {
            return Err(DbError::Lifecycle {
                operation: "start",
                state: self.state.name(),
            });
        }

        let conn = match self.config.target() {
            Target::Local(path) => open_local(path),
            Target::Hosted { database, token } => open_hosted(database, token),
        }
        .inspect_err(|err| {
            error!(
                "event=session_start module=session status=error target={} error={err}",
                self.config.display_target()
            );
        })?;

        info!(
            "event=session_start module=session status=ok hosted={} target={}",
            self.uses_hosted_mode(),
            self.config.display_target()
        );
        self.state = SessionState::Open(conn);
        Ok(())
    }

    /// Closes the connection if open. Safe to call repeatedly.
    ///
    /// A session that was never opened also moves to `Closed`.
    pub fn end(&mut self) -> DbResult<()> {
        match std::mem::replace(&mut self.state, SessionState::Closed) {
            SessionState::Open(conn) => match conn.close() {
                Ok(()) => {
                    info!(
                        "event=session_end module=session status=ok target={}",
                        self.config.display_target()
                    );
                    Ok(())
                }
                Err((conn, err)) => {
                    // The handle is dropped either way; the engine frees it on drop.
                    drop(conn);
                    error!(
                        "event=session_end module=session status=error target={} error={err}",
                        self.config.display_target()
                    );
                    Err(DbError::Close {
                        target: self.config.display_target().to_string(),
                        source: err,
                    })
                }
            },
            SessionState::Unopened | SessionState::Closed => Ok(()),
        }
    }

    /// Runs `sql` verbatim and returns every row it produces.
    ///
    /// No validation or parameter binding happens here; building safe SQL is
    /// the caller's job.
    pub fn execute(&self, sql: &str) -> DbResult<ResultSet> {
        let conn = self.connection("execute")?;
        let started_at = Instant::now();

        match collect_rows(conn, sql) {
            Ok((columns, rows)) => {
                let execution_time = started_at.elapsed();
                debug!(
                    "event=sql_execute module=session status=ok rows={} duration_ms={} sql={}",
                    rows.len(),
                    execution_time.as_millis(),
                    single_line(sql)
                );
                Ok(ResultSet {
                    columns,
                    rows,
                    execution_time,
                })
            }
            Err(err) => {
                error!(
                    "event=sql_execute module=session status=error duration_ms={} sql={} error={err}",
                    started_at.elapsed().as_millis(),
                    single_line(sql)
                );
                Err(DbError::statement(sql, err))
            }
        }
    }

    /// Creates `table` from a CSV file using DuckDB schema inference.
    ///
    /// # Errors
    /// - `Config` when `table` is not a plain or dot-qualified identifier.
    /// - `Statement` when the table exists, the file is unreadable or
    ///   inference fails.
    pub fn load_csv(&self, csv_path: impl AsRef<Path>, table: &str) -> DbResult<()> {
        validate_table_name(table)?;
        let csv_path = csv_path.as_ref();
        let sql = format!(
            "CREATE TABLE {table} AS SELECT * FROM read_csv_auto({})",
            quote_literal(&csv_path.to_string_lossy())
        );

        self.run_command("load_csv", &sql)?;
        info!(
            "event=load_csv module=session status=ok table={table} path={}",
            csv_path.display()
        );
        Ok(())
    }

    /// Sales grouped by category, highest revenue first.
    ///
    /// Columns: `category`, `total_transactions`, `total_items_sold`,
    /// `total_revenue`.
    pub fn aggregate_summary(&self) -> DbResult<ResultSet> {
        self.execute(SALES_SUMMARY_SQL)
    }

    /// Copies `local_table` into `remote_table` on the selected hosted database,
    /// replacing any existing remote table.
    ///
    /// # Errors
    /// - `Config(HostedModeRequired)` on local sessions; no SQL is issued.
    /// - `Statement` when the copy fails. Nothing is retried or chunked.
    pub fn upload_table(&self, local_table: &str, remote_table: &str) -> DbResult<()> {
        if !self.uses_hosted_mode() {
            warn!("event=upload_table module=session status=rejected reason=local_session");
            return Err(ConfigError::HostedModeRequired {
                operation: "upload_table",
            }
            .into());
        }
        validate_table_name(local_table)?;
        validate_table_name(remote_table)?;

        let sql = format!("CREATE OR REPLACE TABLE {remote_table} AS SELECT * FROM {local_table}");
        self.run_command("upload_table", &sql)?;
        info!(
            "event=upload_table module=session status=ok local={local_table} remote={remote_table} database={}",
            self.config.display_target()
        );
        Ok(())
    }

    fn connection(&self, operation: &'static str) -> DbResult<&Connection> {
        match &self.state {
            SessionState::Open(conn) => Ok(conn),
            other => Err(DbError::Lifecycle {
                operation,
                state: other.name(),
            }),
        }
    }

    fn run_command(&self, operation: &'static str, sql: &str) -> DbResult<()> {
        let conn = self.connection(operation)?;
        let started_at = Instant::now();
        match conn.execute_batch(sql) {
            Ok(()) => {
                debug!(
                    "event={operation} module=session status=ok duration_ms={} sql={}",
                    started_at.elapsed().as_millis(),
                    single_line(sql)
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event={operation} module=session status=error duration_ms={} sql={} error={err}",
                    started_at.elapsed().as_millis(),
                    single_line(sql)
                );
                Err(DbError::statement(sql, err))
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = self.end();
    }
}

/// Runs `body` inside a started session and always ends it afterwards.
///
/// The body's error wins over a close error; a close error is only reported
/// when the body succeeded.
pub fn with_session<T, E, F>(config: SessionConfig, body: F) -> Result<T, E>
where
    F: FnOnce(&Session) -> Result<T, E>,
    E: From<DbError>,
{
    let mut session = Session::new(config);
    session.start()?;

    let outcome = body(&session);
    let closed = session.end();

    match (outcome, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(err)) => Err(err.into()),
        (Err(err), _) => Err(err),
    }
}

type Rows = (Vec<String>, Vec<Vec<Value>>);

fn collect_rows(conn: &Connection, sql: &str) -> duckdb::Result<Rows> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([])?;

    let mut collected = Vec::new();
    while let Some(row) = rows.next()? {
        let width = row.as_ref().column_count();
        let mut values = Vec::with_capacity(width);
        for idx in 0..width {
            values.push(row.get::<_, Value>(idx)?);
        }
        collected.push(values);
    }
    drop(rows);

    Ok((stmt.column_names(), collected))
}

fn single_line(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::single_line;

    #[test]
    fn single_line_collapses_whitespace() {
        assert_eq!(
            single_line("SELECT\n    a,\n\tb\nFROM t  "),
            "SELECT a, b FROM t"
        );
    }
}
