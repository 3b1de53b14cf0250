//! Connection bootstrap utilities for DuckDB.
//!
//! # Responsibility
//! - Open file or in-memory DuckDB connections.
//! - Open MotherDuck connections and select the target database.
//!
//! # Invariants
//! - Hosted connections return with `database` created and selected.
//! - The access token only appears in the connection string, never in logs.

use super::{DbError, DbResult};
use crate::config::{hosted_url, IN_MEMORY_TARGET};
use duckdb::Connection;
use log::{error, info};
use secrecy::SecretString;
use std::time::Instant;

/// Opens a local DuckDB database; `:memory:` selects a transient database.
///
/// # Side effects
/// - Creates the database file when it does not exist.
/// - Emits `db_open` logging events with duration and status.
pub fn open_local(path: &str) -> DbResult<Connection> {
    let started_at = Instant::now();
    let mode = if path == IN_MEMORY_TARGET {
        "memory"
    } else {
        "file"
    };
    info!("event=db_open module=db status=start mode={mode}");

    let opened = if mode == "memory" {
        Connection::open_in_memory()
    } else {
        Connection::open(path)
    };

    match opened {
        Ok(conn) => {
            info!(
                "event=db_open module=db status=ok mode={mode} target={path} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} target={path} duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(DbError::Connect {
                target: path.to_string(),
                source: err,
            })
        }
    }
}

/// Opens a MotherDuck connection, then creates and selects `database`.
///
/// # Side effects
/// - Runs `CREATE DATABASE IF NOT EXISTS` on the hosted service.
/// - Emits `db_open` logging events with duration and status.
pub fn open_hosted(database: &str, token: &SecretString) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode=hosted");

    let conn = match Connection::open(hosted_url(token)) {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode=hosted target={database} duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(DbError::Connect {
                target: database.to_string(),
                source: err,
            });
        }
    };

    // Create-then-use is two round trips; `IF NOT EXISTS` absorbs a
    // concurrent creator but the pair is not atomic.
    match select_database(&conn, database) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode=hosted target={database} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode=hosted target={database} duration_ms={} error_code=db_bootstrap_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn select_database(conn: &Connection, database: &str) -> DbResult<()> {
    for sql in [
        format!("CREATE DATABASE IF NOT EXISTS {database}"),
        format!("USE {database}"),
    ] {
        conn.execute_batch(&sql)
            .map_err(|err| DbError::statement(&sql, err))?;
    }
    Ok(())
}
