//! Materialized statement results.

use duckdb::types::Value;
use std::time::Duration;

/// Rows returned by one statement, copied out of the engine.
///
/// Values keep DuckDB's native typing; callers decode them as needed.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    /// Output column names in select-list order.
    pub columns: Vec<String>,
    /// Row values, each `columns.len()` wide.
    pub rows: Vec<Vec<Value>>,
    /// Wall time spent preparing, executing and fetching.
    pub execution_time: Duration,
}

impl ResultSet {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First column of the first row, if any.
    pub fn first_value(&self) -> Option<&Value> {
        self.rows.first().and_then(|row| row.first())
    }

    /// Position of `name` in the output columns (case-insensitive).
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| column.eq_ignore_ascii_case(name))
    }

    /// Value of column `name` in row `row`.
    pub fn value(&self, row: usize, name: &str) -> Option<&Value> {
        let idx = self.column_index(name)?;
        self.rows.get(row).and_then(|values| values.get(idx))
    }
}
