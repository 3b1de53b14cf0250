//! Sales summary decoding and console rendering.
//!
//! # Responsibility
//! - Decode the category summary result into typed rows.
//! - Render the human-readable per-category report.
//!
//! # Invariants
//! - Row order of the source result is preserved (revenue descending).
//! - Unexpected column types are rejected instead of coerced silently.

use crate::db::DbError;
use crate::result::ResultSet;
use duckdb::types::Value;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter, Write as _};

/// Shown in place of a NULL group key.
pub const NULL_PLACEHOLDER: &str = "NULL";

pub type ReportResult<T> = Result<T, ReportError>;

#[derive(Debug)]
pub enum ReportError {
    Db(DbError),
    InvalidData(String),
}

impl Display for ReportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid summary row: {message}"),
        }
    }
}

impl Error for ReportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for ReportError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

/// One category line of the sales summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub category: String,
    pub total_transactions: i64,
    pub total_items_sold: i64,
    pub total_revenue: f64,
}

/// Decoded sales summary, highest revenue first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesReport {
    pub categories: Vec<CategorySummary>,
}

impl SalesReport {
    /// Decodes the result of [`crate::Session::aggregate_summary`].
    pub fn from_result(result: &ResultSet) -> ReportResult<Self> {
        let category = required_column(result, "category")?;
        let transactions = required_column(result, "total_transactions")?;
        let items = required_column(result, "total_items_sold")?;
        let revenue = required_column(result, "total_revenue")?;

        let categories = result
            .rows
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                Ok(CategorySummary {
                    category: text_at(row, category, idx)?,
                    total_transactions: integer_at(row, transactions, idx)?,
                    total_items_sold: integer_at(row, items, idx)?,
                    total_revenue: float_at(row, revenue, idx)?,
                })
            })
            .collect::<ReportResult<Vec<_>>>()?;

        Ok(Self { categories })
    }

    pub fn top_category(&self) -> Option<&CategorySummary> {
        self.categories.first()
    }

    /// Renders the console report, one block per category.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("Sales Summary by Category:\n");
        out.push_str("------------------------\n");
        for summary in &self.categories {
            // Writing to a String cannot fail.
            let _ = write!(
                out,
                "\nCategory: {}\n  Total Transactions: {}\n  Total Items Sold: {}\n  Total Revenue: {}\n",
                summary.category,
                summary.total_transactions,
                summary.total_items_sold,
                format_currency(summary.total_revenue)
            );
        }
        out
    }
}

/// Formats `amount` as dollars with thousands separators and two decimals.
pub fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u128;
    let digits = (cents / 100).to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount.is_sign_negative() && cents > 0 {
        "-"
    } else {
        ""
    };
    format!("{sign}${grouped}.{:02}", cents % 100)
}

fn required_column(result: &ResultSet, name: &str) -> ReportResult<usize> {
    result
        .column_index(name)
        .ok_or_else(|| ReportError::InvalidData(format!("missing column `{name}`")))
}

fn cell(row: &[Value], column: usize, row_idx: usize) -> ReportResult<&Value> {
    row.get(column).ok_or_else(|| {
        ReportError::InvalidData(format!("row {row_idx} has no column {column}"))
    })
}

fn text_at(row: &[Value], column: usize, row_idx: usize) -> ReportResult<String> {
    match cell(row, column, row_idx)? {
        Value::Text(value) => Ok(value.clone()),
        Value::Null => Ok(NULL_PLACEHOLDER.to_string()),
        other => Err(unexpected("text", other, row_idx)),
    }
}

fn integer_at(row: &[Value], column: usize, row_idx: usize) -> ReportResult<i64> {
    match cell(row, column, row_idx)? {
        Value::TinyInt(value) => Ok(i64::from(*value)),
        Value::SmallInt(value) => Ok(i64::from(*value)),
        Value::Int(value) => Ok(i64::from(*value)),
        Value::BigInt(value) => Ok(*value),
        Value::HugeInt(value) => i64::try_from(*value).map_err(|_| {
            ReportError::InvalidData(format!("row {row_idx} integer {value} overflows i64"))
        }),
        Value::Null => Ok(0),
        other => Err(unexpected("integer", other, row_idx)),
    }
}

fn float_at(row: &[Value], column: usize, row_idx: usize) -> ReportResult<f64> {
    match cell(row, column, row_idx)? {
        Value::Double(value) => Ok(*value),
        Value::Float(value) => Ok(f64::from(*value)),
        Value::Null => Ok(0.0),
        other => integer_at(row, column, row_idx)
            .map(|value| value as f64)
            .map_err(|_| unexpected("float", other, row_idx)),
    }
}

fn unexpected(expected: &str, value: &Value, row_idx: usize) -> ReportError {
    ReportError::InvalidData(format!(
        "row {row_idx} expected {expected}, got {value:?}"
    ))
}
