use crate::constants::{columns_for_table, CUSTOMERS_TABLE, ORDERS_TABLE};
use crate::domain::{format_date, format_timestamp, CustomerRecord, OrderRecord};
use crate::error::{EtlError, Result};
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;

/// A single cell value written to a table
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Integer(i64),
    Text(String),
    Decimal(Decimal),
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Integer(v) => write!(f, "{v}"),
            SqlValue::Text(v) => f.write_str(v),
            SqlValue::Decimal(v) => write!(f, "{v}"),
        }
    }
}

impl rusqlite::types::ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        use rusqlite::types::{ToSqlOutput, ValueRef};
        Ok(match self {
            SqlValue::Integer(v) => ToSqlOutput::from(*v),
            SqlValue::Text(v) => ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes())),
            // NUMERIC affinity turns the canonical text into a number without going through f64 here
            SqlValue::Decimal(v) => ToSqlOutput::from(v.to_string()),
        })
    }
}

/// A cleaned dataset addressed to one table, in column order
#[derive(Debug, Clone, PartialEq)]
pub struct RecordBatch {
    table: String,
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
}

impl RecordBatch {
    pub fn new(table: impl Into<String>, columns: Vec<String>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self {
            table: table.into(),
            columns,
            rows,
        }
    }

    pub fn from_customers(customers: &[CustomerRecord]) -> Self {
        let rows = customers
            .iter()
            .map(|c| {
                vec![
                    SqlValue::Integer(c.id),
                    SqlValue::Text(c.name.clone()),
                    SqlValue::Text(c.email.clone()),
                    SqlValue::Text(format_date(c.join_date)),
                ]
            })
            .collect();
        Self::new(CUSTOMERS_TABLE, owned_columns(CUSTOMERS_TABLE), rows)
    }

    pub fn from_orders(orders: &[OrderRecord]) -> Self {
        let rows = orders
            .iter()
            .map(|o| {
                vec![
                    SqlValue::Integer(o.id),
                    SqlValue::Integer(o.customer_id),
                    SqlValue::Text(format_timestamp(o.order_date)),
                    SqlValue::Decimal(o.total_amount),
                ]
            })
            .collect();
        Self::new(ORDERS_TABLE, owned_columns(ORDERS_TABLE), rows)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<SqlValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Reject empty batches, unknown tables, and column sets that differ from the table's
    pub fn validate(&self) -> Result<()> {
        let expected = columns_for_table(&self.table)
            .ok_or_else(|| EtlError::load(&self.table, "unknown table"))?;
        if self.rows.is_empty() {
            return Err(EtlError::load(&self.table, "no rows to load"));
        }

        let expected_set: HashSet<&str> = expected.iter().copied().collect();
        let actual_set: HashSet<&str> = self.columns.iter().map(String::as_str).collect();
        if actual_set != expected_set || self.columns.len() != expected.len() {
            let missing: Vec<&str> = expected_set.difference(&actual_set).copied().collect();
            let unexpected: Vec<&str> = actual_set.difference(&expected_set).copied().collect();
            return Err(EtlError::load(
                &self.table,
                format!(
                    "column mismatch (missing: [{}], unexpected: [{}])",
                    missing.join(", "),
                    unexpected.join(", ")
                ),
            ));
        }

        if let Some(pos) = self.rows.iter().position(|r| r.len() != self.columns.len()) {
            return Err(EtlError::load(
                &self.table,
                format!("row {} has {} values for {} columns", pos, self.rows[pos].len(), self.columns.len()),
            ));
        }
        Ok(())
    }

    /// SHA-256 over table, columns and every cell, hex encoded.
    /// Identical batches give identical fingerprints across runs.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.table.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.columns.join("|").as_bytes());
        for row in &self.rows {
            hasher.update(b"\n");
            for (i, value) in row.iter().enumerate() {
                if i > 0 {
                    hasher.update(b"|");
                }
                hasher.update(value.to_string().as_bytes());
            }
        }
        hex::encode(hasher.finalize())
    }
}

fn owned_columns(table: &str) -> Vec<String> {
    columns_for_table(table)
        .unwrap_or(&[])
        .iter()
        .map(|c| c.to_string())
        .collect()
}
