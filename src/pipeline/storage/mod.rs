// Storage: target stores for cleaned datasets and the loader that picks between them

pub mod batch;
pub mod in_memory;
#[cfg(feature = "db")]
pub mod libsql_store;
pub mod loader;
pub mod sqlite;

pub use batch::{RecordBatch, SqlValue};
pub use in_memory::InMemoryStore;
#[cfg(feature = "db")]
pub use libsql_store::LibsqlStore;
pub use loader::{LoadOutcome, Loader};
pub use sqlite::SqliteStore;

use crate::config::DbConfig;
use crate::constants::{CUSTOMERS_TABLE, ORDERS_TABLE};
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;
use tracing::{error, info};

/// A relational store that can hold the pipeline's tables
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Short label used in logs and metrics
    fn name(&self) -> &str;

    /// Probe the store. Errors mean the store is unavailable.
    async fn ping(&self) -> Result<()>;

    async fn table_exists(&self, table: &str) -> Result<bool>;

    async fn create_table(&self, table: &str) -> Result<()>;

    /// Replace the whole table contents with `batch`, atomically. Returns rows written.
    async fn replace_rows(&self, batch: &RecordBatch) -> Result<usize>;

    async fn row_count(&self, table: &str) -> Result<usize>;
}

/// DDL for each known table
pub fn create_table_sql(table: &str) -> Option<&'static str> {
    match table {
        CUSTOMERS_TABLE => Some(
            "CREATE TABLE customers (
                id        INTEGER PRIMARY KEY,
                name      TEXT NOT NULL,
                email     TEXT NOT NULL UNIQUE,
                join_date TEXT NOT NULL
            )",
        ),
        ORDERS_TABLE => Some(
            "CREATE TABLE orders (
                id           INTEGER PRIMARY KEY,
                customer_id  INTEGER NOT NULL,
                order_date   TEXT NOT NULL,
                total_amount NUMERIC NOT NULL
            )",
        ),
        _ => None,
    }
}

/// Parameterised INSERT for a validated batch
pub(crate) fn insert_sql(batch: &RecordBatch) -> String {
    let placeholders: Vec<String> = (1..=batch.columns().len()).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        batch.table(),
        batch.columns().join(", "),
        placeholders.join(", ")
    )
}

/// Open the primary store from a database config file.
///
/// Any configuration or connection problem is logged and reported as "no engine available".
pub async fn connect_primary(db_config_path: &Path) -> Option<Box<dyn TableStore>> {
    let config = match DbConfig::load(db_config_path) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Primary store configuration unavailable");
            return None;
        }
    };
    open_primary(&config).await
}

#[cfg(feature = "db")]
async fn open_primary(config: &DbConfig) -> Option<Box<dyn TableStore>> {
    match LibsqlStore::connect(config).await {
        Ok(store) => Some(Box::new(store)),
        Err(e) => {
            error!(error = %e, "Could not open primary store");
            None
        }
    }
}

#[cfg(not(feature = "db"))]
async fn open_primary(config: &DbConfig) -> Option<Box<dyn TableStore>> {
    info!(
        host = %config.host,
        "Built without the `db` feature; primary store disabled"
    );
    None
}

/// The embedded fallback store. Nothing is created on disk until the loader first uses it.
pub fn open_fallback(path: &Path) -> Box<dyn TableStore> {
    info!(path = %path.display(), "Fallback store configured");
    Box::new(SqliteStore::deferred(path))
}
