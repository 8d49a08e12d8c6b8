use super::{create_table_sql, RecordBatch, SqlValue, TableStore};
use crate::error::{EtlError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

type Tables = HashMap<String, Vec<Vec<SqlValue>>>;

/// In-memory store for development/testing.
///
/// Clones share the same tables, so a test can keep a handle after boxing one into a loader.
/// The store can be switched offline to exercise fallback paths.
#[derive(Clone)]
pub struct InMemoryStore {
    label: String,
    tables: Arc<Mutex<Tables>>,
    online: Arc<AtomicBool>,
    creates: Arc<AtomicUsize>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new("memory")
    }
}

impl InMemoryStore {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            tables: Arc::new(Mutex::new(HashMap::new())),
            online: Arc::new(AtomicBool::new(true)),
            creates: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A store that refuses every probe
    pub fn offline(label: impl Into<String>) -> Self {
        let store = Self::new(label);
        store.set_online(false);
        store
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// How many times a table was created
    pub fn create_calls(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    /// Snapshot of a table's rows
    pub fn rows(&self, table: &str) -> Option<Vec<Vec<SqlValue>>> {
        self.tables().ok()?.get(table).cloned()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| EtlError::Database {
            message: "in-memory store lock poisoned".to_string(),
        })
    }

    fn check_online(&self) -> Result<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(EtlError::Connectivity {
                store: self.label.clone(),
                message: "store is offline".to_string(),
            })
        }
    }
}

#[async_trait]
impl TableStore for InMemoryStore {
    fn name(&self) -> &str {
        &self.label
    }

    async fn ping(&self) -> Result<()> {
        self.check_online()
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        self.check_online()?;
        Ok(self.tables()?.contains_key(table))
    }

    async fn create_table(&self, table: &str) -> Result<()> {
        self.check_online()?;
        if create_table_sql(table).is_none() {
            return Err(EtlError::load(table, "no schema for table"));
        }
        let mut tables = self.tables()?;
        if tables.contains_key(table) {
            return Err(EtlError::Database {
                message: format!("table {table} already exists"),
            });
        }
        tables.insert(table.to_string(), Vec::new());
        self.creates.fetch_add(1, Ordering::SeqCst);
        debug!(table, store = %self.label, "Created table");
        Ok(())
    }

    async fn replace_rows(&self, batch: &RecordBatch) -> Result<usize> {
        self.check_online()?;
        let mut tables = self.tables()?;
        let rows = tables
            .get_mut(batch.table())
            .ok_or_else(|| EtlError::Database {
                message: format!("no such table: {}", batch.table()),
            })?;
        *rows = batch.rows().to_vec();
        Ok(batch.len())
    }

    async fn row_count(&self, table: &str) -> Result<usize> {
        self.check_online()?;
        Ok(self.tables()?.get(table).map(Vec::len).unwrap_or(0))
    }
}
