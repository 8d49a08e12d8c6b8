use super::{create_table_sql, insert_sql, RecordBatch, TableStore};
use crate::error::{EtlError, Result};
use async_trait::async_trait;
use rusqlite::{params, params_from_iter, Connection};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Embedded, file-backed SQLite store used when the primary is unreachable.
///
/// A deferred store touches the filesystem only when first used.
pub struct SqliteStore {
    path: PathBuf,
    conn: Mutex<Option<Connection>>,
}

impl SqliteStore {
    /// Open the database file now
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let store = Self::deferred(path);
        store.with_conn(|_| Ok(()))?;
        Ok(store)
    }

    /// Remember the path; the file and its parent directory are created on first use
    pub fn deferred<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            conn: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| self.unavailable(e))?;
            }
        }
        let conn = Connection::open(&self.path).map_err(|e| self.unavailable(e))?;
        debug!(path = %self.path.display(), "Opened fallback database");
        Ok(conn)
    }

    fn unavailable(&self, e: impl std::fmt::Display) -> EtlError {
        EtlError::Connectivity {
            store: self.path.display().to_string(),
            message: e.to_string(),
        }
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut guard = self.conn.lock().map_err(|_| EtlError::Database {
            message: "fallback store connection lock poisoned".to_string(),
        })?;
        if guard.is_none() {
            *guard = Some(self.connect()?);
        }
        match guard.as_mut() {
            Some(conn) => f(conn),
            None => Err(self.unavailable("connection not open")),
        }
    }
}

#[async_trait]
impl TableStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn ping(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map_err(|e| self.unavailable(e))?;
            Ok(())
        })
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    async fn create_table(&self, table: &str) -> Result<()> {
        let ddl = create_table_sql(table)
            .ok_or_else(|| EtlError::load(table, "no schema for table"))?;
        self.with_conn(|conn| Ok(conn.execute_batch(ddl)?))?;
        debug!(table, path = %self.path.display(), "Created table");
        Ok(())
    }

    async fn replace_rows(&self, batch: &RecordBatch) -> Result<usize> {
        let sql = insert_sql(batch);
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute(&format!("DELETE FROM {}", batch.table()), [])?;
            {
                let mut stmt = tx.prepare(&sql)?;
                for row in batch.rows() {
                    stmt.execute(params_from_iter(row.iter()))?;
                }
            }
            tx.commit()?;
            Ok(batch.len())
        })
    }

    async fn row_count(&self, table: &str) -> Result<usize> {
        if create_table_sql(table).is_none() {
            return Err(EtlError::load(table, "unknown table"));
        }
        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }
}
