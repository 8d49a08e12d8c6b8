use super::{create_table_sql, insert_sql, RecordBatch, SqlValue, TableStore};
use crate::config::DbConfig;
use crate::error::{EtlError, Result};
use async_trait::async_trait;
use libsql::params::Params;
use libsql::{Builder, Connection, Database, Value};
use tracing::{debug, info};

/// Primary store: a remote libSQL database
pub struct LibsqlStore {
    db: Database,
    url: String,
}

impl LibsqlStore {
    /// Create a store handle for the configured primary database
    pub async fn connect(config: &DbConfig) -> Result<Self> {
        let url = config.primary_url();
        info!("Connecting to primary store at {}", url);

        let db = Builder::new_remote(url.clone(), config.auth_token().to_string())
            .build()
            .await
            .map_err(|e| EtlError::Connectivity {
                store: url.clone(),
                message: format!("Failed to connect to database: {e}"),
            })?;

        Ok(Self { db, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn get_connection(&self) -> Result<Connection> {
        self.db.connect().map_err(|e| EtlError::Connectivity {
            store: self.url.clone(),
            message: format!("Failed to get database connection: {e}"),
        })
    }
}

fn to_value(value: &SqlValue) -> Value {
    match value {
        SqlValue::Integer(v) => Value::Integer(*v),
        SqlValue::Text(v) => Value::Text(v.clone()),
        SqlValue::Decimal(v) => Value::Text(v.to_string()),
    }
}

#[async_trait]
impl TableStore for LibsqlStore {
    fn name(&self) -> &str {
        "libsql"
    }

    async fn ping(&self) -> Result<()> {
        let conn = self.get_connection()?;
        let mut rows = conn
            .query("SELECT 1", libsql::params![])
            .await
            .map_err(|e| EtlError::Connectivity {
                store: self.url.clone(),
                message: format!("Connection probe failed: {e}"),
            })?;
        rows.next().await.map_err(|e| EtlError::Connectivity {
            store: self.url.clone(),
            message: format!("Connection probe failed: {e}"),
        })?;
        Ok(())
    }

    async fn table_exists(&self, table: &str) -> Result<bool> {
        let conn = self.get_connection()?;
        let mut rows = conn
            .query(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                libsql::params![table],
            )
            .await?;
        Ok(rows.next().await?.is_some())
    }

    async fn create_table(&self, table: &str) -> Result<()> {
        let ddl = create_table_sql(table)
            .ok_or_else(|| EtlError::load(table, "no schema for table"))?;
        let conn = self.get_connection()?;
        conn.execute(ddl, libsql::params![]).await?;
        debug!(table, url = %self.url, "Created table");
        Ok(())
    }

    async fn replace_rows(&self, batch: &RecordBatch) -> Result<usize> {
        let sql = insert_sql(batch);
        let conn = self.get_connection()?;
        let tx = conn.transaction().await?;
        tx.execute(&format!("DELETE FROM {}", batch.table()), libsql::params![]).await?;
        for row in batch.rows() {
            let values: Vec<Value> = row.iter().map(to_value).collect();
            tx.execute(&sql, Params::Positional(values)).await?;
        }
        tx.commit().await?;
        Ok(batch.len())
    }

    async fn row_count(&self, table: &str) -> Result<usize> {
        if create_table_sql(table).is_none() {
            return Err(EtlError::load(table, "unknown table"));
        }
        let conn = self.get_connection()?;
        let mut rows = conn
            .query(&format!("SELECT COUNT(*) FROM {table}"), libsql::params![])
            .await?;
        let count: i64 = match rows.next().await? {
            Some(row) => row.get(0)?,
            None => 0,
        };
        Ok(count as usize)
    }
}
