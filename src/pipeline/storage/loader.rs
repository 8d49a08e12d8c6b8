use super::{RecordBatch, TableStore};
use crate::error::{EtlError, Result};
use crate::observability::metrics;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// What a successful load wrote, and where
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadOutcome {
    pub table: String,
    pub store: String,
    pub rows: usize,
    pub fingerprint: String,
    pub used_fallback: bool,
}

/// Writes cleaned batches to the primary store, falling back to the secondary when the primary
/// is missing or unreachable. Every write replaces the table contents.
///
/// Clones share the same stores.
#[derive(Clone)]
pub struct Loader {
    primary: Option<Arc<dyn TableStore>>,
    fallback: Option<Arc<dyn TableStore>>,
}

impl Loader {
    pub fn new(primary: Option<Box<dyn TableStore>>, fallback: Option<Box<dyn TableStore>>) -> Self {
        Self {
            primary: primary.map(Arc::from),
            fallback: fallback.map(Arc::from),
        }
    }

    /// Load a batch, reporting only success or failure. Failures are logged, never raised.
    pub async fn load(&self, batch: &RecordBatch) -> bool {
        self.load_with_outcome(batch).await.is_ok()
    }

    /// Load a batch and describe the result.
    ///
    /// Invalid batches are rejected before any store is touched. An unavailable primary (no config,
    /// failed connection, failed probe) sends the full write to the fallback. A primary that is
    /// reachable but fails the write is a load failure; the fallback is not used then.
    pub async fn load_with_outcome(&self, batch: &RecordBatch) -> Result<LoadOutcome> {
        let table = batch.table().to_string();
        if let Err(e) = batch.validate() {
            error!(table = %table, error = %e, "Rejected batch");
            metrics::load::failed(&table);
            return Err(e);
        }

        let mut unavailable: Option<EtlError> = None;
        match &self.primary {
            Some(primary) => match write(primary.as_ref(), batch).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if e.is_unavailable() => {
                    warn!(table = %table, store = primary.name(), error = %e, "Primary store unavailable");
                    unavailable = Some(e);
                }
                Err(e) => {
                    error!(table = %table, store = primary.name(), error = %e, "Load failed");
                    metrics::load::failed(&table);
                    return Err(e);
                }
            },
            None => warn!(table = %table, "No primary store available"),
        }

        let Some(fallback) = &self.fallback else {
            error!(table = %table, "No fallback store available");
            metrics::load::failed(&table);
            return Err(unavailable.unwrap_or_else(|| EtlError::Connectivity {
                store: "none".to_string(),
                message: "no store available".to_string(),
            }));
        };

        info!(table = %table, store = fallback.name(), "Retrying load against fallback store");
        metrics::load::fallback_activated(&table);
        match write(fallback.as_ref(), batch).await {
            Ok(mut outcome) => {
                outcome.used_fallback = true;
                Ok(outcome)
            }
            Err(e) => {
                error!(table = %table, store = fallback.name(), error = %e, "Fallback load failed");
                metrics::load::failed(&table);
                Err(e)
            }
        }
    }
}

async fn write(store: &dyn TableStore, batch: &RecordBatch) -> Result<LoadOutcome> {
    let started = Instant::now();
    let table = batch.table();
    store.ping().await?;

    if store.table_exists(table).await? {
        debug!(table, store = store.name(), "Table exists, skipping creation");
    } else {
        store.create_table(table).await?;
        info!(table, store = store.name(), "Created table");
    }

    let rows = store.replace_rows(batch).await?;
    let fingerprint = batch.fingerprint();
    let seconds = started.elapsed().as_secs_f64();
    metrics::load::succeeded(table, store.name(), rows, seconds);
    info!(
        table,
        store = store.name(),
        rows,
        fingerprint = %fingerprint,
        "Loaded records"
    );

    Ok(LoadOutcome {
        table: table.to_string(),
        store: store.name().to_string(),
        rows,
        fingerprint,
        used_fallback: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CustomerRecord;
    use crate::pipeline::storage::{InMemoryStore, SqlValue};
    use chrono::NaiveDate;

    fn batch() -> RecordBatch {
        RecordBatch::from_customers(&[
            CustomerRecord {
                id: 1,
                name: "Alice Borderland".to_string(),
                email: "alice@gmail.com".to_string(),
                join_date: NaiveDate::from_ymd_opt(2024, 9, 8).unwrap(),
            },
            CustomerRecord {
                id: 2,
                name: "Agustin Chan".to_string(),
                email: "chan@gmail.com".to_string(),
                join_date: NaiveDate::from_ymd_opt(2024, 9, 7).unwrap(),
            },
        ])
    }

    #[tokio::test]
    async fn test_loads_into_primary() {
        let primary = InMemoryStore::new("primary");
        let fallback = InMemoryStore::new("fallback");
        let loader = Loader::new(Some(Box::new(primary.clone())), Some(Box::new(fallback.clone())));

        let outcome = loader.load_with_outcome(&batch()).await.unwrap();
        assert_eq!(outcome.store, "primary");
        assert_eq!(outcome.rows, 2);
        assert!(!outcome.used_fallback);
        assert_eq!(primary.rows("customers").unwrap().len(), 2);
        assert!(fallback.rows("customers").is_none());
    }

    #[tokio::test]
    async fn test_offline_primary_falls_back() {
        let primary = InMemoryStore::offline("primary");
        let fallback = InMemoryStore::new("fallback");
        let loader = Loader::new(Some(Box::new(primary.clone())), Some(Box::new(fallback.clone())));

        let outcome = loader.load_with_outcome(&batch()).await.unwrap();
        assert!(outcome.used_fallback);
        assert_eq!(outcome.store, "fallback");
        assert_eq!(fallback.rows("customers").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_primary_falls_back() {
        let fallback = InMemoryStore::new("fallback");
        let loader = Loader::new(None, Some(Box::new(fallback.clone())));
        assert!(loader.load(&batch()).await);
        assert_eq!(fallback.row_count("customers").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_both_unavailable_is_failure() {
        let loader = Loader::new(
            Some(Box::new(InMemoryStore::offline("primary"))),
            Some(Box::new(InMemoryStore::offline("fallback"))),
        );
        assert!(!loader.load(&batch()).await);

        let loader = Loader::new(Some(Box::new(InMemoryStore::offline("primary"))), None);
        let err = loader.load_with_outcome(&batch()).await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_invalid_batch_touches_no_store() {
        let primary = InMemoryStore::new("primary");
        let loader = Loader::new(Some(Box::new(primary.clone())), None);

        let empty = RecordBatch::from_customers(&[]);
        assert!(!loader.load(&empty).await);

        let wrong_table = RecordBatch::new(
            "unknown_table",
            vec!["id".to_string()],
            vec![vec![SqlValue::Integer(1)]],
        );
        assert!(!loader.load(&wrong_table).await);
        assert_eq!(primary.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_replace_is_idempotent_and_creation_happens_once() {
        let primary = InMemoryStore::new("primary");
        let loader = Loader::new(Some(Box::new(primary.clone())), None);

        let first = loader.load_with_outcome(&batch()).await.unwrap();
        let second = loader.load_with_outcome(&batch()).await.unwrap();

        assert_eq!(primary.create_calls(), 1);
        assert_eq!(primary.rows("customers").unwrap().len(), 2);
        assert_eq!(first.fingerprint, second.fingerprint);
    }
}
