// Data processing pipeline: ingestion, processing, and storage

pub mod ingestion;
pub mod processing;
pub mod storage;

use crate::config::PipelineSettings;
use crate::domain::{CustomerRecord, Dataset, OrderRecord};
use crate::error::{EtlError, Result};
use crate::observability::metrics;
use ingestion::extract;
use processing::{clean_customers, clean_orders, DropReport, TracingObserver};
use serde::Serialize;
use std::any::Any;
use std::collections::BTreeMap;
use std::time::Instant;
use storage::{connect_primary, open_fallback, Loader, RecordBatch};
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

/// Per-dataset counts for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub extracted: usize,
    pub kept: usize,
    pub dropped: usize,
    pub dropped_by_reason: BTreeMap<String, usize>,
    /// Store that received the table, if it was loaded
    pub store: Option<String>,
    pub fingerprint: Option<String>,
}

impl DatasetSummary {
    fn record_cleaning(&mut self, dataset: Dataset, report: &DropReport, kept: usize) {
        self.kept = kept;
        self.dropped = report.dropped(dataset);
        self.dropped_by_reason = report
            .breakdown(dataset)
            .into_iter()
            .map(|(reason, count)| (reason.to_string(), count))
            .collect();
    }
}

/// Result of a complete pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub success: bool,
    pub error: Option<String>,
    pub customers: DatasetSummary,
    pub orders: DatasetSummary,
    pub duration_secs: f64,
}

impl RunSummary {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            success: false,
            error: None,
            customers: DatasetSummary::default(),
            orders: DatasetSummary::default(),
            duration_secs: 0.0,
        }
    }

    pub fn dataset(&self, dataset: Dataset) -> &DatasetSummary {
        match dataset {
            Dataset::Customers => &self.customers,
            Dataset::Orders => &self.orders,
        }
    }
}

struct Cleaned {
    customers: Vec<CustomerRecord>,
    orders: Vec<OrderRecord>,
}

/// Extract → clean → load, run once over the configured input files
#[derive(Clone)]
pub struct Pipeline {
    settings: PipelineSettings,
    loader: Loader,
}

impl Pipeline {
    pub fn new(settings: PipelineSettings, loader: Loader) -> Self {
        Self { settings, loader }
    }

    /// Build a pipeline whose loader targets the configured primary store, with the embedded
    /// fallback store behind it.
    pub async fn from_settings(settings: PipelineSettings) -> Self {
        let primary = connect_primary(&settings.db_config_path).await;
        let fallback = open_fallback(&settings.fallback_db_path);
        Self::new(settings, Loader::new(primary, Some(fallback)))
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run the whole pipeline. Never fails outright: stage failures, and panics inside a stage,
    /// are logged and reported through [`RunSummary::success`].
    pub async fn run(&self) -> RunSummary {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("etl_run", run_id = %run_id);
        async move {
            let started = Instant::now();
            info!("ETL pipeline started");

            let pipeline = self.clone();
            let task = tokio::spawn(
                async move {
                    let mut summary = RunSummary::new(run_id);
                    let result = pipeline.execute(&mut summary).await;
                    (summary, result)
                }
                .in_current_span(),
            );
            let (mut summary, result) = match task.await {
                Ok(done) => done,
                Err(e) => {
                    let reason = if e.is_panic() {
                        format!("stage panicked: {}", panic_message(e.into_panic()))
                    } else {
                        e.to_string()
                    };
                    (RunSummary::new(run_id), Err(EtlError::Unexpected(reason)))
                }
            };

            match result {
                Ok(()) => {
                    summary.success = true;
                    info!(
                        customers = summary.customers.kept,
                        orders = summary.orders.kept,
                        "ETL pipeline completed successfully"
                    );
                }
                Err(e) => {
                    error!(error = %e, "ETL pipeline failed");
                    summary.error = Some(e.to_string());
                }
            }

            summary.duration_secs = started.elapsed().as_secs_f64();
            metrics::run::finished(summary.success);
            summary
        }
        .instrument(span)
        .await
    }

    /// Extract and clean without loading anything
    pub fn validate(&self) -> RunSummary {
        let run_id = Uuid::new_v4();
        let _span = tracing::info_span!("etl_validate", run_id = %run_id).entered();
        let started = Instant::now();
        let mut summary = RunSummary::new(run_id);

        match self.extract_and_clean(&mut summary) {
            Ok(_) => summary.success = true,
            Err(e) => {
                warn!(error = %e, "Validation found no loadable customers");
                summary.error = Some(e.to_string());
            }
        }
        summary.duration_secs = started.elapsed().as_secs_f64();
        summary
    }

    async fn execute(&self, summary: &mut RunSummary) -> Result<()> {
        let cleaned = self.extract_and_clean(summary)?;

        let customers = RecordBatch::from_customers(&cleaned.customers);
        let outcome = self.loader.load_with_outcome(&customers).await?;
        summary.customers.store = Some(outcome.store);
        summary.customers.fingerprint = Some(outcome.fingerprint);

        if cleaned.orders.is_empty() {
            warn!("No orders to load");
            return Ok(());
        }

        let orders = RecordBatch::from_orders(&cleaned.orders);
        let outcome = self.loader.load_with_outcome(&orders).await?;
        summary.orders.store = Some(outcome.store);
        summary.orders.fingerprint = Some(outcome.fingerprint);
        Ok(())
    }

    fn extract_and_clean(&self, summary: &mut RunSummary) -> Result<Cleaned> {
        let customer_rows = extract::extract_customers(&self.settings.customers_path);
        let order_rows = extract::extract_orders(&self.settings.orders_path);
        summary.customers.extracted = customer_rows.len();
        summary.orders.extracted = order_rows.len();

        if customer_rows.is_empty() {
            return Err(EtlError::extraction(
                self.settings.customers_path.display().to_string(),
                "no customer rows extracted",
            ));
        }
        if order_rows.is_empty() {
            return Err(EtlError::extraction(
                self.settings.orders_path.display().to_string(),
                "no order rows extracted",
            ));
        }

        let mut observer = TracingObserver::new();
        let customers = clean_customers(&customer_rows, &mut observer);
        summary
            .customers
            .record_cleaning(Dataset::Customers, observer.report(), customers.len());
        if customers.is_empty() {
            return Err(EtlError::EmptyDataset {
                dataset: Dataset::Customers.to_string(),
            });
        }

        let orders = clean_orders(&order_rows, Some(&customers), &mut observer);
        summary
            .orders
            .record_cleaning(Dataset::Orders, observer.report(), orders.len());
        if orders.is_empty() {
            warn!("No valid orders remain after cleaning");
        }

        Ok(Cleaned { customers, orders })
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Run the pipeline for `settings` against the configured stores; true on success
pub async fn run_pipeline(settings: PipelineSettings) -> bool {
    Pipeline::from_settings(settings).await.run().await.success
}
