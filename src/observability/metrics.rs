//! Metrics for the ETL run
//!
//! Recording goes through the `metrics` facade; nothing is emitted until a recorder is installed
//! with [`init`]. Batch runs export by writing the rendered Prometheus text to a file.

use std::fmt;
use std::path::Path;
use std::sync::OnceLock;
use tracing::info;

/// Enum representing all metric names used in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Extract
    ExtractRows,
    ExtractFailures,

    // Clean
    CleanRowsDropped,
    CleanRowsKept,

    // Load
    LoadSuccess,
    LoadFailure,
    LoadRows,
    LoadFallbackActivations,
    LoadDuration,

    // Run
    RunSuccess,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::ExtractRows => "etl_extract_rows_total",
            MetricName::ExtractFailures => "etl_extract_failures_total",
            MetricName::CleanRowsDropped => "etl_clean_rows_dropped_total",
            MetricName::CleanRowsKept => "etl_clean_rows_kept",
            MetricName::LoadSuccess => "etl_load_success_total",
            MetricName::LoadFailure => "etl_load_failure_total",
            MetricName::LoadRows => "etl_load_rows_total",
            MetricName::LoadFallbackActivations => "etl_load_fallback_activations_total",
            MetricName::LoadDuration => "etl_load_duration_seconds",
            MetricName::RunSuccess => "etl_run_success",
        }
    }

    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            ExtractRows,
            ExtractFailures,
            CleanRowsDropped,
            CleanRowsKept,
            LoadSuccess,
            LoadFailure,
            LoadRows,
            LoadFallbackActivations,
            LoadDuration,
            RunSuccess,
        ]
        .into_iter()
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static METRICS_HANDLE: OnceLock<metrics_exporter_prometheus::PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Calling this more than once is a no-op.
pub fn init() -> anyhow::Result<()> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;
    METRICS_HANDLE.set(handle).ok();
    info!("Metrics recorder installed");
    Ok(())
}

/// Render the current metrics in Prometheus text format, if a recorder is installed
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(|handle| handle.render())
}

/// Write the rendered metrics to `path` (textfile collector style)
pub fn render_to_file(path: &Path) -> anyhow::Result<()> {
    let text = render().ok_or_else(|| anyhow::anyhow!("Metrics recorder not installed"))?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, text)?;
    info!(path = %path.display(), "Metrics written");
    Ok(())
}

pub mod extract {
    use super::MetricName;
    use crate::domain::Dataset;

    pub fn rows_extracted(dataset: Dataset, rows: usize) {
        ::metrics::counter!(MetricName::ExtractRows.as_str(), "dataset" => dataset.table_name())
            .increment(rows as u64);
    }

    pub fn extraction_failed(dataset: Dataset) {
        ::metrics::counter!(MetricName::ExtractFailures.as_str(), "dataset" => dataset.table_name())
            .increment(1);
    }
}

pub mod cleaning {
    use super::MetricName;
    use crate::domain::Dataset;
    use crate::pipeline::processing::DropReason;

    pub fn row_dropped(dataset: Dataset, reason: DropReason) {
        ::metrics::counter!(
            MetricName::CleanRowsDropped.as_str(),
            "dataset" => dataset.table_name(),
            "reason" => reason.as_str()
        )
        .increment(1);
    }

    pub fn pass_finished(dataset: Dataset, rows_kept: usize) {
        ::metrics::gauge!(MetricName::CleanRowsKept.as_str(), "dataset" => dataset.table_name())
            .set(rows_kept as f64);
    }
}

pub mod load {
    use super::MetricName;

    pub fn succeeded(table: &str, store: &str, rows: usize, seconds: f64) {
        ::metrics::counter!(
            MetricName::LoadSuccess.as_str(),
            "table" => table.to_string(),
            "store" => store.to_string()
        )
        .increment(1);
        ::metrics::counter!(MetricName::LoadRows.as_str(), "table" => table.to_string())
            .increment(rows as u64);
        ::metrics::histogram!(MetricName::LoadDuration.as_str(), "table" => table.to_string())
            .record(seconds);
    }

    pub fn failed(table: &str) {
        ::metrics::counter!(MetricName::LoadFailure.as_str(), "table" => table.to_string())
            .increment(1);
    }

    pub fn fallback_activated(table: &str) {
        ::metrics::counter!(
            MetricName::LoadFallbackActivations.as_str(),
            "table" => table.to_string()
        )
        .increment(1);
    }
}

pub mod run {
    use super::MetricName;

    pub fn finished(success: bool) {
        ::metrics::gauge!(MetricName::RunSuccess.as_str()).set(if success { 1.0 } else { 0.0 });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_metric_names_are_unique_and_prefixed() {
        let names: Vec<&str> = MetricName::all_metrics().map(|m| m.as_str()).collect();
        let unique: HashSet<&str> = names.iter().copied().collect();
        assert_eq!(names.len(), unique.len());
        assert!(names.iter().all(|n| n.starts_with("etl_")));
    }

    #[test]
    fn test_recording_without_recorder_is_harmless() {
        extract::rows_extracted(crate::domain::Dataset::Customers, 3);
        load::failed("customers");
        run::finished(false);
    }
}
