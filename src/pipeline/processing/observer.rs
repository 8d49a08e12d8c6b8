use crate::domain::Dataset;
use crate::observability::metrics;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

/// Why a row was removed during cleaning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DropReason {
    /// A required field is absent or empty
    MissingField,
    /// `id` is not an integer
    InvalidId,
    /// `id` already seen earlier in the dataset
    DuplicateId,
    /// `name` is blank after trimming
    EmptyName,
    /// `email` does not match the address grammar
    InvalidEmail,
    /// normalised `email` already seen earlier in the dataset
    DuplicateEmail,
    /// `join_date` / `order_date` could not be parsed
    InvalidDate,
    /// `customer_id` is not an integer
    InvalidCustomerId,
    /// `total_amount` is not a number
    InvalidAmount,
    /// `total_amount` is zero or negative
    NonPositiveAmount,
    /// `customer_id` does not reference a retained customer
    UnknownCustomer,
    /// `order_date` is after processing time
    FutureDate,
    /// `order_date` is older than the retention window
    ExpiredDate,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::MissingField => "missing_field",
            DropReason::InvalidId => "invalid_id",
            DropReason::DuplicateId => "duplicate_id",
            DropReason::EmptyName => "empty_name",
            DropReason::InvalidEmail => "invalid_email",
            DropReason::DuplicateEmail => "duplicate_email",
            DropReason::InvalidDate => "invalid_date",
            DropReason::InvalidCustomerId => "invalid_customer_id",
            DropReason::InvalidAmount => "invalid_amount",
            DropReason::NonPositiveAmount => "non_positive_amount",
            DropReason::UnknownCustomer => "unknown_customer",
            DropReason::FutureDate => "future_date",
            DropReason::ExpiredDate => "expired_date",
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives cleaning events. Cleaners never log directly; they report here.
pub trait CleaningObserver {
    /// A row (by its position in the input) was removed from `dataset`
    fn row_dropped(&mut self, dataset: Dataset, row_index: usize, reason: DropReason);

    /// A cleaning pass over `dataset` finished
    fn pass_finished(&mut self, _dataset: Dataset, _rows_in: usize, _rows_out: usize) {}
}

/// Drop counts per dataset and reason
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DropReport {
    counts: BTreeMap<Dataset, BTreeMap<DropReason, usize>>,
    dropped_rows: BTreeMap<Dataset, Vec<usize>>,
}

impl DropReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, dataset: Dataset, reason: DropReason) -> usize {
        self.counts
            .get(&dataset)
            .and_then(|by_reason| by_reason.get(&reason))
            .copied()
            .unwrap_or(0)
    }

    pub fn dropped(&self, dataset: Dataset) -> usize {
        self.counts
            .get(&dataset)
            .map(|by_reason| by_reason.values().sum())
            .unwrap_or(0)
    }

    /// Input positions of dropped rows, in the order they were dropped
    pub fn dropped_rows(&self, dataset: Dataset) -> &[usize] {
        self.dropped_rows
            .get(&dataset)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn breakdown(&self, dataset: Dataset) -> Vec<(DropReason, usize)> {
        self.counts
            .get(&dataset)
            .map(|by_reason| by_reason.iter().map(|(r, c)| (*r, *c)).collect())
            .unwrap_or_default()
    }
}

impl CleaningObserver for DropReport {
    fn row_dropped(&mut self, dataset: Dataset, row_index: usize, reason: DropReason) {
        *self
            .counts
            .entry(dataset)
            .or_default()
            .entry(reason)
            .or_insert(0) += 1;
        self.dropped_rows.entry(dataset).or_default().push(row_index);
    }
}

/// Observer used by the pipeline: logs every drop, feeds metrics, and keeps a [`DropReport`]
#[derive(Debug, Default)]
pub struct TracingObserver {
    report: DropReport,
}

impl TracingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self) -> &DropReport {
        &self.report
    }

    pub fn into_report(self) -> DropReport {
        self.report
    }
}

impl CleaningObserver for TracingObserver {
    fn row_dropped(&mut self, dataset: Dataset, row_index: usize, reason: DropReason) {
        debug!(%dataset, row = row_index, %reason, "Dropped row");
        metrics::cleaning::row_dropped(dataset, reason);
        self.report.row_dropped(dataset, row_index, reason);
    }

    fn pass_finished(&mut self, dataset: Dataset, rows_in: usize, rows_out: usize) {
        metrics::cleaning::pass_finished(dataset, rows_out);
        info!(
            %dataset,
            rows_in,
            rows_out,
            dropped = rows_in - rows_out,
            "Cleaning finished"
        );
        for (reason, count) in self.report.breakdown(dataset) {
            info!(%dataset, %reason, count, "Dropped rows by reason");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_report_counts() {
        let mut report = DropReport::new();
        report.row_dropped(Dataset::Customers, 2, DropReason::DuplicateId);
        report.row_dropped(Dataset::Customers, 5, DropReason::DuplicateId);
        report.row_dropped(Dataset::Customers, 3, DropReason::InvalidEmail);
        report.row_dropped(Dataset::Orders, 0, DropReason::UnknownCustomer);

        assert_eq!(report.count(Dataset::Customers, DropReason::DuplicateId), 2);
        assert_eq!(report.dropped(Dataset::Customers), 3);
        assert_eq!(report.dropped(Dataset::Orders), 1);
        assert_eq!(report.dropped_rows(Dataset::Customers), &[2, 5, 3]);
        assert_eq!(
            report.breakdown(Dataset::Customers),
            vec![(DropReason::DuplicateId, 2), (DropReason::InvalidEmail, 1)]
        );
    }

    #[test]
    fn test_empty_report() {
        let report = DropReport::new();
        assert_eq!(report.dropped(Dataset::Orders), 0);
        assert!(report.dropped_rows(Dataset::Orders).is_empty());
        assert!(report.breakdown(Dataset::Orders).is_empty());
    }

    #[test]
    fn test_tracing_observer_keeps_report() {
        let mut observer = TracingObserver::new();
        observer.row_dropped(Dataset::Orders, 4, DropReason::FutureDate);
        observer.pass_finished(Dataset::Orders, 5, 4);
        assert_eq!(observer.report().count(Dataset::Orders, DropReason::FutureDate), 1);
        assert_eq!(observer.into_report().dropped(Dataset::Orders), 1);
    }
}
