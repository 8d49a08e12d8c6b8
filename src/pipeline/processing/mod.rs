pub mod customers;
pub mod observer;
pub mod orders;
pub mod rows;
pub mod validate;

pub use customers::clean_customers;
pub use observer::{CleaningObserver, DropReason, DropReport, TracingObserver};
pub use orders::{clean_orders, clean_orders_at};

use crate::domain::Dataset;

/// A value tagged with the position of the input row it came from.
/// Every pass keeps survivors in input order, so "first occurrence wins" is decided by `index`.
#[derive(Debug, Clone)]
pub(crate) struct Indexed<T> {
    pub index: usize,
    pub value: T,
}

/// One cleaning step: map each survivor or drop it with a reason, preserving order
pub(crate) fn pass<T, U>(
    items: Vec<Indexed<T>>,
    dataset: Dataset,
    observer: &mut dyn CleaningObserver,
    mut step: impl FnMut(T) -> Result<U, DropReason>,
) -> Vec<Indexed<U>> {
    let mut survivors = Vec::with_capacity(items.len());
    for Indexed { index, value } in items {
        match step(value) {
            Ok(value) => survivors.push(Indexed { index, value }),
            Err(reason) => observer.row_dropped(dataset, index, reason),
        }
    }
    survivors
}
