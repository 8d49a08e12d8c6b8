//! Order Cleaner

use super::observer::{CleaningObserver, DropReason};
use super::rows::OrderRow;
use super::validate::{coerce_date, coerce_decimal, coerce_integer};
use super::{pass, Indexed};
use crate::constants::MAX_ORDER_AGE_YEARS;
use crate::domain::{CustomerRecord, Dataset, OrderRecord, RawRow};
use chrono::{Months, NaiveDateTime, Utc};
use std::collections::HashSet;

/// Clean a raw order dataset against the current instant.
///
/// `customers` enables referential filtering; pass `None` to validate orders on their own.
pub fn clean_orders(
    rows: &[RawRow],
    customers: Option<&[CustomerRecord]>,
    observer: &mut dyn CleaningObserver,
) -> Vec<OrderRecord> {
    clean_orders_at(rows, customers, Utc::now().naive_utc(), observer)
}

/// Clean a raw order dataset with an explicit processing instant.
///
/// Every row is checked against the same `now`; orders dated after it, or more than
/// [`MAX_ORDER_AGE_YEARS`] before it, are dropped.
pub fn clean_orders_at(
    rows: &[RawRow],
    customers: Option<&[CustomerRecord]>,
    now: NaiveDateTime,
    observer: &mut dyn CleaningObserver,
) -> Vec<OrderRecord> {
    let dataset = Dataset::Orders;
    let staged: Vec<Indexed<OrderRow>> = rows
        .iter()
        .enumerate()
        .map(|(index, raw)| Indexed {
            index,
            value: OrderRow::from_raw(raw),
        })
        .collect();

    let present = pass(staged, dataset, observer, |row| {
        if row.id.is_some() && row.customer_id.is_some() && row.total_amount.is_some() {
            Ok(row)
        } else {
            Err(DropReason::MissingField)
        }
    });

    let with_ids = pass(present, dataset, observer, |row| {
        let id = row.id.as_deref().and_then(coerce_integer).ok_or(DropReason::InvalidId)?;
        Ok((id, row))
    });

    // First occurrence keeps the id even if it fails a later rule
    let mut seen_ids = HashSet::new();
    let unique_ids = pass(with_ids, dataset, observer, |(id, row)| {
        if seen_ids.insert(id) {
            Ok((id, row))
        } else {
            Err(DropReason::DuplicateId)
        }
    });

    let with_customers = pass(unique_ids, dataset, observer, |(id, row)| {
        let customer_id = row
            .customer_id
            .as_deref()
            .and_then(coerce_integer)
            .ok_or(DropReason::InvalidCustomerId)?;
        Ok((id, customer_id, row))
    });

    let dated = pass(with_customers, dataset, observer, |(id, customer_id, row)| {
        let order_date = row
            .order_date
            .as_deref()
            .and_then(coerce_date)
            .ok_or(DropReason::InvalidDate)?;
        Ok((id, customer_id, order_date, row))
    });

    let priced = pass(dated, dataset, observer, |(id, customer_id, order_date, row)| {
        let total_amount = row
            .total_amount
            .as_deref()
            .and_then(coerce_decimal)
            .ok_or(DropReason::InvalidAmount)?;
        if total_amount <= rust_decimal::Decimal::ZERO {
            return Err(DropReason::NonPositiveAmount);
        }
        Ok(OrderRecord {
            id,
            customer_id,
            order_date,
            total_amount,
        })
    });

    let referenced = match customers {
        Some(customers) => {
            let known: HashSet<i64> = customers.iter().map(|c| c.id).collect();
            pass(priced, dataset, observer, |order| {
                if known.contains(&order.customer_id) {
                    Ok(order)
                } else {
                    Err(DropReason::UnknownCustomer)
                }
            })
        }
        None => priced,
    };

    let earliest = now
        .checked_sub_months(Months::new(MAX_ORDER_AGE_YEARS as u32 * 12))
        .unwrap_or(NaiveDateTime::MIN);
    let in_window = pass(referenced, dataset, observer, |order| {
        if order.order_date > now {
            Err(DropReason::FutureDate)
        } else if order.order_date < earliest {
            Err(DropReason::ExpiredDate)
        } else {
            Ok(order)
        }
    });

    observer.pass_finished(dataset, rows.len(), in_window.len());
    in_window.into_iter().map(|i| i.value).collect()
}
