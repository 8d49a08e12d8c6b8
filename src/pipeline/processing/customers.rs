//! Customer Cleaner

use super::observer::{CleaningObserver, DropReason};
use super::rows::CustomerRow;
use super::validate::{coerce_date, coerce_integer, is_valid_email};
use super::{pass, Indexed};
use crate::domain::{CustomerRecord, Dataset, RawRow};
use std::collections::HashSet;

struct Candidate {
    id: i64,
    name: String,
    email: String,
    join_date: Option<String>,
}

/// Clean a raw customer dataset.
///
/// Rules run in a fixed order, each over the survivors of the previous one:
/// required fields, integer id, unique id, non-blank name, valid lowercased email, unique email,
/// parseable join date. Duplicates keep the earliest row. The input is never modified.
pub fn clean_customers(rows: &[RawRow], observer: &mut dyn CleaningObserver) -> Vec<CustomerRecord> {
    let dataset = Dataset::Customers;
    let staged: Vec<Indexed<CustomerRow>> = rows
        .iter()
        .enumerate()
        .map(|(index, raw)| Indexed {
            index,
            value: CustomerRow::from_raw(raw),
        })
        .collect();

    let present = pass(staged, dataset, observer, |row| match (row.id, row.name, row.email) {
        (Some(id), Some(name), Some(email)) => Ok((id, name, email, row.join_date)),
        _ => Err(DropReason::MissingField),
    });

    let typed = pass(present, dataset, observer, |(id, name, email, join_date)| {
        let id = coerce_integer(&id).ok_or(DropReason::InvalidId)?;
        Ok(Candidate {
            id,
            name,
            email,
            join_date,
        })
    });

    let mut seen_ids = HashSet::new();
    let unique_ids = pass(typed, dataset, observer, |c| {
        if seen_ids.insert(c.id) {
            Ok(c)
        } else {
            Err(DropReason::DuplicateId)
        }
    });

    let named = pass(unique_ids, dataset, observer, |mut c| {
        c.name = c.name.trim().to_string();
        if c.name.is_empty() {
            Err(DropReason::EmptyName)
        } else {
            Ok(c)
        }
    });

    let emailed = pass(named, dataset, observer, |mut c| {
        c.email = c.email.trim().to_lowercase();
        if is_valid_email(&c.email) {
            Ok(c)
        } else {
            Err(DropReason::InvalidEmail)
        }
    });

    let mut seen_emails = HashSet::new();
    let unique_emails = pass(emailed, dataset, observer, |c| {
        if seen_emails.insert(c.email.clone()) {
            Ok(c)
        } else {
            Err(DropReason::DuplicateEmail)
        }
    });

    let dated = pass(unique_emails, dataset, observer, |c| {
        let join_date = c
            .join_date
            .as_deref()
            .and_then(coerce_date)
            .ok_or(DropReason::InvalidDate)?;
        Ok(CustomerRecord {
            id: c.id,
            name: c.name,
            email: c.email,
            join_date: join_date.date(),
        })
    });

    observer.pass_finished(dataset, rows.len(), dated.len());
    dated.into_iter().map(|i| i.value).collect()
}
