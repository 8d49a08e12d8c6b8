use chrono::{Months, NaiveDate, NaiveDateTime};
use orders_etl::domain::{CustomerRecord, Dataset, RawRow};
use orders_etl::pipeline::processing::validate::is_valid_email;
use orders_etl::pipeline::processing::{clean_customers, clean_orders_at, DropReason, DropReport};
use rust_decimal::Decimal;
use std::collections::HashSet;

fn row(pairs: &[(&str, &str)]) -> RawRow {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn customer(id: &str, name: &str, email: &str, join_date: &str) -> RawRow {
    row(&[("id", id), ("name", name), ("email", email), ("join_date", join_date)])
}

fn order(id: &str, customer_id: &str, order_date: &str, total_amount: &str) -> RawRow {
    row(&[
        ("id", id),
        ("customer_id", customer_id),
        ("order_date", order_date),
        ("total_amount", total_amount),
    ])
}

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 9, 20)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn messy_customers() -> Vec<RawRow> {
    vec![
        customer("1", "Alice Borderland", "ALICE@gmail.com", "2024-09-08"),
        customer("2", "Agustin Chan", "chan@gmail.com", "2024-09-07"),
        customer("2", "Dup", "dup@gmail.com", "2024-09-07"),
        customer("3", "Alias", "alice@GMAIL.com", "2024-09-07"),
        customer("4.0", "Integral", "integral@example.com", "2024-01-01"),
        customer("4.5", "Fraction", "fraction@example.com", "2024-01-01"),
        customer("5", "Stamped", "stamped@example.com", "2024-01-01T08:30:00Z"),
        customer("6", "", "empty@example.com", "2024-01-01"),
        customer("7", "Late", "late@example.com", "31/12/2024"),
        row(&[("id", "8"), ("name", "No Email"), ("join_date", "2024-01-01")]),
    ]
}

fn messy_orders() -> Vec<RawRow> {
    vec![
        order("10", "1", "2024-09-09", "123.75"),
        order("10", "2", "2024-09-09", "5.00"),
        order("11", "2", "2024-09-19T23:00:00+02:00", "1e2"),
        order("12", "42", "2024-09-10", "20.00"),
        order("13", "1", "2024-09-21", "10.00"),
        order("14", "4", "2014-09-20 12:00:00", "10.00"),
        order("15", "4", "2014-09-20 11:59:59", "10.00"),
        order("16", "5", "2024-09-10", "-3"),
        order("17", "x", "2024-09-10", "3"),
        order("18", "5", "", "3"),
    ]
}

#[test]
fn test_cleaned_customers_hold_every_invariant() {
    let mut report = DropReport::new();
    let customers = clean_customers(&messy_customers(), &mut report);

    let ids: Vec<i64> = customers.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![1, 2, 4, 5]);

    let unique_ids: HashSet<i64> = ids.iter().copied().collect();
    assert_eq!(unique_ids.len(), customers.len());
    let unique_emails: HashSet<&str> = customers.iter().map(|c| c.email.as_str()).collect();
    assert_eq!(unique_emails.len(), customers.len());
    assert!(customers.iter().all(|c| is_valid_email(&c.email)));
    assert!(customers.iter().all(|c| c.email == c.email.to_lowercase()));

    assert_eq!(report.count(Dataset::Customers, DropReason::DuplicateId), 1);
    assert_eq!(report.count(Dataset::Customers, DropReason::DuplicateEmail), 1);
    assert_eq!(report.count(Dataset::Customers, DropReason::InvalidId), 1);
    assert_eq!(report.count(Dataset::Customers, DropReason::MissingField), 2);
    assert_eq!(report.count(Dataset::Customers, DropReason::InvalidDate), 1);
    assert_eq!(report.dropped(Dataset::Customers), 6);
}

#[test]
fn test_cleaned_orders_hold_every_invariant() {
    let mut report = DropReport::new();
    let customers = clean_customers(&messy_customers(), &mut report);
    let orders = clean_orders_at(&messy_orders(), Some(&customers), now(), &mut report);

    let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![10, 11, 14]);

    let known: HashSet<i64> = customers.iter().map(|c| c.id).collect();
    let earliest = now().checked_sub_months(Months::new(120)).unwrap();
    for order in &orders {
        assert!(known.contains(&order.customer_id));
        assert!(order.total_amount > Decimal::ZERO);
        assert!(order.order_date >= earliest && order.order_date <= now());
    }

    // first occurrence of a duplicate id wins
    assert_eq!(orders[0].customer_id, 1);
    assert_eq!(orders[1].total_amount, Decimal::from(100));
    assert_eq!(report.count(Dataset::Orders, DropReason::DuplicateId), 1);
    assert_eq!(report.count(Dataset::Orders, DropReason::UnknownCustomer), 1);
    assert_eq!(report.count(Dataset::Orders, DropReason::FutureDate), 1);
    assert_eq!(report.count(Dataset::Orders, DropReason::ExpiredDate), 1);
    assert_eq!(report.count(Dataset::Orders, DropReason::NonPositiveAmount), 1);
    assert_eq!(report.count(Dataset::Orders, DropReason::InvalidCustomerId), 1);
}

#[test]
fn test_cleaning_is_idempotent() {
    let mut report = DropReport::new();
    let customers = clean_customers(&messy_customers(), &mut report);
    let again_rows: Vec<RawRow> = customers.iter().map(CustomerRecord::to_raw_row).collect();
    assert_eq!(clean_customers(&again_rows, &mut DropReport::new()), customers);

    let orders = clean_orders_at(&messy_orders(), Some(&customers), now(), &mut report);
    let again_rows: Vec<RawRow> = orders.iter().map(|o| o.to_raw_row()).collect();
    let again = clean_orders_at(&again_rows, Some(&customers), now(), &mut DropReport::new());
    assert_eq!(again, orders);
}

#[test]
fn test_standalone_orders_match_full_reference_set() {
    let rows = messy_orders();
    let standalone = clean_orders_at(&rows, None, now(), &mut DropReport::new());

    let everyone: Vec<CustomerRecord> = [1, 2, 4, 5, 42]
        .into_iter()
        .map(|id| CustomerRecord {
            id,
            name: format!("Customer {id}"),
            email: format!("c{id}@example.com"),
            join_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        })
        .collect();
    let referenced = clean_orders_at(&rows, Some(&everyone), now(), &mut DropReport::new());

    assert_eq!(standalone, referenced);
    assert!(standalone.iter().any(|o| o.customer_id == 42));
}
