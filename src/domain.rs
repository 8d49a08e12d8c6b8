use crate::constants::{CUSTOMERS_TABLE, ORDERS_TABLE};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// One raw, loosely-typed input row: column name to the raw cell text.
/// Columns absent from the source are absent from the map.
pub type RawRow = HashMap<String, String>;

/// Which dataset a row or record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Dataset {
    Customers,
    Orders,
}

impl Dataset {
    pub fn table_name(&self) -> &'static str {
        match self {
            Dataset::Customers => CUSTOMERS_TABLE,
            Dataset::Orders => ORDERS_TABLE,
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// A validated customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub join_date: NaiveDate,
}

impl CustomerRecord {
    pub fn to_raw_row(&self) -> RawRow {
        let mut row = RawRow::new();
        row.insert("id".to_string(), self.id.to_string());
        row.insert("name".to_string(), self.name.clone());
        row.insert("email".to_string(), self.email.clone());
        row.insert("join_date".to_string(), format_date(self.join_date));
        row
    }
}

/// A validated order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: i64,
    pub customer_id: i64,
    pub order_date: NaiveDateTime,
    pub total_amount: Decimal,
}

impl OrderRecord {
    pub fn to_raw_row(&self) -> RawRow {
        let mut row = RawRow::new();
        row.insert("id".to_string(), self.id.to_string());
        row.insert("customer_id".to_string(), self.customer_id.to_string());
        row.insert("order_date".to_string(), format_timestamp(self.order_date));
        row.insert("total_amount".to_string(), self.total_amount.to_string());
        row
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// ISO 8601 text for a timestamp; midnight values are written as a bare date
pub fn format_timestamp(ts: NaiveDateTime) -> String {
    if ts.time() == NaiveTime::MIN {
        format_date(ts.date())
    } else {
        ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp_midnight_is_date_only() {
        let ts = NaiveDate::from_ymd_opt(2024, 9, 9)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(format_timestamp(ts), "2024-09-09");

        let ts = NaiveDate::from_ymd_opt(2024, 9, 9)
            .unwrap()
            .and_hms_opt(14, 5, 0)
            .unwrap();
        assert_eq!(format_timestamp(ts), "2024-09-09 14:05:00");

        let ts = NaiveDate::from_ymd_opt(2015, 6, 1)
            .unwrap()
            .and_hms_milli_opt(12, 0, 0, 950)
            .unwrap();
        assert_eq!(format_timestamp(ts), "2015-06-01 12:00:00.950");
    }

    #[test]
    fn test_dataset_table_names() {
        assert_eq!(Dataset::Customers.to_string(), "customers");
        assert_eq!(Dataset::Orders.table_name(), "orders");
    }
}
