//! Strict intermediate rows.
//!
//! Loose extracted rows are converted here, once, into one optional field per expected column.
//! A column that is absent from the source row, or whose cell is empty, becomes `None`; every other
//! value is kept verbatim for the cleaning rules to coerce.

use crate::domain::RawRow;

fn field(row: &RawRow, column: &str) -> Option<String> {
    row.get(column).filter(|v| !v.is_empty()).cloned()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerRow {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub join_date: Option<String>,
}

impl CustomerRow {
    pub fn from_raw(row: &RawRow) -> Self {
        Self {
            id: field(row, "id"),
            name: field(row, "name"),
            email: field(row, "email"),
            join_date: field(row, "join_date"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderRow {
    pub id: Option<String>,
    pub customer_id: Option<String>,
    pub order_date: Option<String>,
    pub total_amount: Option<String>,
}

impl OrderRow {
    pub fn from_raw(row: &RawRow) -> Self {
        Self {
            id: field(row, "id"),
            customer_id: field(row, "customer_id"),
            order_date: field(row, "order_date"),
            total_amount: field(row, "total_amount"),
        }
    }
}
