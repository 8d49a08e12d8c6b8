/// Table and column constants to ensure consistency across the codebase
/// These define the contract between extraction, cleaning and the load stage

// Target table names
pub const CUSTOMERS_TABLE: &str = "customers";
pub const ORDERS_TABLE: &str = "orders";

// Column sets required in the CSV header and written to each table, in table order
pub const CUSTOMER_COLUMNS: [&str; 4] = ["id", "name", "email", "join_date"];
pub const ORDER_COLUMNS: [&str; 4] = ["id", "customer_id", "order_date", "total_amount"];

// Orders older than this many years (relative to processing time) are rejected
pub const MAX_ORDER_AGE_YEARS: i32 = 10;

// Default locations, relative to the working directory
pub const DEFAULT_CUSTOMERS_PATH: &str = "data/customers.csv";
pub const DEFAULT_ORDERS_PATH: &str = "data/orders.csv";
pub const DEFAULT_DB_CONFIG_PATH: &str = "config/db_config.json";
pub const DEFAULT_FALLBACK_DB_PATH: &str = "etl_fallback.db";
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_SETTINGS_PATH: &str = "etl.toml";

/// Get the expected columns for a table, or `None` when the table is unknown
pub fn columns_for_table(table: &str) -> Option<&'static [&'static str]> {
    match table {
        CUSTOMERS_TABLE => Some(&CUSTOMER_COLUMNS),
        ORDERS_TABLE => Some(&ORDER_COLUMNS),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_for_known_tables() {
        assert_eq!(columns_for_table("customers"), Some(&CUSTOMER_COLUMNS[..]));
        assert_eq!(columns_for_table("orders"), Some(&ORDER_COLUMNS[..]));
    }

    #[test]
    fn test_columns_for_unknown_table() {
        assert!(columns_for_table("unknown_table").is_none());
    }
}
