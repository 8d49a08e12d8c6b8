// Pipeline ingestion: reading source CSV exports into raw rows

pub mod extract;

pub use extract::{extract, extract_customers, extract_orders, read_rows};
