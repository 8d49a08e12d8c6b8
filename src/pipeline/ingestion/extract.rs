use crate::constants::{CUSTOMER_COLUMNS, ORDER_COLUMNS};
use crate::domain::{Dataset, RawRow};
use crate::error::{EtlError, Result};
use crate::observability::metrics;
use std::path::Path;
use tracing::{error, info, warn};

/// Read a CSV file with a header row into raw rows, in file order.
///
/// Fails when the file is missing or unreadable, has no header, lacks any of `required` columns,
/// or contains a malformed record.
pub fn read_rows(path: &Path, required: &[&str]) -> Result<Vec<RawRow>> {
    let display = path.display().to_string();
    if !path.is_file() {
        return Err(EtlError::extraction(&display, "file not found"));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    if headers.is_empty() || headers.iter().all(str::is_empty) {
        return Err(EtlError::extraction(&display, "file is empty"));
    }

    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .collect();
    if !missing.is_empty() {
        return Err(EtlError::extraction(
            &display,
            format!("missing required columns: {}", missing.join(", ")),
        ));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.to_string(), v.to_string()))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// Extract one dataset. Failures are logged and surface as an empty result.
pub fn extract(dataset: Dataset, path: &Path) -> Vec<RawRow> {
    let required: &[&str] = match dataset {
        Dataset::Customers => &CUSTOMER_COLUMNS,
        Dataset::Orders => &ORDER_COLUMNS,
    };

    match read_rows(path, required) {
        Ok(rows) => {
            if rows.is_empty() {
                warn!(%dataset, path = %path.display(), "Source file has no data rows");
            } else {
                info!(%dataset, path = %path.display(), rows = rows.len(), "Extracted rows");
            }
            metrics::extract::rows_extracted(dataset, rows.len());
            rows
        }
        Err(e) => {
            error!(%dataset, path = %path.display(), error = %e, "Extraction failed");
            metrics::extract::extraction_failed(dataset);
            Vec::new()
        }
    }
}

pub fn extract_customers(path: &Path) -> Vec<RawRow> {
    extract(Dataset::Customers, path)
}

pub fn extract_orders(path: &Path) -> Vec<RawRow> {
    extract(Dataset::Orders, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_extract_customers_success() {
        let file = csv_file(
            "id,name,email,join_date\n\
             1,Alice Borderland,alice@gmail.com,2024-09-08\n\
             2,Agustin Chan,chan@gmail.com,2024-09-07\n",
        );
        let rows = extract_customers(file.path());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["name"], "Alice Borderland");
        assert_eq!(rows[1]["email"], "chan@gmail.com");
    }

    #[test]
    fn test_extract_orders_keeps_empty_cells() {
        let file = csv_file(
            "id,customer_id,order_date,total_amount\n\
             10,1,2024-09-09,123.75\n\
             12,,2024-09-09,75.75\n",
        );
        let rows = extract_orders(file.path());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["customer_id"], "");
    }

    #[test]
    fn test_missing_file() {
        let err = read_rows(Path::new("non_existent_file.csv"), &CUSTOMER_COLUMNS).unwrap_err();
        assert!(err.to_string().contains("file not found"));
        assert!(extract_customers(Path::new("non_existent_file.csv")).is_empty());
    }

    #[test]
    fn test_missing_required_columns() {
        let file = csv_file("id,name,join_date\n1,Alice,2024-09-08\n");
        let err = read_rows(file.path(), &CUSTOMER_COLUMNS).unwrap_err();
        assert!(err.to_string().contains("email"));
        assert!(extract_customers(file.path()).is_empty());
    }

    #[test]
    fn test_empty_file() {
        let file = csv_file("");
        assert!(read_rows(file.path(), &ORDER_COLUMNS).is_err());
    }

    #[test]
    fn test_header_only_file() {
        let file = csv_file("id,customer_id,order_date,total_amount\n");
        let rows = read_rows(file.path(), &ORDER_COLUMNS).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_malformed_record() {
        let file = csv_file("id,name,email,join_date\n1,Alice,alice@gmail.com\n");
        assert!(read_rows(file.path(), &CUSTOMER_COLUMNS).is_err());
    }

    #[test]
    fn test_quoted_fields_and_extra_columns() {
        let file = csv_file(
            "id,name,email,join_date,segment\n\
             1,\"Doe, John\",john@example.com,2024-09-06,retail\n",
        );
        let rows = read_rows(file.path(), &CUSTOMER_COLUMNS).unwrap();
        assert_eq!(rows[0]["name"], "Doe, John");
        assert_eq!(rows[0]["segment"], "retail");
    }
}
