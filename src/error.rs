use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Extraction failed for {path}: {reason}")]
    Extraction { path: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No valid {dataset} rows remain after cleaning")]
    EmptyDataset { dataset: String },

    #[error("Store '{store}' unreachable: {message}")]
    Connectivity { store: String, message: String },

    #[error("Load rejected for table '{table}': {reason}")]
    Load { table: String, reason: String },

    #[error("Unexpected failure: {0}")]
    Unexpected(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Database error: {message}")]
    Database { message: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[cfg(feature = "db")]
    #[error("libSQL error: {0}")]
    Libsql(#[from] libsql::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EtlError {
    pub fn extraction(path: impl Into<String>, reason: impl Into<String>) -> Self {
        EtlError::Extraction {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn load(table: impl Into<String>, reason: impl Into<String>) -> Self {
        EtlError::Load {
            table: table.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error means the store could not be used at all (as opposed to a failed write)
    pub fn is_unavailable(&self) -> bool {
        matches!(self, EtlError::Config(_) | EtlError::Connectivity { .. })
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
