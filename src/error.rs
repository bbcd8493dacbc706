//! Error types for crm-insights

use thiserror::Error;

/// Main error type for crm-insights
#[derive(Error, Debug)]
pub enum CrmError {
    /// A column every load needs is absent from a source table
    #[error("Schema error: table '{table}' has no '{column}' column")]
    Schema { table: String, column: String },

    /// A cell could not be coerced to its declared type
    #[error("Parse error in table '{table}', row {row}, column '{column}': {value:?}")]
    Parse {
        table: String,
        row: usize,
        column: String,
        value: String,
    },

    /// An optional column a stage depends on is absent
    #[error("Missing column: '{column}' not present in '{table}'")]
    MissingColumn { table: String, column: String },

    /// A stage precondition on the input size was not met
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// A stage could not run because a stage it depends on did not complete
    #[error("Upstream stage '{0}' unavailable")]
    UpstreamUnavailable(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[cfg(feature = "rusqlite-support")]
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl CrmError {
    /// Whether this error means "skip the stage" rather than "the stage failed"
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            CrmError::MissingColumn { .. }
                | CrmError::InsufficientData(_)
                | CrmError::UpstreamUnavailable(_)
        )
    }

    pub(crate) fn missing_column(table: &str, column: &str) -> Self {
        CrmError::MissingColumn {
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}

/// Result type alias for crm-insights operations
pub type Result<T> = std::result::Result<T, CrmError>;
