//! Error types for the mlexp framework

use thiserror::Error;

/// Result type alias for mlexp operations
pub type Result<T> = std::result::Result<T, MlexpError>;

/// Main error type for the mlexp framework
#[derive(Error, Debug)]
pub enum MlexpError {
    #[error("Data shape error: {0}")]
    DataShape(String),

    #[error("Data content error: {0}")]
    DataContent(String),

    #[error("Unsupported column `{column}` of type {dtype}")]
    UnsupportedColumn { column: String, dtype: String },

    #[error("Id inference error: {0}")]
    IdInference(String),

    #[error("Learner error: {0}")]
    LearnerError(String),

    #[error("Measure error: {0}")]
    MeasureError(String),

    #[error("Tuning error: {0}")]
    TuneError(String),

    #[error("Feature selection error: {0}")]
    FeatSelError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<polars::error::PolarsError> for MlexpError {
    fn from(err: polars::error::PolarsError) -> Self {
        MlexpError::DataContent(err.to_string())
    }
}

impl From<serde_json::Error> for MlexpError {
    fn from(err: serde_json::Error) -> Self {
        MlexpError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MlexpError::DataShape("weights length 3 != 5 rows".to_string());
        assert_eq!(err.to_string(), "Data shape error: weights length 3 != 5 rows");
    }

    #[test]
    fn test_unsupported_column_display() {
        let err = MlexpError::UnsupportedColumn {
            column: "ts".to_string(),
            dtype: "datetime[ms]".to_string(),
        };
        assert!(err.to_string().contains("ts"));
        assert!(err.to_string().contains("datetime[ms]"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: MlexpError = io_err.into();
        assert!(matches!(err, MlexpError::IoError(_)));
    }
}
