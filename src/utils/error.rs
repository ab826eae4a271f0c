use thiserror::Error;

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("Unsupported file format '{extension}'. Upload a CSV or XLSX file")]
    UnsupportedFormat { extension: String },

    #[error("Uploaded file must contain the following columns: {}", .columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    #[error("Unknown verification endpoint '{name}'")]
    UnknownEndpoint { name: String },

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Spreadsheet processing error: {0}")]
    SpreadsheetError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration '{field}'")]
    MissingConfigError { field: String },

    #[error("Batch processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Configuration,
    Io,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl VerifyError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnsupportedFormat { .. }
            | Self::MissingColumns { .. }
            | Self::CsvError(_)
            | Self::SpreadsheetError(_) => ErrorCategory::Input,
            Self::UnknownEndpoint { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::IoError(_) | Self::ZipError(_) => ErrorCategory::Io,
            Self::SerializationError(_) | Self::ProcessingError { .. } => {
                ErrorCategory::Processing
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Io => ErrorSeverity::Critical,
            ErrorCategory::Processing => ErrorSeverity::Medium,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::UnsupportedFormat { .. } => {
                "Save the upload as .csv or .xlsx and run again".to_string()
            }
            Self::MissingColumns { columns } => format!(
                "Add the column(s) {} to the header row of the upload",
                columns.join(", ")
            ),
            Self::UnknownEndpoint { .. } => {
                "Run with --list-endpoints to see the available verification types".to_string()
            }
            Self::CsvError(_) | Self::SpreadsheetError(_) => {
                "Check that the upload is a well-formed spreadsheet".to_string()
            }
            Self::ConfigValidationError { field, .. }
            | Self::InvalidConfigValueError { field, .. }
            | Self::MissingConfigError { field } => {
                format!("Fix '{}' in the configuration file", field)
            }
            Self::IoError(_) | Self::ZipError(_) => {
                "Check file permissions and free disk space for the output path".to_string()
            }
            Self::SerializationError(_) | Self::ProcessingError { .. } => {
                "Re-run the batch; rows are independent and can be retried".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Input => format!("The uploaded file could not be used: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Io => format!("Could not read or write files: {}", self),
            ErrorCategory::Processing => format!("The batch could not be completed: {}", self),
        }
    }
}

impl From<calamine::XlsxError> for VerifyError {
    fn from(err: calamine::XlsxError) -> Self {
        VerifyError::SpreadsheetError(err.to_string())
    }
}

impl From<calamine::XlsError> for VerifyError {
    fn from(err: calamine::XlsError) -> Self {
        VerifyError::SpreadsheetError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VerifyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_message_lists_every_column() {
        let err = VerifyError::MissingColumns {
            columns: vec!["sno".to_string(), "pan".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Uploaded file must contain the following columns: sno, pan"
        );
        assert_eq!(err.category(), ErrorCategory::Input);
        assert_eq!(err.severity(), ErrorSeverity::High);
    }

    #[test]
    fn test_io_errors_are_critical() {
        let err = VerifyError::IoError(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.user_friendly_message().starts_with("Could not read or write files"));
    }
}
