use thiserror::Error;

use crate::chart::ValidationError;

/// Failures of the extraction, structuring and charting pipeline.
///
/// Every variant is recoverable at the command that triggered it; none of them
/// should end an interactive session.
#[derive(Error, Debug)]
pub enum DocError {
    #[error("extraction failed: {0}")]
    ExtractionFailure(String),

    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("table has {rows} row(s), at least 2 are required")]
    InsufficientRows { rows: usize },

    #[error("external service error: {0}")]
    ExternalService(String),

    #[error("external service timed out after {seconds} seconds")]
    ExternalServiceTimeout { seconds: u64 },

    #[error("invalid chart configuration: {}", join_reasons(.0))]
    Validation(Vec<ValidationError>),

    #[error("could not parse {format} data: {message}")]
    Parse { format: String, message: String },

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DocError {
    pub fn parse(format: impl Into<String>, message: impl ToString) -> Self {
        Self::Parse {
            format: format.into(),
            message: message.to_string(),
        }
    }
}

fn join_reasons(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartField;

    #[test]
    fn test_validation_message_lists_every_reason() {
        let err = DocError::Validation(vec![
            ValidationError::new(ChartField::X, "column 'a' is not categorical"),
            ValidationError::new(ChartField::Y, "y column is required"),
        ]);
        let message = err.to_string();
        assert!(message.contains("column 'a' is not categorical"));
        assert!(message.contains("y column is required"));
    }
}
