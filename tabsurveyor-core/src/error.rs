//! Error types for the tabular analysis pipeline.
//!
//! Errors fall into two groups. Ingestion errors (`Decode`, `Parse`,
//! `UploadRejected`) abort the pipeline and are reported once. Per-analysis
//! errors (a missing column, an unmet statistical precondition, an empty
//! selection) are recoverable: the session records them as inline warnings
//! and the rest of the results stay usable.
//!
//! Error messages carry column names and counts only, never cell values.

use thiserror::Error;

use crate::chart::ChartKind;

/// Main error type for TabSurveyor operations.
#[derive(Debug, Error)]
pub enum TabSurveyorError {
    /// None of the candidate text encodings could decode the input
    #[error(
        "Could not decode the file with any of [{}]; check that it is a delimited text file",
        .attempted.join(", ")
    )]
    Decode { attempted: Vec<&'static str> },

    /// Delimited text could not be parsed into a table
    #[error("Parse error at line {line}: {message}")]
    Parse { line: u64, message: String },

    /// Table construction violated a structural invariant
    #[error("Invalid table: {message}")]
    InvalidTable { message: String },

    /// A filter or statistic referenced a column that does not exist
    #[error("Column not found: '{column}'")]
    ColumnNotFound { column: String },

    /// A numeric operation was requested on a categorical column
    #[error("Column '{column}' is not numeric")]
    NonNumericColumn { column: String },

    /// A filter specification received two predicates of the same kind
    #[error("Filter already has a {kind} predicate")]
    DuplicatePredicate { kind: &'static str },

    /// A two-group test received a grouping column with the wrong cardinality
    #[error("t-test requires exactly 2 groups in '{column}', found {found}")]
    UnsupportedGroupCount { column: String, found: usize },

    /// A statistical test cannot be applied to this sample
    #[error("{test} is not applicable: {reason}")]
    InapplicableTest { test: &'static str, reason: String },

    /// Not enough observations for the requested operation
    #[error("{operation} needs at least {required} observations, got {actual}")]
    InsufficientData {
        operation: &'static str,
        required: usize,
        actual: usize,
    },

    /// A required multi-selection was empty
    #[error("Nothing selected for {what}")]
    EmptySelection { what: &'static str },

    /// An upload was refused by configuration limits
    #[error("Upload rejected: {reason}")]
    UploadRejected { reason: String },

    /// Configuration or validation error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Serialization or deserialization failed
    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Writing an export or rendering a report failed
    #[error("Export failed: {context}")]
    Export {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Convenience type alias for Results with TabSurveyorError
pub type Result<T> = std::result::Result<T, TabSurveyorError>;

impl TabSurveyorError {
    /// Creates a column-not-found error
    pub fn column_not_found(column: impl Into<String>) -> Self {
        Self::ColumnNotFound {
            column: column.into(),
        }
    }

    /// Creates a non-numeric-column error
    pub fn non_numeric(column: impl Into<String>) -> Self {
        Self::NonNumericColumn {
            column: column.into(),
        }
    }

    /// Creates an invalid-table error
    pub fn invalid_table(message: impl Into<String>) -> Self {
        Self::InvalidTable {
            message: message.into(),
        }
    }

    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates an upload rejection
    pub fn upload_rejected(reason: impl Into<String>) -> Self {
        Self::UploadRejected {
            reason: reason.into(),
        }
    }

    /// Creates an export error with context
    pub fn export_failed<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Export {
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Whether the error only affects a single analysis.
    ///
    /// Recoverable errors are rendered as warnings next to the failed
    /// analysis; everything else aborts the request.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ColumnNotFound { .. }
                | Self::NonNumericColumn { .. }
                | Self::DuplicatePredicate { .. }
                | Self::UnsupportedGroupCount { .. }
                | Self::InapplicableTest { .. }
                | Self::InsufficientData { .. }
                | Self::EmptySelection { .. }
        )
    }

    /// Alternative visualization to offer when a statistical precondition fails.
    pub fn suggested_chart(&self) -> Option<ChartKind> {
        match self {
            Self::UnsupportedGroupCount { .. } => Some(ChartKind::Box),
            Self::InapplicableTest { .. } | Self::InsufficientData { .. } => {
                Some(ChartKind::Histogram)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_lists_encodings() {
        let error = TabSurveyorError::Decode {
            attempted: vec!["utf-8", "shift_jis", "euc-jp"],
        };
        let message = error.to_string();
        assert!(message.contains("utf-8, shift_jis, euc-jp"));
        assert!(message.contains("check that it is a delimited text file"));
        assert!(!error.is_recoverable());
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(TabSurveyorError::column_not_found("price").is_recoverable());
        assert!(
            TabSurveyorError::UnsupportedGroupCount {
                column: "group".to_string(),
                found: 3,
            }
            .is_recoverable()
        );
        assert!(TabSurveyorError::EmptySelection { what: "y axis" }.is_recoverable());
        assert!(!TabSurveyorError::configuration("bad").is_recoverable());
        assert!(
            !TabSurveyorError::Parse {
                line: 3,
                message: "too many fields".to_string(),
            }
            .is_recoverable()
        );
    }

    #[test]
    fn test_suggested_chart() {
        let error = TabSurveyorError::UnsupportedGroupCount {
            column: "group".to_string(),
            found: 1,
        };
        assert_eq!(error.suggested_chart(), Some(ChartKind::Box));

        let error = TabSurveyorError::InapplicableTest {
            test: "Shapiro-Wilk",
            reason: "too many samples".to_string(),
        };
        assert_eq!(error.suggested_chart(), Some(ChartKind::Histogram));

        assert_eq!(
            TabSurveyorError::column_not_found("x").suggested_chart(),
            None
        );
    }

    #[test]
    fn test_error_messages_name_columns() {
        let error = TabSurveyorError::non_numeric("city");
        assert_eq!(error.to_string(), "Column 'city' is not numeric");

        let error = TabSurveyorError::InsufficientData {
            operation: "Shapiro-Wilk test",
            required: 3,
            actual: 2,
        };
        assert_eq!(
            error.to_string(),
            "Shapiro-Wilk test needs at least 3 observations, got 2"
        );
    }
}
