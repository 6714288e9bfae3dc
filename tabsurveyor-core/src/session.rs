//! Analysis session: one loaded dataset and the warnings its analyses raised.
//!
//! The session replaces ambient UI state with an explicit context object.
//! Each analysis runs through [`AnalysisSession::run`], which turns
//! recoverable failures into [`AnalysisWarning`]s so that one failed test
//! never affects the results computed before or after it.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::chart::{ChartKind, ChartRequest, PreparedChart, prepare};
use crate::config::AppConfig;
use crate::filter::{FilterSpec, View, apply};
use crate::loader::{DatasetCache, LoadedDataset};
use crate::quality::{QualityReport, audit};
use crate::report::{ReportDocument, assemble};
use crate::schema::{ColumnClassification, classify};
use crate::table::Table;
use crate::{Result, TabSurveyorError};

/// A recoverable analysis failure shown next to the analysis that raised it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisWarning {
    /// Name of the failed analysis
    pub operation: String,
    /// User-facing explanation
    pub message: String,
    /// Chart to look at instead, when one helps
    pub suggestion: Option<ChartKind>,
}

impl fmt::Display for AnalysisWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.operation, self.message)?;
        if let Some(chart) = self.suggestion {
            write!(f, " (try a {} chart)", chart)?;
        }
        Ok(())
    }
}

/// Context for analysing one dataset.
#[derive(Debug, Clone)]
pub struct AnalysisSession {
    dataset: Arc<LoadedDataset>,
    classification: ColumnClassification,
    warnings: Vec<AnalysisWarning>,
}

impl AnalysisSession {
    /// Creates a session over a loaded dataset.
    pub fn new(dataset: Arc<LoadedDataset>) -> Self {
        let classification = classify(&dataset.table);
        Self {
            dataset,
            classification,
            warnings: Vec::new(),
        }
    }

    /// Validates an upload, loads it through the cache and opens a session.
    ///
    /// # Arguments
    ///
    /// * `cache` - Dataset cache shared across requests
    /// * `config` - Upload limits
    /// * `bytes` - Raw file content
    /// * `filename` - Name of the uploaded file
    ///
    /// # Errors
    ///
    /// Returns `UploadRejected` when the file breaks a configured limit, and
    /// `Decode` or `Parse` when it cannot be read.
    pub fn open(
        cache: &DatasetCache,
        config: &AppConfig,
        bytes: &[u8],
        filename: &str,
    ) -> Result<Self> {
        config.validate_upload(filename, bytes.len() as u64)?;
        Ok(Self::new(cache.load(bytes, filename)?))
    }

    /// The loaded dataset.
    pub fn dataset(&self) -> &LoadedDataset {
        &self.dataset
    }

    /// The full source table.
    pub fn table(&self) -> &Table {
        &self.dataset.table
    }

    /// Column kinds of the source table.
    pub fn classification(&self) -> &ColumnClassification {
        &self.classification
    }

    /// Applies a filter to the source table.
    pub fn view(&self, spec: &FilterSpec) -> Result<View> {
        apply(self.table(), spec)
    }

    /// Audits the full source table.
    pub fn audit(&self) -> QualityReport {
        audit(self.table())
    }

    /// Assembles the report for the full source table.
    pub fn report(&self) -> ReportDocument {
        assemble(self.table(), &self.dataset.filename)
    }

    /// Validates and prepares a chart over `table`.
    pub fn chart(&mut self, table: &Table, request: &ChartRequest) -> Result<Option<PreparedChart>> {
        let name = format!("{} chart", request.kind);
        self.run(&name, || prepare(table, request))
    }

    /// Runs one analysis.
    ///
    /// `op` captures the table it analyses, usually a filtered view. A
    /// recoverable failure is recorded as a warning and yields `Ok(None)`; an
    /// empty selection yields `Ok(None)` without a warning; any other error is
    /// returned.
    pub fn run<T, F>(&mut self, operation: &str, op: F) -> Result<Option<T>>
    where
        F: FnOnce() -> Result<T>,
    {
        match op() {
            Ok(value) => Ok(Some(value)),
            Err(TabSurveyorError::EmptySelection { what }) => {
                debug!("{} skipped: nothing selected for {}", operation, what);
                Ok(None)
            }
            Err(error) if error.is_recoverable() => {
                warn!("{} failed: {}", operation, error);
                self.warnings.push(AnalysisWarning {
                    operation: operation.to_string(),
                    message: error.to_string(),
                    suggestion: error.suggested_chart(),
                });
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    /// Warnings recorded so far, oldest first.
    pub fn warnings(&self) -> &[AnalysisWarning] {
        &self.warnings
    }

    /// Drops recorded warnings.
    pub fn clear_warnings(&mut self) {
        self.warnings.clear();
    }
}
