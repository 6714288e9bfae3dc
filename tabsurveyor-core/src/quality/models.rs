//! Data quality report models.
//!
//! Reports carry counts, ratios and row positions only, never cell values.

use serde::{Deserialize, Serialize};

/// Missing-value metrics for a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMissing {
    /// Column name
    pub column_name: String,
    /// Count of missing cells
    pub missing_count: u64,
    /// Missing ratio (0.0-1.0)
    pub missing_rate: f64,
}

impl ColumnMissing {
    /// Creates new column missing-value metrics.
    pub fn new(column_name: impl Into<String>, missing_count: u64, total: u64) -> Self {
        let column_name = column_name.into();

        if missing_count > total {
            tracing::warn!(
                "Quality metrics anomaly: missing_count ({}) exceeds total ({}) for column '{}'",
                missing_count,
                total,
                column_name
            );
        }

        let missing_rate = if total == 0 {
            0.0
        } else {
            missing_count as f64 / total as f64
        };

        Self {
            column_name,
            missing_count,
            missing_rate: missing_rate.clamp(0.0, 1.0),
        }
    }

    /// Rate as a percentage rounded to one decimal, e.g. `"25.0%"`.
    pub fn display_rate(&self) -> String {
        format!("{:.1}%", self.missing_rate * 100.0)
    }
}

/// Completeness metrics for a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletenessMetrics {
    /// Share of present cells (0.0-1.0)
    pub score: f64,
    /// Per-column missing rates, highest first
    pub column_metrics: Vec<ColumnMissing>,
    /// Total missing cells across all columns
    pub total_missing: u64,
}

impl Default for CompletenessMetrics {
    fn default() -> Self {
        Self {
            score: 1.0,
            column_metrics: Vec::new(),
            total_missing: 0,
        }
    }
}

/// Row duplication metrics for a table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UniquenessMetrics {
    /// Rows equal to an earlier row
    pub duplicate_row_count: u64,
    /// Positions of every row that belongs to a duplicated group
    pub duplicate_rows: Vec<usize>,
}

/// Quality assessment of a full source table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    /// Number of rows
    pub row_count: u64,
    /// Number of columns
    pub column_count: u64,
    /// Completeness ratio (0.0-1.0)
    pub completeness: f64,
    /// Total missing cells
    pub total_missing: u64,
    /// Per-column missing rates, highest first
    pub column_missing: Vec<ColumnMissing>,
    /// Rows equal to an earlier row (keep-first semantics)
    pub duplicate_row_count: u64,
    /// Positions of every row in a duplicated group
    pub duplicate_rows: Vec<usize>,
}

impl QualityReport {
    /// Creates an empty report for a table of the given shape.
    pub fn new(row_count: u64, column_count: u64) -> Self {
        Self {
            row_count,
            column_count,
            completeness: 1.0,
            total_missing: 0,
            column_missing: Vec::new(),
            duplicate_row_count: 0,
            duplicate_rows: Vec::new(),
        }
    }

    /// Sets completeness metrics.
    pub fn with_completeness(mut self, metrics: CompletenessMetrics) -> Self {
        self.completeness = metrics.score;
        self.total_missing = metrics.total_missing;
        self.column_missing = metrics.column_metrics;
        self
    }

    /// Sets uniqueness metrics.
    pub fn with_uniqueness(mut self, metrics: UniquenessMetrics) -> Self {
        self.duplicate_row_count = metrics.duplicate_row_count;
        self.duplicate_rows = metrics.duplicate_rows;
        self
    }

    /// Completeness as a percentage rounded to one decimal, e.g. `"100.0%"`.
    pub fn display_completeness(&self) -> String {
        format!("{:.1}%", self.completeness * 100.0)
    }

    /// Columns that have at least one missing cell.
    pub fn columns_with_missing(&self) -> impl Iterator<Item = &ColumnMissing> {
        self.column_missing.iter().filter(|c| c.missing_count > 0)
    }
}
