//! Descriptive summary of numeric columns.

use serde::{Deserialize, Serialize};

use super::math;
use crate::table::Table;

/// Summary statistics of one numeric column, computed over present values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    /// Column name
    pub column: String,
    /// Number of present values
    pub count: usize,
    /// Arithmetic mean
    pub mean: f64,
    /// Sample standard deviation (n - 1)
    pub std: f64,
    /// Minimum
    pub min: f64,
    /// First quartile
    pub q25: f64,
    /// Median
    pub median: f64,
    /// Third quartile
    pub q75: f64,
    /// Maximum
    pub max: f64,
}

impl ColumnSummary {
    /// Summarizes a set of present values.
    pub fn from_values(column: impl Into<String>, values: &[f64]) -> Self {
        let sorted = math::sorted(values);
        Self {
            column: column.into(),
            count: values.len(),
            mean: math::mean(values),
            std: math::sample_std(values),
            min: sorted.first().copied().unwrap_or(f64::NAN),
            q25: math::quantile_sorted(&sorted, 0.25),
            median: math::quantile_sorted(&sorted, 0.5),
            q75: math::quantile_sorted(&sorted, 0.75),
            max: sorted.last().copied().unwrap_or(f64::NAN),
        }
    }

    /// Statistic labels and values in display order.
    pub fn statistics(&self) -> [(&'static str, f64); 8] {
        [
            ("count", self.count as f64),
            ("mean", self.mean),
            ("std", self.std),
            ("min", self.min),
            ("25%", self.q25),
            ("50%", self.median),
            ("75%", self.q75),
            ("max", self.max),
        ]
    }
}

/// Result of [`describe`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "columns", rename_all = "snake_case")]
pub enum DescriptiveSummary {
    /// One summary per numeric column, in table order
    Columns(Vec<ColumnSummary>),
    /// The table has no numeric columns
    NoNumericColumns,
}

impl DescriptiveSummary {
    /// Column summaries, empty for the marker variant.
    pub fn columns(&self) -> &[ColumnSummary] {
        match self {
            Self::Columns(columns) => columns,
            Self::NoNumericColumns => &[],
        }
    }
}

/// Summarizes every numeric column of the table.
pub fn describe(table: &Table) -> DescriptiveSummary {
    let summaries: Vec<ColumnSummary> = table
        .columns()
        .iter()
        .filter_map(|column| {
            column
                .numeric_values()
                .ok()
                .map(|values| ColumnSummary::from_values(column.name(), &values))
        })
        .collect();

    if summaries.is_empty() {
        DescriptiveSummary::NoNumericColumns
    } else {
        DescriptiveSummary::Columns(summaries)
    }
}
