//! Outlier detection on numeric columns.
//!
//! Two rules are supported: Tukey's IQR fences with a fixed 1.5 multiplier
//! and a z-score threshold over the population standard deviation. Missing
//! values are never outliers.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::math;
use crate::table::Table;
use crate::{Result, TabSurveyorError};

/// Multiplier applied to the interquartile range.
pub const IQR_MULTIPLIER: f64 = 1.5;

/// Default absolute z-score above which a value is an outlier.
pub const DEFAULT_Z_THRESHOLD: f64 = 3.0;

/// Outlier rule.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum OutlierMethod {
    /// Values outside `[Q1 - 1.5 IQR, Q3 + 1.5 IQR]`
    #[default]
    Iqr,
    /// Values with `|z| > threshold`
    ZScore {
        /// Absolute z-score threshold
        threshold: f64,
    },
}

impl OutlierMethod {
    /// Z-score rule with the default threshold.
    pub fn z_score() -> Self {
        Self::ZScore {
            threshold: DEFAULT_Z_THRESHOLD,
        }
    }
}

/// Outliers found in one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierSet {
    /// Column inspected
    pub column: String,
    /// Rule used
    pub method: OutlierMethod,
    /// Values below this bound are outliers
    pub lower_bound: f64,
    /// Values above this bound are outliers
    pub upper_bound: f64,
    /// Row positions of the outliers in the input table
    pub row_indices: Vec<usize>,
    /// Outliers as a fraction of all rows of the input table
    pub ratio: f64,
    /// Input table without the outlier rows
    #[serde(skip)]
    pub clean: Table,
}

impl OutlierSet {
    /// Number of outliers.
    pub fn count(&self) -> usize {
        self.row_indices.len()
    }

    /// Ratio as a percentage rounded to one decimal, e.g. `"16.7%"`.
    pub fn display_ratio(&self) -> String {
        format!("{:.1}%", self.ratio * 100.0)
    }
}

/// Detects outliers in a numeric column.
///
/// # Arguments
/// * `table` - The table to inspect
/// * `column` - Name of a numeric column
/// * `method` - The outlier rule
///
/// # Returns
/// The bounds used, the outlier rows and the table without them. A column
/// whose values are all equal has no z-score outliers.
pub fn detect_outliers(table: &Table, column: &str, method: OutlierMethod) -> Result<OutlierSet> {
    let source = table.column(column)?;
    let values = source.numeric_values()?;
    if values.is_empty() {
        return Err(TabSurveyorError::InsufficientData {
            operation: "outlier detection",
            required: 1,
            actual: 0,
        });
    }

    let (lower_bound, upper_bound) = match method {
        OutlierMethod::Iqr => {
            let sorted = math::sorted(&values);
            let q1 = math::quantile_sorted(&sorted, 0.25);
            let q3 = math::quantile_sorted(&sorted, 0.75);
            let iqr = q3 - q1;
            (q1 - IQR_MULTIPLIER * iqr, q3 + IQR_MULTIPLIER * iqr)
        }
        OutlierMethod::ZScore { threshold } => {
            let mean = math::mean(&values);
            let std_dev = math::population_std(&values);
            (mean - threshold * std_dev, mean + threshold * std_dev)
        }
    };

    let row_indices: Vec<usize> = (0..source.len())
        .filter(|&row| {
            source
                .get_f64(row)
                .is_some_and(|v| v < lower_bound || v > upper_bound)
        })
        .collect();

    let keep: Vec<usize> = (0..table.row_count())
        .filter(|row| row_indices.binary_search(row).is_err())
        .collect();

    let ratio = if table.is_empty() {
        0.0
    } else {
        row_indices.len() as f64 / table.row_count() as f64
    };

    debug!(
        "Found {} outliers in '{}' ({:?})",
        row_indices.len(),
        column,
        method
    );

    Ok(OutlierSet {
        column: column.to_string(),
        method,
        lower_bound,
        upper_bound,
        row_indices,
        ratio,
        clean: table.take_rows(&keep),
    })
}
