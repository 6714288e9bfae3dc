//! Statistics engine.
//!
//! Stateless operations over a [`Table`](crate::table::Table): descriptive
//! summaries, correlation matrices, hypothesis tests, outlier detection and
//! frequency tables. Every result is an immutable, serializable value.

pub mod correlation;
pub mod describe;
pub mod frequency;
pub mod hypothesis;
pub mod math;
pub mod outliers;

use serde::Serialize;

pub use correlation::{
    CorrelationMatrix, CorrelationMethod, Direction, StrongPair, correlate, strong_pairs,
};
pub use describe::{ColumnSummary, DescriptiveSummary, describe};
pub use frequency::{FrequencyEntry, FrequencyTable, frequency_table};
pub use hypothesis::{
    GroupSummary, HypothesisTestResult, NormalityOutcome, SHAPIRO_WILK_MAX_SAMPLES,
    normality_test, t_test,
};
pub use outliers::{DEFAULT_Z_THRESHOLD, IQR_MULTIPLIER, OutlierMethod, OutlierSet, detect_outliers};

/// Significance level used to interpret p-values.
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Any result produced by the statistics engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "result", rename_all = "snake_case")]
pub enum StatisticsResult {
    /// Output of [`describe`]
    DescriptiveSummary(DescriptiveSummary),
    /// Output of [`correlate`], with the pairs above the requested threshold
    CorrelationMatrix {
        /// The matrix
        matrix: CorrelationMatrix,
        /// Pairs meeting the threshold
        strong_pairs: Vec<StrongPair>,
    },
    /// Output of [`t_test`]
    HypothesisTest(HypothesisTestResult),
    /// Output of [`normality_test`]
    Normality(NormalityOutcome),
    /// Output of [`detect_outliers`]
    OutlierSet(OutlierSet),
    /// Output of [`frequency_table`]
    FrequencyTable(FrequencyTable),
}
