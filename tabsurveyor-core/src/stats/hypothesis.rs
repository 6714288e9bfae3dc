//! Hypothesis tests: Student's two-sample t-test and Shapiro-Wilk normality.

use std::f64::consts::PI;

use serde::Serialize;
use tracing::debug;

use super::{SIGNIFICANCE_LEVEL, math};
use crate::table::Table;
use crate::{Result, TabSurveyorError};

/// Largest sample the Shapiro-Wilk test is run on.
pub const SHAPIRO_WILK_MAX_SAMPLES: usize = 5000;

const T_TEST: &str = "Student's t-test";
const SHAPIRO_WILK: &str = "Shapiro-Wilk test";

/// Size and mean of one group in a two-sample test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    /// Group label
    pub label: String,
    /// Number of present values
    pub count: usize,
    /// Mean of the group
    pub mean: f64,
}

/// Outcome of a hypothesis test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HypothesisTestResult {
    /// Name of the test
    pub test: &'static str,
    /// Test statistic (t or W)
    pub statistic: f64,
    /// p-value
    pub p_value: f64,
    /// Degrees of freedom, for tests that have them
    pub degrees_of_freedom: Option<f64>,
    /// Number of observations used
    pub sample_size: usize,
    /// Per-group summaries for two-sample tests
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupSummary>,
}

impl HypothesisTestResult {
    /// Whether the null hypothesis is rejected at [`SIGNIFICANCE_LEVEL`].
    pub fn is_significant(&self) -> bool {
        self.p_value < SIGNIFICANCE_LEVEL
    }
}

/// Result of [`normality_test`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormalityOutcome {
    /// The test ran
    Tested(HypothesisTestResult),
    /// The sample is too large; inspect a histogram instead
    Inapplicable {
        /// Number of present values
        sample_size: usize,
        /// Largest supported sample
        limit: usize,
    },
}

/// Student's two-sample t-test with pooled variance.
///
/// `group_column` must have exactly two distinct present values; groups
/// are ordered by first appearance and the statistic is `mean(first) -
/// mean(second)` over its standard error.
pub fn t_test(table: &Table, value_column: &str, group_column: &str) -> Result<HypothesisTestResult> {
    let values = table.column(value_column)?;
    if !values.is_numeric() {
        return Err(TabSurveyorError::non_numeric(value_column));
    }
    let groups = table.column(group_column)?;

    let mut labels: Vec<String> = Vec::new();
    for row in 0..groups.len() {
        if let Some(label) = groups.text(row)
            && !labels.iter().any(|l| l == label.as_ref())
        {
            labels.push(label.into_owned());
        }
    }
    if labels.len() != 2 {
        return Err(TabSurveyorError::UnsupportedGroupCount {
            column: group_column.to_string(),
            found: labels.len(),
        });
    }

    let mut samples: [Vec<f64>; 2] = [Vec::new(), Vec::new()];
    for row in 0..values.len() {
        let (Some(value), Some(label)) = (values.get_f64(row), groups.text(row)) else {
            continue;
        };
        if let Some(index) = labels.iter().position(|l| l == label.as_ref()) {
            samples[index].push(value);
        }
    }

    let [first, second] = &samples;
    let total = first.len() + second.len();
    if total < 3 {
        return Err(TabSurveyorError::InsufficientData {
            operation: T_TEST,
            required: 3,
            actual: total,
        });
    }
    if first.is_empty() || second.is_empty() {
        return Err(TabSurveyorError::InsufficientData {
            operation: T_TEST,
            required: 1,
            actual: 0,
        });
    }

    let (n1, n2) = (first.len() as f64, second.len() as f64);
    let (m1, m2) = (math::mean(first), math::mean(second));
    let df = n1 + n2 - 2.0;
    let pooled = (sum_of_squares(first, m1) + sum_of_squares(second, m2)) / df;
    let standard_error = (pooled * (1.0 / n1 + 1.0 / n2)).sqrt();

    let statistic = if standard_error > 0.0 {
        (m1 - m2) / standard_error
    } else if m1 == m2 {
        f64::NAN
    } else {
        (m1 - m2).signum() * f64::INFINITY
    };
    let p_value = math::student_t_two_sided(statistic, df);

    debug!(
        "t-test on '{}' by '{}': t={:.4}, df={}",
        value_column, group_column, statistic, df
    );

    Ok(HypothesisTestResult {
        test: T_TEST,
        statistic,
        p_value,
        degrees_of_freedom: Some(df),
        sample_size: total,
        groups: labels
            .into_iter()
            .zip([(first, m1), (second, m2)])
            .map(|(label, (sample, mean))| GroupSummary {
                label,
                count: sample.len(),
                mean,
            })
            .collect(),
    })
}

fn sum_of_squares(values: &[f64], mean: f64) -> f64 {
    values.iter().map(|v| (v - mean).powi(2)).sum()
}

/// Shapiro-Wilk test of normality on the present values of a column.
///
/// Samples larger than [`SHAPIRO_WILK_MAX_SAMPLES`] are not tested.
pub fn normality_test(table: &Table, column: &str) -> Result<NormalityOutcome> {
    let values = table.column(column)?.numeric_values()?;
    let n = values.len();

    if n < 3 {
        return Err(TabSurveyorError::InsufficientData {
            operation: SHAPIRO_WILK,
            required: 3,
            actual: n,
        });
    }
    if n > SHAPIRO_WILK_MAX_SAMPLES {
        debug!("Skipping normality test on '{}': {} samples", column, n);
        return Ok(NormalityOutcome::Inapplicable {
            sample_size: n,
            limit: SHAPIRO_WILK_MAX_SAMPLES,
        });
    }

    let (statistic, p_value) = shapiro_wilk(&values)?;
    Ok(NormalityOutcome::Tested(HypothesisTestResult {
        test: SHAPIRO_WILK,
        statistic,
        p_value,
        degrees_of_freedom: None,
        sample_size: n,
        groups: Vec::new(),
    }))
}

/// Computes the W statistic and its p-value (Royston's approximation).
fn shapiro_wilk(values: &[f64]) -> Result<(f64, f64)> {
    const C1: [f64; 6] = [0.0, 0.221_157, -0.147_981, -2.071_190, 4.434_685, -2.706_056];
    const C2: [f64; 6] = [0.0, 0.042_981, -0.293_762, -1.752_461, 5.682_633, -3.582_633];
    const G: [f64; 2] = [-2.273, 0.459];
    const C3: [f64; 4] = [0.544, -0.399_78, 0.025_054, -6.714e-4];
    const C4: [f64; 4] = [1.3822, -0.778_57, 0.062_767, -0.002_032_2];
    const C5: [f64; 4] = [-1.5861, -0.310_82, -0.083_751, 0.003_891_5];
    const C6: [f64; 3] = [-0.4803, -0.082_676, 0.003_030_2];

    let x = math::sorted(values);
    let n = x.len();
    let half = n / 2;

    if x[n - 1] - x[0] == 0.0 {
        return Err(TabSurveyorError::InapplicableTest {
            test: SHAPIRO_WILK,
            reason: "all values are identical".to_string(),
        });
    }

    let nf = n as f64;
    let coefficients: Vec<f64> = if n == 3 {
        vec![0.5_f64.sqrt()]
    } else {
        let m: Vec<f64> = (0..half)
            .map(|i| math::normal_quantile((i as f64 + 1.0 - 0.375) / (nf + 0.25)))
            .collect();
        let summ2 = 2.0 * m.iter().map(|v| v * v).sum::<f64>();
        let ssumm2 = summ2.sqrt();
        let rsn = 1.0 / nf.sqrt();

        let a1 = math::polynomial(&C1, rsn) - m[0] / ssumm2;
        let mut a = vec![0.0; half];
        a[0] = a1;

        let (first_free, fac) = if n > 5 {
            let a2 = -m[1] / ssumm2 + math::polynomial(&C2, rsn);
            a[1] = a2;
            let fac = ((summ2 - 2.0 * m[0] * m[0] - 2.0 * m[1] * m[1])
                / (1.0 - 2.0 * a1 * a1 - 2.0 * a2 * a2))
                .sqrt();
            (2, fac)
        } else {
            let fac = ((summ2 - 2.0 * m[0] * m[0]) / (1.0 - 2.0 * a1 * a1)).sqrt();
            (1, fac)
        };

        for (coefficient, quantile) in a.iter_mut().zip(&m).skip(first_free) {
            *coefficient = -quantile / fac;
        }
        a
    };

    let mean = math::mean(&x);
    let ss: f64 = x.iter().map(|v| (v - mean).powi(2)).sum();
    let numerator: f64 = coefficients
        .iter()
        .enumerate()
        .map(|(i, a)| a * (x[n - 1 - i] - x[i]))
        .sum();
    let w = (numerator * numerator / ss).min(1.0);

    let p_value = if n == 3 {
        (6.0 / PI * (w.sqrt().asin() - PI / 3.0)).clamp(0.0, 1.0)
    } else if w >= 1.0 {
        1.0
    } else {
        let mut y = (1.0 - w).ln();
        let (m, s) = if n <= 11 {
            let gamma = math::polynomial(&G, nf);
            if y >= gamma {
                return Ok((w, 0.0));
            }
            y = -(gamma - y).ln();
            (math::polynomial(&C3, nf), math::polynomial(&C4, nf).exp())
        } else {
            let ln_n = nf.ln();
            (math::polynomial(&C5, ln_n), math::polynomial(&C6, ln_n).exp())
        };
        math::normal_sf((y - m) / s)
    };

    Ok((w, p_value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn two_group_table() -> Table {
        let values = (1..=10).map(|v| Some(f64::from(v))).collect();
        let groups = (0..10)
            .map(|i| Some(if i < 5 { "control" } else { "treatment" }))
            .collect();
        Table::new(vec![
            Column::numeric("score", values),
            Column::categorical("group", groups),
        ])
        .unwrap()
    }

    fn numeric_table(values: Vec<f64>) -> Table {
        Table::new(vec![Column::numeric(
            "v",
            values.into_iter().map(Some).collect(),
        )])
        .unwrap()
    }

    #[test]
    fn test_t_test_known_values() {
        let result = t_test(&two_group_table(), "score", "group").unwrap();
        assert!((result.statistic + 5.0).abs() < 1e-12);
        assert_eq!(result.degrees_of_freedom, Some(8.0));
        assert!((result.p_value - 0.001_052_825_8).abs() < 1e-8);
        assert!(result.is_significant());
        assert_eq!(result.groups[0].label, "control");
        assert_eq!(result.groups[1].count, 5);
    }

    #[test]
    fn test_t_test_three_groups() {
        let table = Table::new(vec![
            Column::numeric("v", vec![Some(1.0), Some(2.0), Some(3.0)]),
            Column::categorical("g", vec![Some("a"), Some("b"), Some("c")]),
        ])
        .unwrap();
        let error = t_test(&table, "v", "g").unwrap_err();
        assert!(matches!(
            error,
            TabSurveyorError::UnsupportedGroupCount { found: 3, .. }
        ));
        assert!(error.is_recoverable());
    }

    #[test]
    fn test_t_test_missing_values_excluded() {
        let table = Table::new(vec![
            Column::numeric("v", vec![Some(1.0), None, Some(3.0), Some(4.0), Some(6.0)]),
            Column::categorical("g", vec![Some("a"), Some("b"), None, Some("b"), Some("a")]),
        ])
        .unwrap();
        let result = t_test(&table, "v", "g").unwrap();
        // only rows 0, 3 and 4 have both a value and a group
        assert_eq!(result.sample_size, 3);
        assert_eq!(result.groups[0].count, 2);
        assert_eq!(result.groups[1].count, 1);
    }

    #[test]
    fn test_t_test_insufficient_data() {
        let table = Table::new(vec![
            Column::numeric("v", vec![Some(1.0), Some(2.0)]),
            Column::categorical("g", vec![Some("a"), Some("b")]),
        ])
        .unwrap();
        assert!(matches!(
            t_test(&table, "v", "g"),
            Err(TabSurveyorError::InsufficientData { required: 3, .. })
        ));

        let table = Table::new(vec![
            Column::numeric("v", vec![Some(1.0), Some(2.0), Some(3.0), None]),
            Column::categorical("g", vec![Some("a"), Some("a"), Some("a"), Some("b")]),
        ])
        .unwrap();
        assert!(matches!(
            t_test(&table, "v", "g"),
            Err(TabSurveyorError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_t_test_requires_numeric_values() {
        let table = two_group_table();
        assert!(matches!(
            t_test(&table, "group", "group"),
            Err(TabSurveyorError::NonNumericColumn { .. })
        ));
    }

    #[test]
    fn test_shapiro_wilk_three_points() {
        let outcome = normality_test(&numeric_table(vec![1.0, 2.0, 3.0]), "v").unwrap();
        let NormalityOutcome::Tested(result) = outcome else {
            panic!("expected a test result");
        };
        assert!((result.statistic - 1.0).abs() < 1e-12);
        assert!((result.p_value - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_shapiro_wilk_accepts_normal_scores() {
        let n = 50;
        let values = (1..=n)
            .map(|i| math::normal_quantile((f64::from(i) - 0.375) / (f64::from(n) + 0.25)))
            .collect();
        let NormalityOutcome::Tested(result) = normality_test(&numeric_table(values), "v").unwrap()
        else {
            panic!("expected a test result");
        };
        assert!(result.statistic > 0.98);
        assert!(result.p_value > 0.5);
        assert!(!result.is_significant());
    }

    #[test]
    fn test_shapiro_wilk_rejects_skewed_data() {
        let values = (0..20).map(|i| 2.0_f64.powi(i)).collect();
        let NormalityOutcome::Tested(result) = normality_test(&numeric_table(values), "v").unwrap()
        else {
            panic!("expected a test result");
        };
        assert!(result.statistic < 0.9);
        assert!(result.is_significant());
    }

    #[test]
    fn test_shapiro_wilk_reference_sample() {
        let values = vec![
            148.0, 154.0, 158.0, 160.0, 161.0, 162.0, 166.0, 170.0, 182.0, 195.0, 236.0,
        ];
        let NormalityOutcome::Tested(result) = normality_test(&numeric_table(values), "v").unwrap()
        else {
            panic!("expected a test result");
        };
        assert!((result.statistic - 0.7888).abs() < 1e-3);
        assert!((result.p_value - 0.0067).abs() < 1e-3);
    }

    #[test]
    fn test_shapiro_wilk_small_sample() {
        let values = vec![2.1, 3.4, 1.9, 5.6, 4.2, 3.3, 2.8];
        let NormalityOutcome::Tested(result) = normality_test(&numeric_table(values), "v").unwrap()
        else {
            panic!("expected a test result");
        };
        assert!(result.statistic > 0.0 && result.statistic <= 1.0);
        assert!((0.0..=1.0).contains(&result.p_value));
    }

    #[test]
    fn test_normality_sample_limits() {
        assert!(matches!(
            normality_test(&numeric_table(vec![1.0, 2.0]), "v"),
            Err(TabSurveyorError::InsufficientData { actual: 2, .. })
        ));

        let large = (0..6000).map(f64::from).collect();
        assert_eq!(
            normality_test(&numeric_table(large), "v").unwrap(),
            NormalityOutcome::Inapplicable {
                sample_size: 6000,
                limit: SHAPIRO_WILK_MAX_SAMPLES,
            }
        );
    }

    #[test]
    fn test_constant_sample_is_inapplicable() {
        let error = normality_test(&numeric_table(vec![4.0; 10]), "v").unwrap_err();
        assert!(matches!(error, TabSurveyorError::InapplicableTest { .. }));
    }
}
