//! Correlation matrices over numeric columns.
//!
//! Every coefficient is computed from pairwise-complete observations: a row
//! contributes to the pair (a, b) when both values are present. Coefficients
//! that are undefined (fewer than two pairs, zero variance) are NaN.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::math;
use crate::TabSurveyorError;
use crate::table::{Column, Table};

/// Correlation coefficient to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationMethod {
    /// Linear correlation
    #[default]
    Pearson,
    /// Pearson correlation of average ranks
    Spearman,
    /// Kendall's tau-b
    Kendall,
}

impl fmt::Display for CorrelationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pearson => "pearson",
            Self::Spearman => "spearman",
            Self::Kendall => "kendall",
        };
        f.write_str(name)
    }
}

impl FromStr for CorrelationMethod {
    type Err = TabSurveyorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pearson" => Ok(Self::Pearson),
            "spearman" => Ok(Self::Spearman),
            "kendall" => Ok(Self::Kendall),
            other => Err(TabSurveyorError::configuration(format!(
                "unknown correlation method '{}'",
                other
            ))),
        }
    }
}

/// Symmetric correlation matrix over the numeric columns of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    /// Coefficient used
    pub method: CorrelationMethod,
    /// Numeric column names in table order
    pub columns: Vec<String>,
    /// Row-major coefficients, `values[i][j]` for `columns[i]` and `columns[j]`
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    /// Whether the matrix has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Coefficient between two named columns.
    pub fn get(&self, first: &str, second: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == first)?;
        let j = self.columns.iter().position(|c| c == second)?;
        Some(self.values[i][j])
    }
}

/// Sign of a strong correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// r > 0
    Positive,
    /// r < 0
    Negative,
}

/// A pair of columns whose coefficient meets a threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrongPair {
    /// Earlier column in table order
    pub first: String,
    /// Later column in table order
    pub second: String,
    /// Correlation coefficient
    pub coefficient: f64,
    /// Sign of the coefficient
    pub direction: Direction,
}

/// Computes the correlation matrix of all numeric columns.
///
/// With fewer than two numeric columns the matrix is empty.
pub fn correlate(table: &Table, method: CorrelationMethod) -> CorrelationMatrix {
    let numeric: Vec<&Column> = table.columns().iter().filter(|c| c.is_numeric()).collect();

    if numeric.len() < 2 {
        return CorrelationMatrix {
            method,
            columns: Vec::new(),
            values: Vec::new(),
        };
    }

    let size = numeric.len();
    let mut values = vec![vec![f64::NAN; size]; size];
    for i in 0..size {
        for j in i..size {
            let (x, y) = complete_pairs(numeric[i], numeric[j]);
            let r = coefficient(method, &x, &y);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    CorrelationMatrix {
        method,
        columns: numeric.iter().map(|c| c.name().to_string()).collect(),
        values,
    }
}

/// Pairs with `|r| >= threshold`, upper triangle only, in matrix order.
pub fn strong_pairs(matrix: &CorrelationMatrix, threshold: f64) -> Vec<StrongPair> {
    let mut pairs = Vec::new();
    for (i, row) in matrix.values.iter().enumerate() {
        for (j, &r) in row.iter().enumerate().skip(i + 1) {
            if r.is_nan() || r.abs() < threshold {
                continue;
            }
            pairs.push(StrongPair {
                first: matrix.columns[i].clone(),
                second: matrix.columns[j].clone(),
                coefficient: r,
                direction: if r > 0.0 {
                    Direction::Positive
                } else {
                    Direction::Negative
                },
            });
        }
    }
    pairs
}

fn complete_pairs(a: &Column, b: &Column) -> (Vec<f64>, Vec<f64>) {
    (0..a.len())
        .filter_map(|row| Some((a.get_f64(row)?, b.get_f64(row)?)))
        .unzip()
}

fn coefficient(method: CorrelationMethod, x: &[f64], y: &[f64]) -> f64 {
    if x.len() < 2 {
        return f64::NAN;
    }
    match method {
        CorrelationMethod::Pearson => pearson(x, y),
        CorrelationMethod::Spearman => pearson(&math::average_ranks(x), &math::average_ranks(y)),
        CorrelationMethod::Kendall => kendall_tau_b(x, y),
    }
}

fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let mx = math::mean(x);
    let my = math::mean(y);

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let dx = a - mx;
        let dy = b - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx == 0.0 || syy == 0.0 {
        return f64::NAN;
    }
    (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
}

/// Kendall's tau-b, adjusting for ties in either variable.
fn kendall_tau_b(x: &[f64], y: &[f64]) -> f64 {
    let mut concordant = 0_i64;
    let mut discordant = 0_i64;
    let mut tied_x_only = 0_i64;
    let mut tied_y_only = 0_i64;

    for i in 0..x.len() {
        for j in (i + 1)..x.len() {
            let dx = x[i] - x[j];
            let dy = y[i] - y[j];
            match (dx == 0.0, dy == 0.0) {
                (true, true) => {}
                (true, false) => tied_x_only += 1,
                (false, true) => tied_y_only += 1,
                (false, false) if (dx > 0.0) == (dy > 0.0) => concordant += 1,
                (false, false) => discordant += 1,
            }
        }
    }

    let untied_x = (concordant + discordant + tied_y_only) as f64;
    let untied_y = (concordant + discordant + tied_x_only) as f64;
    let denominator = (untied_x * untied_y).sqrt();
    if denominator == 0.0 {
        return f64::NAN;
    }
    (concordant - discordant) as f64 / denominator
}
