//! In-memory table model.
//!
//! A [`Table`] is an ordered list of uniquely named [`Column`]s of equal
//! length. Tables are immutable: filtering, projection and outlier removal
//! all build new tables. Each column stores a tagged variant of values where
//! `None` marks a missing cell, which doubles as the presence mask.

use std::borrow::Cow;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{Result, TabSurveyorError};

/// Values of a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "lowercase")]
pub enum ColumnData {
    /// Floating-point values
    Numeric(Vec<Option<f64>>),
    /// Text values
    Categorical(Vec<Option<String>>),
}

impl ColumnData {
    /// Number of cells, including missing ones.
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(values) => values.len(),
            Self::Categorical(values) => values.len(),
        }
    }

    /// Whether the column has no cells.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A named column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    /// Creates a column from arbitrary data.
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Creates a numeric column.
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self::new(name, ColumnData::Numeric(values))
    }

    /// Creates a categorical column.
    pub fn categorical<S: Into<String>>(name: impl Into<String>, values: Vec<Option<S>>) -> Self {
        Self::new(
            name,
            ColumnData::Categorical(values.into_iter().map(|v| v.map(Into::into)).collect()),
        )
    }

    /// Column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column values.
    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the column has no cells.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the column holds numeric data.
    pub fn is_numeric(&self) -> bool {
        matches!(self.data, ColumnData::Numeric(_))
    }

    /// Whether the cell at `row` is missing.
    pub fn is_missing(&self, row: usize) -> bool {
        match &self.data {
            ColumnData::Numeric(values) => values.get(row).is_none_or(Option::is_none),
            ColumnData::Categorical(values) => values.get(row).is_none_or(Option::is_none),
        }
    }

    /// Number of missing cells.
    pub fn missing_count(&self) -> usize {
        match &self.data {
            ColumnData::Numeric(values) => values.iter().filter(|v| v.is_none()).count(),
            ColumnData::Categorical(values) => values.iter().filter(|v| v.is_none()).count(),
        }
    }

    /// Number of present cells.
    pub fn present_count(&self) -> usize {
        self.len() - self.missing_count()
    }

    /// Numeric value at `row`, if the column is numeric and the cell present.
    pub fn get_f64(&self, row: usize) -> Option<f64> {
        match &self.data {
            ColumnData::Numeric(values) => values.get(row).copied().flatten(),
            ColumnData::Categorical(_) => None,
        }
    }

    /// Present values of a numeric column, in row order.
    ///
    /// Returns `NonNumericColumn` for categorical columns.
    pub fn numeric_values(&self) -> Result<Vec<f64>> {
        match &self.data {
            ColumnData::Numeric(values) => Ok(values.iter().flatten().copied().collect()),
            ColumnData::Categorical(_) => Err(TabSurveyorError::non_numeric(&self.name)),
        }
    }

    /// Text form of the cell at `row`, `None` when missing.
    pub fn text(&self, row: usize) -> Option<Cow<'_, str>> {
        match &self.data {
            ColumnData::Numeric(values) => values
                .get(row)
                .copied()
                .flatten()
                .map(|v| Cow::Owned(format_number(v))),
            ColumnData::Categorical(values) => values
                .get(row)
                .and_then(Option::as_deref)
                .map(Cow::Borrowed),
        }
    }

    /// True for a non-empty numeric column with no gaps whose values are all
    /// whole numbers within ±2^53, so each converts to `i64` without loss.
    pub fn is_integral(&self) -> bool {
        match &self.data {
            ColumnData::Numeric(values) => {
                !values.is_empty()
                    && values.iter().all(|v| {
                        v.is_some_and(|x| x.fract() == 0.0 && x.abs() <= MAX_EXACT_INTEGER)
                    })
            }
            ColumnData::Categorical(_) => false,
        }
    }

    /// Storage type label in the vocabulary analysts expect from dataframes.
    pub fn dtype_name(&self) -> &'static str {
        match &self.data {
            ColumnData::Numeric(_) if self.is_integral() => "int64",
            ColumnData::Numeric(_) => "float64",
            ColumnData::Categorical(_) => "object",
        }
    }

    /// Builds a new column from the given row positions.
    pub(crate) fn take(&self, rows: &[usize]) -> Self {
        let data = match &self.data {
            ColumnData::Numeric(values) => {
                ColumnData::Numeric(rows.iter().map(|&r| values.get(r).copied().flatten()).collect())
            }
            ColumnData::Categorical(values) => ColumnData::Categorical(
                rows.iter()
                    .map(|&r| values.get(r).cloned().flatten())
                    .collect(),
            ),
        };
        Self::new(self.name.clone(), data)
    }

    /// Converts the column to its categorical (text) representation.
    fn into_categorical(self) -> Self {
        match self.data {
            ColumnData::Numeric(values) => Self::new(
                self.name,
                ColumnData::Categorical(
                    values.into_iter().map(|v| v.map(format_number)).collect(),
                ),
            ),
            ColumnData::Categorical(_) => self,
        }
    }
}

/// Largest magnitude below which every whole `f64` is exactly an integer.
pub const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Formats a number the way it is written back to delimited text.
///
/// Integral values print without a fractional part so that exported files
/// re-load with the same values.
pub fn format_number(value: f64) -> String {
    format!("{}", value)
}

/// An immutable table of equally long, uniquely named columns.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// Builds a table, enforcing equal column lengths and unique names.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let row_count = columns.first().map_or(0, Column::len);

        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.name()) {
                return Err(TabSurveyorError::invalid_table(format!(
                    "duplicate column name '{}'",
                    column.name()
                )));
            }
            if column.len() != row_count {
                return Err(TabSurveyorError::invalid_table(format!(
                    "column '{}' has {} rows, expected {}",
                    column.name(),
                    column.len(),
                    row_count
                )));
            }
        }

        Ok(Self { columns, row_count })
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Columns in table order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in table order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| TabSurveyorError::column_not_found(name))
    }

    /// Whether a column with this name exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name() == name)
    }

    /// Total number of missing cells.
    pub fn missing_count(&self) -> usize {
        self.columns.iter().map(Column::missing_count).sum()
    }

    /// Builds a table from the given row positions, in the given order.
    pub fn take_rows(&self, rows: &[usize]) -> Self {
        Self {
            columns: self.columns.iter().map(|c| c.take(rows)).collect(),
            row_count: rows.len(),
        }
    }

    /// First `n` rows.
    pub fn head(&self, n: usize) -> Self {
        let rows: Vec<usize> = (0..self.row_count.min(n)).collect();
        self.take_rows(&rows)
    }

    /// Keeps the named columns, in table order.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self> {
        for name in names {
            self.column(name.as_ref())?;
        }
        let columns = self
            .columns
            .iter()
            .filter(|c| names.iter().any(|n| n.as_ref() == c.name()))
            .cloned()
            .collect();
        Ok(Self {
            columns,
            row_count: self.row_count,
        })
    }

    /// Appends the rows of `other`, which must have the same column names.
    ///
    /// A column that is numeric in one table and categorical in the other
    /// becomes categorical.
    pub fn concat(&self, other: &Self) -> Result<Self> {
        if self.column_names() != other.column_names() {
            return Err(TabSurveyorError::invalid_table(
                "cannot concatenate tables with different columns",
            ));
        }

        let columns = self
            .columns
            .iter()
            .zip(&other.columns)
            .map(|(left, right)| concat_columns(left.clone(), right.clone()))
            .collect();
        Self::new(columns)
    }

    /// Text form of every cell in a row, `None` for missing cells.
    pub fn row_text(&self, row: usize) -> Vec<Option<Cow<'_, str>>> {
        self.columns.iter().map(|c| c.text(row)).collect()
    }
}

fn concat_columns(left: Column, right: Column) -> Column {
    let name = left.name.clone();
    match (left.data, right.data) {
        (ColumnData::Numeric(mut a), ColumnData::Numeric(b)) => {
            a.extend(b);
            Column::numeric(name, a)
        }
        (a, b) => {
            let left = Column::new(name.clone(), a).into_categorical();
            let right = Column::new(name.clone(), b).into_categorical();
            match (left.data, right.data) {
                (ColumnData::Categorical(mut a), ColumnData::Categorical(b)) => {
                    a.extend(b);
                    Column::new(name, ColumnData::Categorical(a))
                }
                // into_categorical always yields the categorical variant
                (a, _) => Column::new(name, a),
            }
        }
    }
}
