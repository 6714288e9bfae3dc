//! Filter engine: composable row and column predicates.
//!
//! A [`FilterSpec`] holds at most one predicate of each kind. Applying it to
//! a table never mutates the source; the result is a [`View`] that remembers
//! which source rows it kept. Predicates apply in a fixed order regardless of
//! the order they were added in: numeric range, category membership, column
//! projection, row limit.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::table::Table;
use crate::{Result, TabSurveyorError};

/// A single filter predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// Keep rows whose value is present and within `[min, max]`
    NumericRange {
        /// Numeric column to test
        column: String,
        /// Inclusive lower bound
        min: f64,
        /// Inclusive upper bound
        max: f64,
    },
    /// Keep rows whose value's text form is one of `allowed`
    Membership {
        /// Column to test
        column: String,
        /// Accepted values
        allowed: BTreeSet<String>,
    },
    /// Narrow the output to these columns; empty means all columns
    Projection {
        /// Columns to keep
        columns: Vec<String>,
    },
    /// Keep the first `n` rows of the filtered result
    RowLimit {
        /// Maximum number of rows
        n: usize,
    },
}

impl Predicate {
    /// Short name of the predicate kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::NumericRange { .. } => "numeric range",
            Self::Membership { .. } => "category membership",
            Self::Projection { .. } => "column projection",
            Self::RowLimit { .. } => "row limit",
        }
    }
}

/// A set of predicates, at most one per kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    range: Option<Predicate>,
    membership: Option<Predicate>,
    projection: Option<Predicate>,
    row_limit: Option<Predicate>,
}

impl FilterSpec {
    /// Creates a spec that keeps everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a spec from a list of predicates.
    pub fn from_predicates(predicates: impl IntoIterator<Item = Predicate>) -> Result<Self> {
        predicates
            .into_iter()
            .try_fold(Self::new(), |spec, predicate| spec.with(predicate))
    }

    /// Adds a predicate, failing if one of the same kind is already present.
    pub fn with(mut self, predicate: Predicate) -> Result<Self> {
        let slot = match predicate {
            Predicate::NumericRange { .. } => &mut self.range,
            Predicate::Membership { .. } => &mut self.membership,
            Predicate::Projection { .. } => &mut self.projection,
            Predicate::RowLimit { .. } => &mut self.row_limit,
        };
        if slot.is_some() {
            return Err(TabSurveyorError::DuplicatePredicate {
                kind: predicate.kind_name(),
            });
        }
        *slot = Some(predicate);
        Ok(self)
    }

    /// Adds a numeric range predicate.
    pub fn with_range(self, column: impl Into<String>, min: f64, max: f64) -> Result<Self> {
        self.with(Predicate::NumericRange {
            column: column.into(),
            min,
            max,
        })
    }

    /// Adds a category membership predicate.
    pub fn with_membership<I, S>(self, column: impl Into<String>, allowed: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with(Predicate::Membership {
            column: column.into(),
            allowed: allowed.into_iter().map(Into::into).collect(),
        })
    }

    /// Adds a column projection.
    pub fn with_projection<I, S>(self, columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with(Predicate::Projection {
            columns: columns.into_iter().map(Into::into).collect(),
        })
    }

    /// Adds a row limit.
    pub fn with_row_limit(self, n: usize) -> Result<Self> {
        self.with(Predicate::RowLimit { n })
    }

    /// Predicates in application order.
    pub fn predicates(&self) -> impl Iterator<Item = &Predicate> {
        [
            &self.range,
            &self.membership,
            &self.projection,
            &self.row_limit,
        ]
        .into_iter()
        .flatten()
    }

    /// Whether no predicate is set.
    pub fn is_empty(&self) -> bool {
        self.predicates().next().is_none()
    }
}

/// A table derived from a source table by a filter.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    /// Filtered and projected rows
    pub table: Table,
    /// Source row index of every row in `table`
    pub source_rows: Vec<usize>,
}

/// Applies a filter spec to a table.
pub fn apply(table: &Table, spec: &FilterSpec) -> Result<View> {
    let mut rows: Vec<usize> = (0..table.row_count()).collect();
    let mut columns: Option<&[String]> = None;

    for predicate in spec.predicates() {
        match predicate {
            Predicate::NumericRange { column, min, max } => {
                let source = table.column(column)?;
                if !source.is_numeric() {
                    return Err(TabSurveyorError::non_numeric(column));
                }
                rows.retain(|&r| source.get_f64(r).is_some_and(|v| *min <= v && v <= *max));
            }
            Predicate::Membership { column, allowed } => {
                let source = table.column(column)?;
                rows.retain(|&r| {
                    source
                        .text(r)
                        .is_some_and(|text| allowed.contains(text.as_ref()))
                });
            }
            Predicate::Projection { columns: names } => {
                for name in names {
                    table.column(name)?;
                }
                if !names.is_empty() {
                    columns = Some(names.as_slice());
                }
            }
            Predicate::RowLimit { n } => rows.truncate(*n),
        }
    }

    let mut filtered = table.take_rows(&rows);
    if let Some(names) = columns {
        filtered = filtered.select(names)?;
    }

    debug!(
        "Filter kept {} of {} rows, {} columns",
        filtered.row_count(),
        table.row_count(),
        filtered.column_count()
    );

    Ok(View {
        table: filtered,
        source_rows: rows,
    })
}

/// Minimum and maximum present value of a numeric column.
///
/// Returns `None` when the column has no present values.
pub fn numeric_bounds(table: &Table, column: &str) -> Result<Option<(f64, f64)>> {
    let values = table.column(column)?.numeric_values()?;
    Ok(values.iter().fold(None, |bounds, &v| match bounds {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    }))
}

/// Distinct present values of a column in first-appearance order.
pub fn distinct_values(table: &Table, column: &str) -> Result<Vec<String>> {
    let source = table.column(column)?;
    let mut seen = HashSet::new();
    let mut values = Vec::new();
    for row in 0..source.len() {
        if let Some(text) = source.text(row)
            && seen.insert(text.to_string())
        {
            values.push(text.into_owned());
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn create_sample_table() -> Table {
        Table::new(vec![
            Column::numeric("price", vec![Some(10.0), Some(25.0), None, Some(40.0), Some(5.0)]),
            Column::categorical(
                "city",
                vec![Some("Oslo"), Some("Bergen"), Some("Oslo"), None, Some("Tromsø")],
            ),
            Column::numeric("qty", vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0)]),
        ])
        .unwrap()
    }

    #[test]
    fn test_empty_spec_keeps_everything() {
        let table = create_sample_table();
        let view = apply(&table, &FilterSpec::new()).unwrap();
        assert_eq!(view.table, table);
        assert_eq!(view.source_rows, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_numeric_range_excludes_missing() {
        let table = create_sample_table();
        let spec = FilterSpec::new().with_range("price", 10.0, 40.0).unwrap();
        let view = apply(&table, &spec).unwrap();
        assert_eq!(view.source_rows, vec![0, 1, 3]);
    }

    #[test]
    fn test_range_on_categorical_column_fails() {
        let table = create_sample_table();
        let spec = FilterSpec::new().with_range("city", 0.0, 1.0).unwrap();
        assert!(matches!(
            apply(&table, &spec),
            Err(TabSurveyorError::NonNumericColumn { .. })
        ));
    }

    #[test]
    fn test_membership() {
        let table = create_sample_table();
        let spec = FilterSpec::new()
            .with_membership("city", ["Oslo", "Tromsø"])
            .unwrap();
        let view = apply(&table, &spec).unwrap();
        assert_eq!(view.source_rows, vec![0, 2, 4]);
    }

    #[test]
    fn test_membership_on_numeric_uses_text_form() {
        let table = create_sample_table();
        let spec = FilterSpec::new().with_membership("qty", ["2", "5"]).unwrap();
        let view = apply(&table, &spec).unwrap();
        assert_eq!(view.source_rows, vec![1, 4]);
    }

    #[test]
    fn test_empty_membership_yields_no_rows() {
        let table = create_sample_table();
        let spec = FilterSpec::new()
            .with_membership("city", Vec::<String>::new())
            .unwrap();
        let view = apply(&table, &spec).unwrap();
        assert_eq!(view.table.row_count(), 0);
        assert_eq!(view.table.column_count(), 3);
    }

    #[test]
    fn test_projection_keeps_table_order() {
        let table = create_sample_table();
        let spec = FilterSpec::new().with_projection(["qty", "price"]).unwrap();
        let view = apply(&table, &spec).unwrap();
        assert_eq!(view.table.column_names(), vec!["price", "qty"]);

        let spec = FilterSpec::new()
            .with_projection(Vec::<String>::new())
            .unwrap();
        assert_eq!(apply(&table, &spec).unwrap().table.column_count(), 3);
    }

    #[test]
    fn test_row_limit_applies_last() {
        let table = create_sample_table();
        // Added first, but the limit still applies after the range filter
        let spec = FilterSpec::new()
            .with_row_limit(2)
            .unwrap()
            .with_range("qty", 2.0, 5.0)
            .unwrap();
        let view = apply(&table, &spec).unwrap();
        assert_eq!(view.source_rows, vec![1, 2]);
    }

    #[test]
    fn test_duplicate_predicate_rejected() {
        let result = FilterSpec::from_predicates([
            Predicate::RowLimit { n: 1 },
            Predicate::RowLimit { n: 2 },
        ]);
        assert!(matches!(
            result,
            Err(TabSurveyorError::DuplicatePredicate { kind: "row limit" })
        ));
    }

    #[test]
    fn test_unknown_column_anywhere() {
        let table = create_sample_table();
        for spec in [
            FilterSpec::new().with_range("nope", 0.0, 1.0).unwrap(),
            FilterSpec::new().with_membership("nope", ["a"]).unwrap(),
            FilterSpec::new().with_projection(["price", "nope"]).unwrap(),
        ] {
            assert!(matches!(
                apply(&table, &spec),
                Err(TabSurveyorError::ColumnNotFound { .. })
            ));
        }
    }

    #[test]
    fn test_source_is_not_mutated() {
        let table = create_sample_table();
        let before = table.clone();
        let spec = FilterSpec::new().with_row_limit(1).unwrap();
        let _ = apply(&table, &spec).unwrap();
        assert_eq!(table, before);
    }

    #[test]
    fn test_bounds_and_distinct_values() {
        let table = create_sample_table();
        assert_eq!(numeric_bounds(&table, "price").unwrap(), Some((5.0, 40.0)));
        assert_eq!(
            distinct_values(&table, "city").unwrap(),
            vec!["Oslo", "Bergen", "Tromsø"]
        );

        let empty = Table::new(vec![Column::numeric("x", vec![None])]).unwrap();
        assert_eq!(numeric_bounds(&empty, "x").unwrap(), None);
    }
}
