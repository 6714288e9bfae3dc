//! Completeness analysis for data quality assessment.
//!
//! This module counts missing cells per column and over the whole table.

use crate::table::Table;

use super::models::{ColumnMissing, CompletenessMetrics};

/// Analyzes completeness of a table.
///
/// The score is the share of present cells over all cells; an empty table is
/// fully complete. Column metrics are sorted by descending missing rate, with
/// ties kept in table order.
pub(super) fn analyze_completeness(table: &Table) -> CompletenessMetrics {
    let total_rows = table.row_count() as u64;
    let total_cells = total_rows * table.column_count() as u64;

    let mut column_metrics: Vec<ColumnMissing> = table
        .columns()
        .iter()
        .map(|column| ColumnMissing::new(column.name(), column.missing_count() as u64, total_rows))
        .collect();
    column_metrics.sort_by(|a, b| b.missing_rate.total_cmp(&a.missing_rate));

    let total_missing: u64 = column_metrics.iter().map(|c| c.missing_count).sum();

    let score = if total_cells == 0 {
        1.0
    } else {
        1.0 - total_missing as f64 / total_cells as f64
    };

    CompletenessMetrics {
        score,
        column_metrics,
        total_missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    #[test]
    fn test_completeness_all_present() {
        let table = Table::new(vec![
            Column::numeric("id", vec![Some(1.0), Some(2.0), Some(3.0)]),
            Column::categorical("name", vec![Some("Alice"), Some("Bob"), Some("Charlie")]),
        ])
        .unwrap();

        let metrics = analyze_completeness(&table);

        assert!((metrics.score - 1.0).abs() < 0.001);
        assert_eq!(metrics.total_missing, 0);
        assert_eq!(metrics.column_metrics.len(), 2);
    }

    #[test]
    fn test_completeness_with_missing() {
        let table = Table::new(vec![
            Column::numeric("id", vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)]),
            Column::categorical("name", vec![Some("Alice"), None, Some("Charlie"), None]),
            Column::categorical("email", vec![None, Some("b@example.com"), Some("c"), Some("d")]),
        ])
        .unwrap();

        let metrics = analyze_completeness(&table);

        assert_eq!(metrics.total_missing, 3);
        assert!((metrics.score - 0.75).abs() < 1e-12);

        let order: Vec<&str> = metrics
            .column_metrics
            .iter()
            .map(|c| c.column_name.as_str())
            .collect();
        assert_eq!(order, vec!["name", "email", "id"]);
        assert!((metrics.column_metrics[0].missing_rate - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_completeness_ties_keep_table_order() {
        let table = Table::new(vec![
            Column::numeric("b", vec![None, Some(1.0)]),
            Column::numeric("a", vec![Some(1.0), None]),
        ])
        .unwrap();

        let metrics = analyze_completeness(&table);
        assert_eq!(metrics.column_metrics[0].column_name, "b");
        assert_eq!(metrics.column_metrics[1].column_name, "a");
    }

    #[test]
    fn test_completeness_empty_table() {
        let table = Table::new(vec![Column::numeric("id", vec![])]).unwrap();
        let metrics = analyze_completeness(&table);

        assert_eq!(metrics.score, 1.0);
        assert_eq!(metrics.total_missing, 0);
    }

    #[test]
    fn test_completeness_all_missing() {
        let table = Table::new(vec![
            Column::numeric("id", vec![None, None]),
            Column::categorical("name", vec![None::<String>, None]),
        ])
        .unwrap();

        let metrics = analyze_completeness(&table);
        assert_eq!(metrics.score, 0.0);
        assert_eq!(metrics.total_missing, 4);
    }
}
