//! Quality auditor facade.
//!
//! Runs completeness and uniqueness analysis over a full source table and
//! assembles the [`QualityReport`].

use tracing::debug;

use crate::table::Table;

use super::completeness::analyze_completeness;
use super::models::QualityReport;
use super::uniqueness::{analyze_uniqueness, first_occurrence_rows};

/// Audits a table for missing values and duplicate rows.
///
/// Always pass the full source table, never a filtered view: the report
/// describes the dataset as loaded.
///
/// # Example
///
/// ```rust,ignore
/// use tabsurveyor_core::quality::audit;
///
/// let report = audit(&dataset.table);
/// println!("Completeness: {}", report.display_completeness());
/// ```
pub fn audit(table: &Table) -> QualityReport {
    let completeness = analyze_completeness(table);
    let uniqueness = analyze_uniqueness(table);

    debug!(
        "Audit: {} missing cells, {} duplicate rows",
        completeness.total_missing, uniqueness.duplicate_row_count
    );

    QualityReport::new(table.row_count() as u64, table.column_count() as u64)
        .with_completeness(completeness)
        .with_uniqueness(uniqueness)
}

/// Drops rows equal to an earlier row, keeping the first occurrence.
pub fn deduplicate(table: &Table) -> Table {
    table.take_rows(&first_occurrence_rows(table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn create_sample() -> Table {
        Table::new(vec![
            Column::numeric("a", vec![Some(1.0), Some(2.0), Some(1.0)]),
            Column::categorical("b", vec![Some("x"), Some("y"), Some("x")]),
        ])
        .unwrap()
    }

    #[test]
    fn test_audit_scenario() {
        let report = audit(&create_sample());

        assert_eq!(report.row_count, 3);
        assert_eq!(report.column_count, 2);
        assert_eq!(report.duplicate_row_count, 1);
        assert_eq!(report.duplicate_rows, vec![0, 2]);
        assert_eq!(report.completeness, 1.0);
        assert_eq!(report.display_completeness(), "100.0%");
        assert_eq!(report.total_missing, 0);
    }

    #[test]
    fn test_concatenated_table_doubles_duplicates() {
        let table = Table::new(vec![
            Column::numeric("id", vec![Some(1.0), Some(2.0), Some(3.0)]),
            Column::categorical("name", vec![Some("a"), Some("b"), None]),
        ])
        .unwrap();
        assert_eq!(audit(&table).duplicate_row_count, 0);

        let doubled = table.concat(&table).unwrap();
        assert_eq!(audit(&doubled).duplicate_row_count, 3);
    }

    #[test]
    fn test_deduplicate_keeps_first() {
        let unique = deduplicate(&create_sample());
        assert_eq!(unique.row_count(), 2);
        assert_eq!(audit(&unique).duplicate_row_count, 0);
        assert_eq!(unique.column("b").unwrap().text(1).as_deref(), Some("y"));
    }

    #[test]
    fn test_audit_empty_table() {
        let table = Table::new(vec![Column::numeric("a", vec![])]).unwrap();
        let report = audit(&table);
        assert_eq!(report.completeness, 1.0);
        assert_eq!(report.duplicate_row_count, 0);
    }
}
