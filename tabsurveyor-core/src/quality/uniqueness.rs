//! Uniqueness analysis for data quality assessment.
//!
//! Rows are compared by full-row equality. Each row is reduced to a key that
//! maps column names to cell text through a `BTreeMap`, so keys do not depend
//! on column order and a missing cell only equals another missing cell.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::table::Table;

use super::models::UniquenessMetrics;

/// Analyzes row-level duplication of a table.
pub(super) fn analyze_uniqueness(table: &Table) -> UniquenessMetrics {
    if table.is_empty() {
        return UniquenessMetrics::default();
    }

    let keys = row_keys(table);
    UniquenessMetrics {
        duplicate_row_count: count_duplicate_rows(&keys),
        duplicate_rows: duplicated_group_rows(&keys),
    }
}

/// Positions of the first occurrence of every distinct row.
pub(super) fn first_occurrence_rows(table: &Table) -> Vec<usize> {
    let mut seen: HashSet<String> = HashSet::new();
    row_keys(table)
        .into_iter()
        .enumerate()
        .filter_map(|(row, key)| seen.insert(key).then_some(row))
        .collect()
}

/// Builds a comparable key for every row.
fn row_keys(table: &Table) -> Vec<String> {
    (0..table.row_count())
        .map(|row| {
            let normalized: BTreeMap<&str, Option<Cow<'_, str>>> = table
                .columns()
                .iter()
                .map(|column| (column.name(), column.text(row)))
                .collect();
            serde_json::to_string(&normalized).unwrap_or_default()
        })
        .collect()
}

/// Counts rows equal to an earlier row.
fn count_duplicate_rows(keys: &[String]) -> u64 {
    let mut seen_rows: HashSet<&str> = HashSet::new();
    let mut duplicate_count: u64 = 0;

    for key in keys {
        if !seen_rows.insert(key.as_str()) {
            duplicate_count += 1;
        }
    }

    duplicate_count
}

/// Positions of every row whose key occurs more than once.
fn duplicated_group_rows(keys: &[String]) -> Vec<usize> {
    let mut occurrences: HashMap<&str, usize> = HashMap::new();
    for key in keys {
        *occurrences.entry(key.as_str()).or_default() += 1;
    }

    keys.iter()
        .enumerate()
        .filter(|(_, key)| occurrences.get(key.as_str()).is_some_and(|&n| n > 1))
        .map(|(row, _)| row)
        .collect()
}
