//! Value frequency tables.

use std::collections::HashMap;

use serde::Serialize;

use crate::Result;
use crate::table::Table;

/// One value and how often it occurs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyEntry {
    /// Text form of the value
    pub value: String,
    /// Number of rows holding the value
    pub count: usize,
    /// Count as a percentage of all rows, including missing ones
    pub percentage: f64,
}

impl FrequencyEntry {
    /// Percentage rounded to one decimal, e.g. `"66.7"`.
    pub fn display_percentage(&self) -> String {
        format!("{:.1}", self.percentage)
    }
}

/// Most frequent values of a column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyTable {
    /// Column counted
    pub column: String,
    /// Number of rows in the table the percentages refer to
    pub total_rows: usize,
    /// Entries by descending count
    pub entries: Vec<FrequencyEntry>,
}

/// Counts present values of a column.
///
/// Entries are ordered by descending count; ties keep the order in which the
/// values first appear. At most `top_n` entries are returned.
pub fn frequency_table(table: &Table, column: &str, top_n: usize) -> Result<FrequencyTable> {
    let source = table.column(column)?;

    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for row in 0..source.len() {
        let Some(text) = source.text(row) else {
            continue;
        };
        match counts.get_mut(text.as_ref()) {
            Some(count) => *count += 1,
            None => {
                counts.insert(text.to_string(), 1);
                order.push(text.into_owned());
            }
        }
    }

    let total_rows = table.row_count();
    let mut entries: Vec<FrequencyEntry> = order
        .into_iter()
        .map(|value| {
            let count = counts.get(&value).copied().unwrap_or_default();
            FrequencyEntry {
                percentage: count as f64 / total_rows as f64 * 100.0,
                value,
                count,
            }
        })
        .collect();

    // stable sort keeps first-appearance order among equal counts
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries.truncate(top_n);

    Ok(FrequencyTable {
        column: column.to_string(),
        total_rows,
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    #[test]
    fn test_counts_and_percentages() {
        let table = Table::new(vec![Column::categorical(
            "b",
            vec![Some("x"), Some("y"), Some("x")],
        )])
        .unwrap();

        let frequencies = frequency_table(&table, "b", 10).unwrap();
        assert_eq!(frequencies.total_rows, 3);
        assert_eq!(frequencies.entries.len(), 2);
        assert_eq!(frequencies.entries[0].value, "x");
        assert_eq!(frequencies.entries[0].count, 2);
        assert_eq!(frequencies.entries[0].display_percentage(), "66.7");
        assert_eq!(frequencies.entries[1].value, "y");
        assert_eq!(frequencies.entries[1].display_percentage(), "33.3");
    }

    #[test]
    fn test_ties_keep_first_appearance_and_truncate() {
        let table = Table::new(vec![Column::categorical(
            "c",
            vec![Some("b"), Some("a"), Some("c"), Some("a"), Some("c"), Some("b")],
        )])
        .unwrap();

        let frequencies = frequency_table(&table, "c", 2).unwrap();
        let values: Vec<&str> = frequencies.entries.iter().map(|e| e.value.as_str()).collect();
        assert_eq!(values, vec!["b", "a"]);
    }

    #[test]
    fn test_missing_values_count_toward_total_only() {
        let table = Table::new(vec![Column::categorical(
            "c",
            vec![Some("a"), None, None, Some("a")],
        )])
        .unwrap();

        let frequencies = frequency_table(&table, "c", 10).unwrap();
        assert_eq!(frequencies.entries.len(), 1);
        assert!((frequencies.entries[0].percentage - 50.0).abs() < 1e-12);
    }

    #[test]
    fn test_numeric_values_use_text_form() {
        let table = Table::new(vec![Column::numeric(
            "n",
            vec![Some(1.0), Some(2.5), Some(1.0)],
        )])
        .unwrap();
        let frequencies = frequency_table(&table, "n", 10).unwrap();
        assert_eq!(frequencies.entries[0].value, "1");
        assert_eq!(frequencies.entries[1].value, "2.5");
    }
}
