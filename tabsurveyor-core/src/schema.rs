//! Column classification into numeric and categorical kinds.

use serde::{Deserialize, Serialize};

use crate::table::Table;

/// Logical kind of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Numeric values, eligible for statistics
    Numeric,
    /// Text values, eligible for grouping and frequency tables
    Categorical,
}

/// Kinds of every column of a table, in table order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColumnClassification {
    entries: Vec<(String, ColumnKind)>,
}

impl ColumnClassification {
    /// Kind of the named column.
    pub fn kind(&self, name: &str) -> Option<ColumnKind> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, kind)| *kind)
    }

    /// Numeric column names in table order.
    pub fn numeric(&self) -> Vec<&str> {
        self.names_of(ColumnKind::Numeric)
    }

    /// Categorical column names in table order.
    pub fn categorical(&self) -> Vec<&str> {
        self.names_of(ColumnKind::Categorical)
    }

    /// Every column with its kind.
    pub fn entries(&self) -> &[(String, ColumnKind)] {
        &self.entries
    }

    fn names_of(&self, wanted: ColumnKind) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, kind)| *kind == wanted)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Classifies every column of the table.
pub fn classify(table: &Table) -> ColumnClassification {
    let entries = table
        .columns()
        .iter()
        .map(|column| {
            let kind = if column.is_numeric() {
                ColumnKind::Numeric
            } else {
                ColumnKind::Categorical
            };
            (column.name().to_string(), kind)
        })
        .collect();
    ColumnClassification { entries }
}
