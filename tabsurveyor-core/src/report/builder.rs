//! Assembles a [`ReportDocument`] from a table.

use chrono::{Local, NaiveDateTime};
use tracing::debug;

use super::{Block, Metric, ReportDocument, Section, TableBlock};
use crate::schema::classify;
use crate::stats::{CorrelationMethod, correlate, describe, frequency_table};
use crate::table::Table;

/// Number of categorical columns that get a frequency table.
pub const CATEGORICAL_SECTION_LIMIT: usize = 5;

/// Number of values listed per frequency table.
pub const FREQUENCY_TOP_N: usize = 10;

/// Number of rows shown in the data preview.
pub const PREVIEW_ROWS: usize = 10;

const DEFAULT_TITLE: &str = "Data Analysis Report";
const MISSING_CELL: &str = "NaN";

/// Builds a report document section by section.
#[derive(Debug, Clone)]
pub struct ReportBuilder<'a> {
    table: &'a Table,
    filename: String,
    title: String,
    generated_at: Option<NaiveDateTime>,
}

impl<'a> ReportBuilder<'a> {
    /// Creates a builder for a table loaded from `filename`.
    pub fn new(table: &'a Table, filename: impl Into<String>) -> Self {
        Self {
            table,
            filename: filename.into(),
            title: DEFAULT_TITLE.to_string(),
            generated_at: None,
        }
    }

    /// Builder method to set the document title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Builder method to fix the generation timestamp.
    pub fn with_timestamp(mut self, generated_at: NaiveDateTime) -> Self {
        self.generated_at = Some(generated_at);
        self
    }

    /// Assembles the document.
    ///
    /// Sections appear in a fixed order; the missing-value and correlation
    /// sections are omitted when they would be empty.
    pub fn build(self) -> ReportDocument {
        let generated_at = self
            .generated_at
            .unwrap_or_else(|| Local::now().naive_local());

        let mut sections = vec![
            self.file_info(generated_at),
            self.overview(),
            self.descriptive(),
        ];
        sections.extend(self.categorical());
        sections.extend(self.missing_values());
        sections.extend(self.correlation());
        sections.push(self.preview());
        sections.push(self.column_types());

        debug!("Assembled report with {} sections", sections.len());

        ReportDocument {
            title: self.title,
            filename: self.filename,
            generated_at,
            sections,
        }
    }

    fn file_info(&self, generated_at: NaiveDateTime) -> Section {
        Section::new("File Information").with_block(Block::Metrics(vec![
            Metric::new("File name", &self.filename),
            Metric::new("Generated at", generated_at.format(super::TIMESTAMP_FORMAT)),
        ]))
    }

    fn overview(&self) -> Section {
        Section::new("Data Overview").with_block(Block::Metrics(vec![
            Metric::new("Rows", self.table.row_count()),
            Metric::new("Columns", self.table.column_count()),
            Metric::new("Missing values", self.table.missing_count()),
        ]))
    }

    fn descriptive(&self) -> Section {
        let section = Section::new("Descriptive Statistics");
        let summary = describe(self.table);
        let summaries = summary.columns();
        let Some(first) = summaries.first() else {
            return section.with_block(Block::Text("No numeric data available.".to_string()));
        };

        let headers =
            std::iter::once(String::new()).chain(summaries.iter().map(|s| s.column.clone()));
        let mut block = TableBlock::new(headers);

        let statistics: Vec<_> = summaries.iter().map(|s| s.statistics()).collect();
        for (position, (label, _)) in first.statistics().iter().enumerate() {
            let mut row = vec![(*label).to_string()];
            row.extend(statistics.iter().map(|s| format_statistic(s[position].1)));
            block.push_row(row);
        }
        section.with_block(Block::Table(block))
    }

    fn categorical(&self) -> Option<Section> {
        let classification = classify(self.table);
        let columns = classification.categorical();
        if columns.is_empty() {
            return None;
        }

        let mut section = Section::new("Categorical Statistics");
        for column in columns.into_iter().take(CATEGORICAL_SECTION_LIMIT) {
            let Ok(frequencies) = frequency_table(self.table, column, FREQUENCY_TOP_N) else {
                continue;
            };
            let mut block =
                TableBlock::new(["Value", "Count", "Percentage (%)"]).with_caption(column);
            for entry in &frequencies.entries {
                block.push_row(vec![
                    entry.value.clone(),
                    entry.count.to_string(),
                    entry.display_percentage(),
                ]);
            }
            section.blocks.push(Block::Table(block));
        }
        Some(section)
    }

    fn missing_values(&self) -> Option<Section> {
        if self.table.missing_count() == 0 {
            return None;
        }

        let rows = self.table.row_count() as f64;
        let mut block = TableBlock::new(["Column", "Missing", "Missing rate (%)"]);
        for column in self.table.columns() {
            let missing = column.missing_count();
            if missing > 0 {
                block.push_row(vec![
                    column.name().to_string(),
                    missing.to_string(),
                    format!("{:.1}", missing as f64 / rows * 100.0),
                ]);
            }
        }
        Some(Section::new("Missing Values").with_block(Block::Table(block)))
    }

    fn correlation(&self) -> Option<Section> {
        let matrix = correlate(self.table, CorrelationMethod::Pearson);
        if matrix.columns.len() < 2 {
            return None;
        }

        let headers = std::iter::once(String::new()).chain(matrix.columns.iter().cloned());
        let mut block = TableBlock::new(headers);
        for (name, values) in matrix.columns.iter().zip(&matrix.values) {
            let mut row = vec![name.clone()];
            row.extend(values.iter().map(|&v| format_statistic(v)));
            block.push_row(row);
        }

        Some(
            Section::new("Correlation Analysis")
                .with_block(Block::Text(
                    "Pearson correlation coefficients between numeric columns range from -1 to 1; \
                     values near 1 indicate a strong positive correlation and values near -1 a \
                     strong negative correlation."
                        .to_string(),
                ))
                .with_block(Block::Table(block)),
        )
    }

    fn preview(&self) -> Section {
        let headers = std::iter::once(String::new())
            .chain(self.table.column_names().into_iter().map(str::to_string));
        let mut block = TableBlock::new(headers);

        let head = self.table.head(PREVIEW_ROWS);
        for row in 0..head.row_count() {
            let mut cells = vec![row.to_string()];
            cells.extend(head.row_text(row).into_iter().map(|cell| {
                cell.map_or_else(|| MISSING_CELL.to_string(), |text| text.into_owned())
            }));
            block.push_row(cells);
        }

        Section::new(format!("Data Preview (first {} rows)", PREVIEW_ROWS))
            .with_block(Block::Table(block))
    }

    fn column_types(&self) -> Section {
        let mut block = TableBlock::new(["Column", "Type", "Non-null", "Null"]);
        for column in self.table.columns() {
            block.push_row(vec![
                column.name().to_string(),
                column.dtype_name().to_string(),
                column.present_count().to_string(),
                column.missing_count().to_string(),
            ]);
        }
        Section::new("Column Types").with_block(Block::Table(block))
    }
}

/// Formats a statistic with six decimals; undefined values print as `NaN`.
fn format_statistic(value: f64) -> String {
    if value.is_nan() {
        MISSING_CELL.to_string()
    } else {
        format!("{:.6}", value)
    }
}

/// Assembles a report stamped with the current local time.
///
/// # Arguments
///
/// * `table` - Full source table
/// * `filename` - Name shown in the file information section
///
/// # Returns
///
/// The report document; only the timestamp differs between calls on the
/// same input.
pub fn assemble(table: &Table, filename: &str) -> ReportDocument {
    ReportBuilder::new(table, filename).build()
}

/// Assembles a report with an explicit timestamp.
pub fn assemble_at(table: &Table, filename: &str, generated_at: NaiveDateTime) -> ReportDocument {
    ReportBuilder::new(table, filename)
        .with_timestamp(generated_at)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_delimited;
    use chrono::NaiveDate;

    fn create_sample_timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn headings(document: &ReportDocument) -> Vec<&str> {
        document.sections.iter().map(|s| s.heading.as_str()).collect()
    }

    fn table_block(section: &Section, index: usize) -> &TableBlock {
        match &section.blocks[index] {
            Block::Table(block) => block,
            other => panic!("expected table block, got {:?}", other),
        }
    }

    #[test]
    fn test_scenario_sections() {
        let table = parse_delimited("a,b\n1,x\n2,y\n1,x\n").unwrap();
        let document = assemble_at(&table, "scenario.csv", create_sample_timestamp());

        assert_eq!(
            headings(&document),
            vec![
                "File Information",
                "Data Overview",
                "Descriptive Statistics",
                "Categorical Statistics",
                "Data Preview (first 10 rows)",
                "Column Types",
            ]
        );
        assert_eq!(document.display_timestamp(), "2024-03-01 09:30:00");

        let frequencies = table_block(document.section("Categorical Statistics").unwrap(), 0);
        assert_eq!(frequencies.caption.as_deref(), Some("b"));
        assert_eq!(frequencies.rows[0], vec!["x", "2", "66.7"]);
        assert_eq!(frequencies.rows[1], vec!["y", "1", "33.3"]);

        let types = table_block(document.section("Column Types").unwrap(), 0);
        assert_eq!(types.rows[0], vec!["a", "int64", "3", "0"]);
        assert_eq!(types.rows[1], vec!["b", "object", "3", "0"]);
    }

    #[test]
    fn test_missing_and_correlation_sections() {
        let table = parse_delimited("x,y,label\n1,2,a\n2,4,\n3,,c\n4,8,d\n").unwrap();
        let document = assemble_at(&table, "data.csv", create_sample_timestamp());

        let missing = table_block(document.section("Missing Values").unwrap(), 0);
        assert_eq!(
            missing.rows,
            vec![
                vec!["y".to_string(), "1".to_string(), "25.0".to_string()],
                vec!["label".to_string(), "1".to_string(), "25.0".to_string()],
            ]
        );

        let correlation = document.section("Correlation Analysis").unwrap();
        assert!(matches!(correlation.blocks[0], Block::Text(_)));
        let matrix = table_block(correlation, 1);
        assert_eq!(matrix.headers, vec!["", "x", "y"]);
        assert_eq!(matrix.rows[0][1], "1.000000");

        let preview = table_block(document.section("Data Preview (first 10 rows)").unwrap(), 0);
        assert_eq!(preview.rows[2], vec!["2", "3", "NaN", "c"]);
    }

    #[test]
    fn test_descriptive_layout() {
        let table = parse_delimited("v\n1\n2\n3\n4\n").unwrap();
        let document = assemble_at(&table, "v.csv", create_sample_timestamp());
        let summary = table_block(document.section("Descriptive Statistics").unwrap(), 0);

        assert_eq!(summary.headers, vec!["", "v"]);
        let labels: Vec<&str> = summary.rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(
            labels,
            vec!["count", "mean", "std", "min", "25%", "50%", "75%", "max"]
        );
        assert_eq!(summary.rows[1][1], "2.500000");
        assert_eq!(summary.rows[4][1], "1.750000");
    }

    #[test]
    fn test_no_numeric_columns() {
        let table = parse_delimited("name\nalice\nbob\n").unwrap();
        let document = assemble_at(&table, "names.csv", create_sample_timestamp());
        let section = document.section("Descriptive Statistics").unwrap();
        assert_eq!(
            section.blocks,
            vec![Block::Text("No numeric data available.".to_string())]
        );
    }

    #[test]
    fn test_categorical_section_limit() {
        let header = "c1,c2,c3,c4,c5,c6,c7";
        let table = parse_delimited(&format!("{}\na,b,c,d,e,f,g\n", header)).unwrap();
        let document = assemble_at(&table, "wide.csv", create_sample_timestamp());
        let section = document.section("Categorical Statistics").unwrap();
        assert_eq!(section.blocks.len(), CATEGORICAL_SECTION_LIMIT);
    }

    #[test]
    fn test_same_input_same_document() {
        let table = parse_delimited("a,b\n1,x\n2,y\n").unwrap();
        let first = assemble_at(&table, "t.csv", create_sample_timestamp());
        let second = assemble_at(&table, "t.csv", create_sample_timestamp());
        assert_eq!(first, second);
    }
}
