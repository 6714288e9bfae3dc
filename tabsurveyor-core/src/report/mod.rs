//! Analysis report documents.
//!
//! A [`ReportDocument`] is a tree of typed sections built once from a table
//! and serialized in a single pass, either to a self-contained HTML page or
//! to Markdown.
//!
//! # Example
//! ```rust,ignore
//! use tabsurveyor_core::report::{assemble, render_html, to_data_uri};
//!
//! let document = assemble(&dataset.table, &dataset.filename);
//! let html = render_html(&document)?;
//! let link = to_data_uri(&html);
//! ```

mod builder;
mod html;
mod markdown;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// Re-export public API
pub use builder::{
    CATEGORICAL_SECTION_LIMIT, FREQUENCY_TOP_N, PREVIEW_ROWS, ReportBuilder, assemble, assemble_at,
};
pub use html::{render_html, to_data_uri};
pub use markdown::render_markdown;

/// Timestamp format shown in reports.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A labelled value shown as a headline figure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    /// Label
    pub label: String,
    /// Formatted value
    pub value: String,
}

impl Metric {
    /// Creates a metric.
    pub fn new(label: impl Into<String>, value: impl ToString) -> Self {
        Self {
            label: label.into(),
            value: value.to_string(),
        }
    }
}

/// A rectangular table of formatted cells.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableBlock {
    /// Optional caption shown above the table
    pub caption: Option<String>,
    /// Header cells
    pub headers: Vec<String>,
    /// Body rows, each as long as `headers`
    pub rows: Vec<Vec<String>>,
}

impl TableBlock {
    /// Creates a table with the given headers and no rows.
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            caption: None,
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Builder method to set the caption.
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Appends a row.
    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }
}

/// Content block inside a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "content", rename_all = "lowercase")]
pub enum Block {
    /// Headline figures
    Metrics(Vec<Metric>),
    /// Tabular data
    Table(TableBlock),
    /// Narrative text
    Text(String),
}

/// A headed group of blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Section heading
    pub heading: String,
    /// Blocks in display order
    pub blocks: Vec<Block>,
}

impl Section {
    /// Creates an empty section.
    pub fn new(heading: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            blocks: Vec::new(),
        }
    }

    /// Builder method to append a block.
    pub fn with_block(mut self, block: Block) -> Self {
        self.blocks.push(block);
        self
    }
}

/// A complete analysis report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDocument {
    /// Document title
    pub title: String,
    /// Name of the analyzed file
    pub filename: String,
    /// When the report was generated
    pub generated_at: NaiveDateTime,
    /// Sections in display order
    pub sections: Vec<Section>,
}

impl ReportDocument {
    /// Generation time formatted for display.
    pub fn display_timestamp(&self) -> String {
        self.generated_at.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Looks up a section by heading.
    pub fn section(&self, heading: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.heading == heading)
    }
}
