//! HTML serialization of report documents.

use askama::Template;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::{Block, Metric, ReportDocument};
use crate::{Result, TabSurveyorError};

/// Flattened block that the template can branch on without matching enums.
struct BlockView<'a> {
    metrics: &'a [Metric],
    is_table: bool,
    caption: &'a str,
    headers: &'a [String],
    rows: &'a [Vec<String>],
    text: &'a str,
}

impl<'a> From<&'a Block> for BlockView<'a> {
    fn from(block: &'a Block) -> Self {
        let empty = Self {
            metrics: &[],
            is_table: false,
            caption: "",
            headers: &[],
            rows: &[],
            text: "",
        };
        match block {
            Block::Metrics(metrics) => Self { metrics, ..empty },
            Block::Table(table) => Self {
                is_table: true,
                caption: table.caption.as_deref().unwrap_or(""),
                headers: &table.headers,
                rows: &table.rows,
                ..empty
            },
            Block::Text(text) => Self { text, ..empty },
        }
    }
}

struct SectionView<'a> {
    heading: &'a str,
    blocks: Vec<BlockView<'a>>,
}

#[derive(Template)]
#[template(path = "report.html")]
struct ReportPage<'a> {
    title: &'a str,
    filename: &'a str,
    generated_at: String,
    sections: Vec<SectionView<'a>>,
}

/// Renders a report as a self-contained HTML page.
///
/// Styles are embedded and the page references no external resources.
/// Cell text is HTML-escaped.
pub fn render_html(document: &ReportDocument) -> Result<String> {
    let page = ReportPage {
        title: &document.title,
        filename: &document.filename,
        generated_at: document.display_timestamp(),
        sections: document
            .sections
            .iter()
            .map(|section| SectionView {
                heading: &section.heading,
                blocks: section.blocks.iter().map(BlockView::from).collect(),
            })
            .collect(),
    };

    page.render()
        .map_err(|e| TabSurveyorError::export_failed("rendering HTML report", e))
}

/// Wraps an HTML page in a `data:` URI usable as a download link target.
pub fn to_data_uri(html: &str) -> String {
    format!("data:text/html;base64,{}", STANDARD.encode(html.as_bytes()))
}
