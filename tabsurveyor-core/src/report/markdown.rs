//! Markdown serialization of report documents.

use std::fmt::{self, Display, Formatter};

use super::{Block, ReportDocument, TableBlock};

/// Renders a report as GitHub-flavored Markdown.
pub fn render_markdown(document: &ReportDocument) -> String {
    Markdown(document).to_string()
}

struct Markdown<'a>(&'a ReportDocument);

impl Display for Markdown<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let document = self.0;
        writeln!(f, "# {}", document.title)?;
        writeln!(f)?;
        writeln!(f, "- **File:** {}", escape_cell(&document.filename))?;
        writeln!(f, "- **Generated:** {}", document.display_timestamp())?;

        for section in &document.sections {
            writeln!(f)?;
            writeln!(f, "## {}", section.heading)?;
            for block in &section.blocks {
                writeln!(f)?;
                match block {
                    Block::Metrics(metrics) => {
                        for metric in metrics {
                            writeln!(f, "- **{}:** {}", metric.label, metric.value)?;
                        }
                    }
                    Block::Table(table) => write_table(f, table)?,
                    Block::Text(text) => writeln!(f, "{}", text)?,
                }
            }
        }
        Ok(())
    }
}

fn write_table(f: &mut Formatter<'_>, table: &TableBlock) -> fmt::Result {
    if let Some(caption) = &table.caption {
        writeln!(f, "### {}", caption)?;
        writeln!(f)?;
    }
    write_row(f, table.headers.iter())?;
    write_row(f, table.headers.iter().map(|_| "---"))?;
    for row in &table.rows {
        write_row(f, row.iter())?;
    }
    Ok(())
}

fn write_row<I, S>(f: &mut Formatter<'_>, cells: I) -> fmt::Result
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    f.write_str("|")?;
    for cell in cells {
        write!(f, " {} |", escape_cell(cell.as_ref()))?;
    }
    writeln!(f)
}

/// Keeps cell text on one line and out of the column separators.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}
