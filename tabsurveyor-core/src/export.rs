//! Table exporters: CSV, JSON records and xlsx spreadsheets.
//!
//! Every exporter returns the encoded bytes; writing them anywhere is the
//! caller's business. Missing cells become an empty CSV field, a JSON
//! `null` and an absent spreadsheet cell.

use std::fmt;
use std::io::{Cursor, Write as _};
use std::str::FromStr;

use serde::Serialize;
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::stats::{DescriptiveSummary, describe};
use crate::table::{Column, ColumnData, Table};
use crate::{Result, TabSurveyorError};

/// Name of the worksheet holding exported rows.
pub const DATA_SHEET: &str = "Data";

/// Name of the worksheet holding the descriptive summary.
pub const STATISTICS_SHEET: &str = "Statistics";

/// Output file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Comma-separated values
    #[default]
    Csv,
    /// Office Open XML spreadsheet
    Xlsx,
    /// JSON array of records
    Json,
}

impl ExportFormat {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
            Self::Json => "json",
        }
    }

    /// MIME type for downloads.
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Json => "application/json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = TabSurveyorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" | "excel" => Ok(Self::Xlsx),
            "json" => Ok(Self::Json),
            other => Err(TabSurveyorError::configuration(format!(
                "unknown export format '{}'",
                other
            ))),
        }
    }
}

/// What an exported table contains, which decides its download name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    /// A filtered view
    Filtered,
    /// A table with outliers removed
    Clean,
    /// A table with duplicate rows removed
    Unique,
}

impl ExportKind {
    fn prefix(self) -> &'static str {
        match self {
            Self::Filtered => "filtered",
            Self::Clean => "clean",
            Self::Unique => "unique",
        }
    }
}

/// Download name for an export of `filename`.
///
/// A trailing `.csv` is replaced by the format's extension, e.g.
/// `sales.csv` exported as xlsx becomes `filtered_sales.xlsx`.
pub fn export_file_name(kind: ExportKind, filename: &str, format: ExportFormat) -> String {
    let stem = filename.strip_suffix(".csv").unwrap_or(filename);
    format!("{}_{}.{}", kind.prefix(), stem, format.extension())
}

/// Encodes a table in the given format.
///
/// `source` is the table the view was derived from; only the spreadsheet
/// format uses it, for its statistics sheet.
pub fn export(view: &Table, source: &Table, format: ExportFormat) -> Result<Vec<u8>> {
    let bytes = match format {
        ExportFormat::Csv => to_csv_bytes(view)?,
        ExportFormat::Xlsx => to_spreadsheet_bytes(view, source)?,
        ExportFormat::Json => to_json_bytes(view)?,
    };
    debug!(
        "Exported {} rows as {} ({} bytes)",
        view.row_count(),
        format,
        bytes.len()
    );
    Ok(bytes)
}

/// Writes a table as UTF-8 CSV with a header row.
pub fn to_csv_bytes(table: &Table) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let write_error = |e: csv::Error| TabSurveyorError::export_failed("writing CSV", e);

    writer
        .write_record(table.column_names())
        .map_err(write_error)?;
    for row in 0..table.row_count() {
        let cells: Vec<String> = table
            .row_text(row)
            .into_iter()
            .map(|cell| cell.map(|text| text.into_owned()).unwrap_or_default())
            .collect();
        writer.write_record(&cells).map_err(write_error)?;
    }

    writer
        .into_inner()
        .map_err(|e| TabSurveyorError::export_failed("flushing CSV", e.into_error()))
}

/// Writes a table as a pretty-printed JSON array of records.
///
/// Keys keep column order. Columns whose values are all whole numbers within
/// ±2^53 are written as integers, larger ones as floats. Non-ASCII text is
/// written as is.
pub fn to_json_bytes(table: &Table) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(&Records(table)).map_err(|e| TabSurveyorError::Serialization {
        context: "writing JSON records".to_string(),
        source: e,
    })
}

struct Records<'a>(&'a Table);

struct Record<'a> {
    table: &'a Table,
    integral: &'a [bool],
    row: usize,
}

impl Serialize for Records<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let table = self.0;
        let integral: Vec<bool> = table
            .columns()
            .iter()
            .map(Column::is_integral)
            .collect();

        let mut seq = serializer.serialize_seq(Some(table.row_count()))?;
        for row in 0..table.row_count() {
            seq.serialize_element(&Record {
                table,
                integral: &integral,
                row,
            })?;
        }
        seq.end()
    }
}

impl Serialize for Record<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.table.column_count()))?;
        for (column, &integral) in self.table.columns().iter().zip(self.integral) {
            match column.data() {
                ColumnData::Numeric(values) => {
                    let value = values.get(self.row).copied().flatten();
                    if integral {
                        // exact: integral columns stay within ±2^53
                        #[allow(clippy::cast_possible_truncation)]
                        let value = value.map(|v| v as i64);
                        map.serialize_entry(column.name(), &value)?;
                    } else {
                        map.serialize_entry(column.name(), &value)?;
                    }
                }
                ColumnData::Categorical(values) => {
                    let value = values.get(self.row).and_then(Option::as_deref);
                    map.serialize_entry(column.name(), &value)?;
                }
            }
        }
        map.end()
    }
}

/// Writes an xlsx workbook.
///
/// The `Data` sheet holds the view. When `source` has numeric columns a
/// `Statistics` sheet holds its descriptive summary, one column per numeric
/// column.
pub fn to_spreadsheet_bytes(view: &Table, source: &Table) -> Result<Vec<u8>> {
    let mut sheets = vec![(DATA_SHEET, data_sheet_xml(view))];
    if let DescriptiveSummary::Columns(summaries) = describe(source) {
        let mut grid: Vec<Vec<Option<Cell<'_>>>> = Vec::with_capacity(9);
        let header = std::iter::once(None)
            .chain(summaries.iter().map(|s| Some(Cell::Text(&s.column))))
            .collect();
        grid.push(header);
        for position in 0..8 {
            let mut row = Vec::with_capacity(summaries.len() + 1);
            for (index, summary) in summaries.iter().enumerate() {
                let (label, value) = summary.statistics()[position];
                if index == 0 {
                    row.push(Some(Cell::Text(label)));
                }
                row.push((!value.is_nan()).then_some(Cell::Number(value)));
            }
            grid.push(row);
        }
        sheets.push((STATISTICS_SHEET, sheet_xml(&grid)));
    }

    write_workbook(&sheets)
}

#[derive(Debug, Clone, Copy)]
enum Cell<'a> {
    Number(f64),
    Text(&'a str),
}

fn data_sheet_xml(table: &Table) -> String {
    let header: Vec<Option<Cell<'_>>> = table
        .columns()
        .iter()
        .map(|c| Some(Cell::Text(c.name())))
        .collect();

    let mut grid = Vec::with_capacity(table.row_count() + 1);
    grid.push(header);
    for row in 0..table.row_count() {
        grid.push(table.columns().iter().map(|c| cell_at(c, row)).collect());
    }
    sheet_xml(&grid)
}

fn cell_at(column: &Column, row: usize) -> Option<Cell<'_>> {
    match column.data() {
        ColumnData::Numeric(values) => values.get(row).copied().flatten().map(Cell::Number),
        ColumnData::Categorical(values) => {
            values.get(row).and_then(Option::as_deref).map(Cell::Text)
        }
    }
}

fn sheet_xml(grid: &[Vec<Option<Cell<'_>>>]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (row_index, cells) in grid.iter().enumerate() {
        let row_number = row_index + 1;
        xml.push_str(&format!(r#"<row r="{}">"#, row_number));
        for (column_index, cell) in cells.iter().enumerate() {
            let reference = format!("{}{}", column_letters(column_index), row_number);
            match cell {
                Some(Cell::Number(value)) if value.is_finite() => {
                    xml.push_str(&format!(r#"<c r="{}"><v>{}</v></c>"#, reference, value));
                }
                Some(Cell::Number(value)) => {
                    xml.push_str(&format!(
                        r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                        reference, value
                    ));
                }
                Some(Cell::Text(text)) => {
                    xml.push_str(&format!(
                        r#"<c r="{}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                        reference,
                        escape_xml(text)
                    ));
                }
                None => {}
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

fn write_workbook(sheets: &[(&str, String)]) -> Result<Vec<u8>> {
    let zip_error = |e: zip::result::ZipError| {
        TabSurveyorError::export_failed("writing xlsx container", e)
    };
    let io_error =
        |e: std::io::Error| TabSurveyorError::export_failed("writing xlsx entry", e);

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    let mut parts = vec![
        ("[Content_Types].xml".to_string(), content_types_xml(sheets.len())),
        ("_rels/.rels".to_string(), ROOT_RELS.to_string()),
        ("xl/workbook.xml".to_string(), workbook_xml(sheets)),
        (
            "xl/_rels/workbook.xml.rels".to_string(),
            workbook_rels_xml(sheets.len()),
        ),
    ];
    for (index, (_, xml)) in sheets.iter().enumerate() {
        parts.push((format!("xl/worksheets/sheet{}.xml", index + 1), xml.clone()));
    }

    for (name, content) in parts {
        writer.start_file(name, options).map_err(zip_error)?;
        writer.write_all(content.as_bytes()).map_err(io_error)?;
    }

    let cursor = writer.finish().map_err(zip_error)?;
    Ok(cursor.into_inner())
}

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

fn content_types_xml(sheet_count: usize) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
    );
    for index in 1..=sheet_count {
        xml.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
            index
        ));
    }
    xml.push_str("</Types>");
    xml
}

fn workbook_xml(sheets: &[(&str, String)]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
    );
    for (index, (name, _)) in sheets.iter().enumerate() {
        xml.push_str(&format!(
            r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
            escape_xml(name),
            index + 1,
            index + 1
        ));
    }
    xml.push_str("</sheets></workbook>");
    xml
}

fn workbook_rels_xml(sheet_count: usize) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for index in 1..=sheet_count {
        xml.push_str(&format!(
            r#"<Relationship Id="rId{0}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{0}.xml"/>"#,
            index
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

/// Spreadsheet column letters for a zero-based index: 0 is `A`, 26 is `AA`.
fn column_letters(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Escapes XML markup and drops control characters XML 1.0 cannot carry.
fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            '\t' | '\n' | '\r' => escaped.push(ch),
            c if c.is_control() => {}
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{load, parse_delimited};
    use std::io::Read;
    use zip::ZipArchive;

    fn create_sample() -> Table {
        Table::new(vec![
            Column::numeric("id", vec![Some(1.0), Some(2.0), Some(3.0)]),
            Column::numeric("score", vec![Some(1.5), None, Some(3.0)]),
            Column::categorical("name", vec![Some("東京"), Some("a,b"), None]),
        ])
        .unwrap()
    }

    fn read_entry(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut entry = archive.by_name(name).unwrap();
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn test_csv_bytes() {
        let bytes = to_csv_bytes(&create_sample()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "id,score,name\n1,1.5,東京\n2,,\"a,b\"\n3,3,\n");
    }

    #[test]
    fn test_csv_reload_preserves_content() {
        let table = create_sample();
        let reloaded = load(&to_csv_bytes(&table).unwrap(), "export.csv").unwrap();
        assert_eq!(reloaded.table, table);
    }

    #[test]
    fn test_json_records() {
        let bytes = to_json_bytes(&create_sample()).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.contains("東京"));
        assert!(text.find("\"id\"").unwrap() < text.find("\"score\"").unwrap());

        let records: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            records,
            serde_json::json!([
                {"id": 1, "score": 1.5, "name": "東京"},
                {"id": 2, "score": null, "name": "a,b"},
                {"id": 3, "score": 3.0, "name": null},
            ])
        );
        assert!(text.contains("\"id\": 1,"));
        assert!(text.contains("\"score\": 3.0"));
    }

    #[test]
    fn test_json_large_whole_numbers_stay_floats() {
        let dataset = load(b"big,small\n1e20,1\n-5e19,2\n", "big.csv").unwrap();
        let bytes = to_json_bytes(&dataset.table).unwrap();
        let records: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(records[0]["big"].as_f64(), Some(1e20));
        assert_eq!(records[1]["big"].as_f64(), Some(-5e19));
        assert!(records[0]["big"].is_f64());
        assert_eq!(records[1]["small"], serde_json::json!(2));
    }

    #[test]
    fn test_spreadsheet_sheets() {
        let source = create_sample();
        let bytes = to_spreadsheet_bytes(&source.head(2), &source).unwrap();

        let workbook = read_entry(&bytes, "xl/workbook.xml");
        assert!(workbook.contains(r#"<sheet name="Data" sheetId="1" r:id="rId1"/>"#));
        assert!(workbook.contains(r#"<sheet name="Statistics" sheetId="2" r:id="rId2"/>"#));

        let data = read_entry(&bytes, "xl/worksheets/sheet1.xml");
        assert!(data.contains(r#"<c r="A2"><v>1</v></c>"#));
        assert!(data.contains("東京"));
        assert!(!data.contains(r#"<row r="4">"#));

        let statistics = read_entry(&bytes, "xl/worksheets/sheet2.xml");
        assert!(statistics.contains(
            r#"<c r="B1" t="inlineStr"><is><t xml:space="preserve">id</t></is></c>"#
        ));
        assert!(statistics.contains(r#"<c r="B2"><v>3</v></c>"#));
        assert!(statistics.contains(r#"<c r="C2"><v>2</v></c>"#));
    }

    #[test]
    fn test_spreadsheet_without_numeric_columns() {
        let table = parse_delimited("name\nalice\n").unwrap();
        let bytes = to_spreadsheet_bytes(&table, &table).unwrap();
        let workbook = read_entry(&bytes, "xl/workbook.xml");
        assert!(!workbook.contains("Statistics"));
    }

    #[test]
    fn test_file_names() {
        assert_eq!(
            export_file_name(ExportKind::Filtered, "sales.csv", ExportFormat::Csv),
            "filtered_sales.csv"
        );
        assert_eq!(
            export_file_name(ExportKind::Filtered, "sales.csv", ExportFormat::Xlsx),
            "filtered_sales.xlsx"
        );
        assert_eq!(
            export_file_name(ExportKind::Clean, "sales.csv", ExportFormat::Csv),
            "clean_sales.csv"
        );
        assert_eq!(
            export_file_name(ExportKind::Unique, "data", ExportFormat::Json),
            "unique_data.json"
        );
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letters(0), "A");
        assert_eq!(column_letters(25), "Z");
        assert_eq!(column_letters(26), "AA");
        assert_eq!(column_letters(701), "ZZ");
        assert_eq!(column_letters(702), "AAA");
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a<b & \"c\"\u{1}"), "a&lt;b &amp; &quot;c&quot;");
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("XLSX".parse::<ExportFormat>().unwrap(), ExportFormat::Xlsx);
        assert!("parquet".parse::<ExportFormat>().is_err());
    }
}
