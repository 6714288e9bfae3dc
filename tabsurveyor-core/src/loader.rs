//! Dataset loading: encoding inference, delimited-text parsing and caching.
//!
//! Raw bytes are decoded by trying a fixed list of encodings in priority
//! order. The decoded text is parsed as comma-separated values with a header
//! row, and each column is typed as numeric when every present value parses
//! as a number.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use encoding_rs::{EUC_JP, Encoding, SHIFT_JIS, UTF_8};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::table::{Column, ColumnData, Table};
use crate::{Result, TabSurveyorError};

/// Encodings tried in order, with the labels reported to users.
fn candidate_encodings() -> [(&'static Encoding, &'static str); 3] {
    [
        (UTF_8, "utf-8"),
        (SHIFT_JIS, "shift_jis"),
        (EUC_JP, "euc-jp"),
    ]
}

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Cell texts treated as missing values.
pub const NA_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "NULL", "null", "None", "<NA>", "#N/A",
    "#NA", "#N/A N/A", "-1.#IND", "-1.#QNAN", "1.#IND", "1.#QNAN",
];

/// A parsed dataset together with how it was decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDataset {
    /// Parsed table
    pub table: Table,
    /// Label of the encoding that decoded the input
    pub encoding: &'static str,
    /// Original file name
    pub filename: String,
}

/// Decodes, parses and types a raw delimited file.
pub fn load(bytes: &[u8], filename: &str) -> Result<LoadedDataset> {
    let (text, encoding) = decode(bytes)?;
    let table = parse_delimited(&text)?;

    info!(
        "Loaded '{}': {} rows, {} columns ({})",
        filename,
        table.row_count(),
        table.column_count(),
        encoding
    );

    Ok(LoadedDataset {
        table,
        encoding,
        filename: filename.to_string(),
    })
}

/// Decodes bytes with the first candidate encoding that accepts them.
///
/// Returns the text and the label of the encoding used.
pub fn decode(bytes: &[u8]) -> Result<(String, &'static str)> {
    for (encoding, label) in candidate_encodings() {
        let input = if encoding == UTF_8 {
            bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
        } else {
            bytes
        };

        match encoding.decode_without_bom_handling_and_without_replacement(input) {
            Some(text) => {
                debug!("Decoded {} bytes as {}", bytes.len(), label);
                return Ok((text.into_owned(), label));
            }
            None => debug!("Input is not valid {}", label),
        }
    }

    Err(TabSurveyorError::Decode {
        attempted: candidate_encodings().iter().map(|(_, label)| *label).collect(),
    })
}

/// Whether a raw cell is a missing-value marker.
pub fn is_missing_token(field: &str) -> bool {
    NA_TOKENS.contains(&field)
}

/// Parses comma-separated text with a header row into a typed table.
pub fn parse_delimited(text: &str) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = reader.records();
    let header = match records.next() {
        Some(record) => record.map_err(parse_error)?,
        None => {
            return Err(TabSurveyorError::Parse {
                line: 1,
                message: "no header row".to_string(),
            });
        }
    };
    let names = normalize_headers(header.iter());
    let width = names.len();

    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); width];
    for record in records {
        let record = record.map_err(parse_error)?;
        if record.len() > width {
            return Err(TabSurveyorError::Parse {
                line: record.position().map_or(0, csv::Position::line),
                message: format!("expected {} fields, found {}", width, record.len()),
            });
        }
        for (index, column) in cells.iter_mut().enumerate() {
            let value = record
                .get(index)
                .filter(|field| !is_missing_token(field))
                .map(str::to_string);
            column.push(value);
        }
    }

    let columns = names
        .into_iter()
        .zip(cells)
        .map(|(name, values)| Column::new(name, infer_column(values)))
        .collect();
    Table::new(columns)
}

fn parse_error(error: csv::Error) -> TabSurveyorError {
    let line = error.position().map_or(0, csv::Position::line);
    TabSurveyorError::Parse {
        line,
        message: error.to_string(),
    }
}

/// Makes header names non-empty and unique.
fn normalize_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut suffixes: HashMap<String, usize> = HashMap::new();
    let mut names = Vec::new();

    for (index, name) in raw.enumerate() {
        let base = if name.is_empty() {
            format!("Unnamed: {}", index)
        } else {
            name.to_string()
        };

        let mut candidate = base.clone();
        while seen.contains(&candidate) {
            let counter = suffixes.entry(base.clone()).or_insert(0);
            *counter += 1;
            candidate = format!("{}.{}", base, counter);
        }

        seen.insert(candidate.clone());
        names.push(candidate);
    }

    names
}

/// Types a column as numeric when every present value parses as a number.
fn infer_column(values: Vec<Option<String>>) -> ColumnData {
    let parsed: Option<Vec<Option<f64>>> = values
        .iter()
        .map(|value| match value {
            None => Some(None),
            Some(text) => text
                .trim()
                .parse::<f64>()
                .ok()
                .map(|v| if v.is_nan() { None } else { Some(v) }),
        })
        .collect();

    match parsed {
        Some(numbers) => ColumnData::Numeric(numbers),
        None => ColumnData::Categorical(values),
    }
}

/// SHA-256 of the file content and name.
pub type CacheKey = [u8; 32];

/// Computes the cache key for a file.
pub fn cache_key(bytes: &[u8], filename: &str) -> CacheKey {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.update([0u8]);
    hasher.update(filename.as_bytes());
    hasher.finalize().into()
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<CacheKey, Arc<LoadedDataset>>,
    hits: u64,
    misses: u64,
}

/// Content-addressed cache of loaded datasets.
///
/// Entries live until [`DatasetCache::clear`] is called. The lock is held
/// while a missing entry is loaded, so identical inputs are decoded once.
#[derive(Debug, Default)]
pub struct DatasetCache {
    state: Mutex<CacheState>,
}

impl DatasetCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached dataset for this input, loading it on a miss.
    ///
    /// Failed loads are not cached.
    pub fn load(&self, bytes: &[u8], filename: &str) -> Result<Arc<LoadedDataset>> {
        let key = cache_key(bytes, filename);
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(dataset) = state.entries.get(&key).cloned() {
            state.hits += 1;
            debug!("Dataset cache hit for '{}'", filename);
            return Ok(dataset);
        }

        state.misses += 1;
        debug!("Dataset cache miss for '{}'", filename);
        let dataset = Arc::new(load(bytes, filename)?);
        state.entries.insert(key, Arc::clone(&dataset));
        Ok(dataset)
    }

    /// Evicts every entry. Counters are kept.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let evicted = state.entries.len();
        state.entries.clear();
        debug!("Cleared {} cached datasets", evicted);
    }

    /// Number of cached datasets.
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    /// Whether the cache holds no datasets.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of lookups served from the cache.
    pub fn hits(&self) -> u64 {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).hits
    }

    /// Number of lookups that had to load.
    pub fn misses(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_basic_csv() {
        let dataset = load(b"a,b\n1,x\n2,y\n1,x\n", "sample.csv").unwrap();
        assert_eq!(dataset.encoding, "utf-8");
        assert_eq!(dataset.filename, "sample.csv");

        let table = &dataset.table;
        assert_eq!(table.row_count(), 3);
        let a = table.column("a").unwrap();
        assert_eq!(
            a.data(),
            &ColumnData::Numeric(vec![Some(1.0), Some(2.0), Some(1.0)])
        );
        assert!(!table.column("b").unwrap().is_numeric());
    }

    #[test]
    fn test_utf8_bom_is_stripped() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"id,name\n1,a\n");
        let dataset = load(&bytes, "bom.csv").unwrap();
        assert_eq!(dataset.encoding, "utf-8");
        assert!(dataset.table.has_column("id"));
    }

    #[test]
    fn test_shift_jis_fallback() {
        let (bytes, _, had_errors) = SHIFT_JIS.encode("名前,値\n山田,1\n");
        assert!(!had_errors);

        let dataset = load(&bytes, "sjis.csv").unwrap();
        assert_eq!(dataset.encoding, "shift_jis");
        let column = dataset.table.column("名前").unwrap();
        assert_eq!(column.text(0).as_deref(), Some("山田"));
    }

    #[test]
    fn test_euc_jp_fallback() {
        // 0xA1 0xFE is valid EUC-JP but invalid in both UTF-8 and Shift_JIS
        let bytes = [b'v', b'\n', 0xA1, 0xFE, b'\n'];
        let (text, label) = decode(&bytes).unwrap();
        assert_eq!(label, "euc-jp");
        assert_eq!(text, "v\n\u{25C7}\n");
    }

    #[test]
    fn test_undecodable_input() {
        let result = load(&[0xFF, 0xFE, 0xFF, b'\n'], "binary.csv");
        match result {
            Err(TabSurveyorError::Decode { attempted }) => {
                assert_eq!(attempted, vec!["utf-8", "shift_jis", "euc-jp"]);
            }
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_tokens_and_padding() {
        let table = parse_delimited("x,y,z\n1,NA,a\n,2\nNULL,3,#N/A\n").unwrap();
        let x = table.column("x").unwrap();
        let y = table.column("y").unwrap();
        let z = table.column("z").unwrap();

        assert_eq!(x.data(), &ColumnData::Numeric(vec![Some(1.0), None, None]));
        assert_eq!(y.data(), &ColumnData::Numeric(vec![None, Some(2.0), Some(3.0)]));
        assert!(!z.is_numeric());
        assert_eq!(z.missing_count(), 2);
    }

    #[test]
    fn test_all_missing_column_is_numeric() {
        let table = parse_delimited("a,b\n1,\n2,NA\n").unwrap();
        let b = table.column("b").unwrap();
        assert!(b.is_numeric());
        assert_eq!(b.missing_count(), 2);
    }

    #[test]
    fn test_long_row_is_parse_error() {
        let result = parse_delimited("a,b\n1,2\n1,2,3\n");
        match result {
            Err(TabSurveyorError::Parse { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_input_is_parse_error() {
        assert!(matches!(
            parse_delimited(""),
            Err(TabSurveyorError::Parse { .. })
        ));
    }

    #[test]
    fn test_header_only_input() {
        let table = parse_delimited("a,b\n").unwrap();
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.column_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_header_normalization() {
        let table = parse_delimited("x,,x,x\n1,2,3,4\n").unwrap();
        assert_eq!(table.column_names(), vec!["x", "Unnamed: 1", "x.1", "x.2"]);
    }

    #[test]
    fn test_quoted_fields() {
        let table = parse_delimited("name,note\n\"Smith, J\",\"said \"\"hi\"\"\"\n").unwrap();
        let name = table.column("name").unwrap();
        let note = table.column("note").unwrap();
        assert_eq!(name.text(0).as_deref(), Some("Smith, J"));
        assert_eq!(note.text(0).as_deref(), Some("said \"hi\""));
    }

    #[test]
    fn test_numeric_inference_trims_whitespace() {
        let table = parse_delimited("v,w\n 1.5 ,1\n2,abc\n").unwrap();
        assert!(table.column("v").unwrap().is_numeric());
        assert_eq!(table.column("v").unwrap().get_f64(0), Some(1.5));
        assert!(!table.column("w").unwrap().is_numeric());
    }

    #[test]
    fn test_cache_hits_and_clear() {
        let cache = DatasetCache::new();
        let bytes = b"a\n1\n";

        let first = cache.load(bytes, "a.csv").unwrap();
        let second = cache.load(bytes, "a.csv").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);

        // Same content under another name is a separate entry
        cache.load(bytes, "b.csv").unwrap();
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
        cache.load(bytes, "a.csv").unwrap();
        assert_eq!(cache.misses(), 3);
    }

    #[test]
    fn test_cache_does_not_store_failures() {
        let cache = DatasetCache::new();
        assert!(cache.load(&[0xFF], "bad.csv").is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_key_separates_name_and_content() {
        assert_ne!(cache_key(b"ab", "c"), cache_key(b"a", "bc"));
        assert_eq!(cache_key(b"ab", "c"), cache_key(b"ab", "c"));
    }
}
