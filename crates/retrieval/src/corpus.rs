//! The record table: every patent, keyed by publication number.
//!
//! Loaded once at startup from a CSV export, a JSON array or a JSON-lines
//! file and never mutated afterwards, so one `Arc<Corpus>` is shared by
//! every session.

use patentrag_core::error::CorpusError;
use patentrag_core::record::PatentRecord;
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// An immutable record table with an identifier index.
#[derive(Debug, Default)]
pub struct Corpus {
    records: Vec<PatentRecord>,
    by_id: HashMap<String, usize>,
}

impl Corpus {
    /// Build from records already in memory. On duplicate identifiers the
    /// first row wins lookups; every row is still kept for aggregation.
    pub fn new(records: Vec<PatentRecord>) -> Self {
        let mut by_id = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            by_id.entry(record.publication_number.clone()).or_insert(i);
        }
        Self { records, by_id }
    }

    /// Load a `.csv` file, or otherwise a JSON array (`[...]`) or JSON-lines file.
    pub fn load(path: &Path) -> Result<Self, CorpusError> {
        let content = std::fs::read_to_string(path).map_err(|e| CorpusError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        let parsed = if is_csv {
            Self::parse_csv(&content)
        } else {
            Self::parse(&content)
        };
        let corpus = parsed.map_err(|reason| CorpusError::Parse {
            path: path.to_path_buf(),
            reason,
        })?;
        debug!(path = %path.display(), records = corpus.len(), "Corpus loaded");
        Ok(corpus)
    }

    /// Parse file contents; the error is a human-readable reason.
    fn parse(content: &str) -> Result<Self, String> {
        if content.trim_start().starts_with('[') {
            let records: Vec<PatentRecord> =
                serde_json::from_str(content).map_err(|e| e.to_string())?;
            return Ok(Self::new(records));
        }

        let mut records = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<PatentRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(line = line_no + 1, error = %e, "Skipping malformed record");
                }
            }
        }
        Ok(Self::new(records))
    }

    /// Parse a CSV table with a header row. Empty cells become `null` and
    /// numeric cells become numbers, matching what a JSON export holds.
    fn parse_csv(content: &str) -> Result<Self, String> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(content.as_bytes());
        let headers = reader.headers().map_err(|e| e.to_string())?.clone();

        let mut records = Vec::new();
        for (row_no, row) in reader.records().enumerate() {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    warn!(row = row_no + 1, error = %e, "Skipping malformed row");
                    continue;
                }
            };
            let fields: Map<String, Value> = headers
                .iter()
                .zip(row.iter())
                .map(|(column, cell)| (column.trim().to_string(), csv_cell(cell)))
                .collect();
            match serde_json::from_value::<PatentRecord>(Value::Object(fields)) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(row = row_no + 1, error = %e, "Skipping malformed record");
                }
            }
        }
        Ok(Self::new(records))
    }

    /// Look up a record by its normalised identifier.
    pub fn get(&self, publication_number: &str) -> Option<&PatentRecord> {
        self.by_id
            .get(publication_number.trim())
            .map(|&i| &self.records[i])
    }

    pub fn records(&self) -> &[PatentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Type a CSV cell. Zero-padded digit strings stay text so identifiers
/// like `0042` keep their form.
fn csv_cell(cell: &str) -> Value {
    let cell = cell.trim();
    if cell.is_empty() {
        return Value::Null;
    }
    let padded = cell.len() > 1 && cell.starts_with('0') && !cell.starts_with("0.");
    if !padded {
        if let Ok(n) = cell.parse::<i64>() {
            return Value::Number(n.into());
        }
        if let Some(n) = cell.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(n);
        }
    }
    Value::String(cell.to_string())
}
