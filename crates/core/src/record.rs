//! Patent records, indexed chunks, and the column whitelist.
//!
//! A record is one patent: a stable `publication_number` plus an open set of
//! named columns as they came out of ingestion. Column values stay as JSON
//! values so the same record can hold numbers (`sdg_number`), dates in
//! several on-disk formats, and long text fields.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};
use std::borrow::Cow;

/// Well-known column names.
pub mod columns {
    pub const PUBLICATION_NUMBER: &str = "publication_number";
    pub const PUBLICATION_DATE: &str = "publication_date";
    pub const TITLE: &str = "title_en";
    pub const ABSTRACT: &str = "abstract_text";
    pub const CLAIMS: &str = "claims";
    pub const DESCRIPTION: &str = "description_text";
    pub const ANALYSIS: &str = "analysis_explanation";
    pub const PRIOR_ART: &str = "prior_art";
    pub const PARENT: &str = "parent_publication_number";
    pub const SDG_NUMBER: &str = "sdg_number";
    pub const IPC_TECHNOLOGIES: &str = "ipc_technologies";
    pub const INVENTOR_NAMES: &str = "inventor_names";
    pub const APPLICANT_NAMES: &str = "applicant_names";
    pub const APPLICANT_COUNTRIES: &str = "applicant_countries";

    /// Pseudo-column that makes a filter test the chunk text instead of the record.
    pub const CHUNK_TEXT: &str = "_chunk_text";

    /// Text columns concatenated into the indexed passage text, in order.
    pub const TEXT_COLUMNS: &[&str] = &[TITLE, ABSTRACT, CLAIMS, DESCRIPTION, ANALYSIS];
}

/// Every column a filter or a column priority may name.
pub const COLUMN_WHITELIST: &[&str] = &[
    "publication_number",
    "publication_kind",
    "publication_date",
    "ipc",
    "cpc",
    "title_en",
    "claims",
    "abstract_text",
    "description_text",
    "prior_art",
    "reference",
    "parent",
    "pct_publication_number",
    "designated_states_contracting",
    "designated_states_extension",
    "designated_states_validation",
    "sdg_number",
    "analysis_explanation",
    "ipc_tech_field",
    "ipc_technologies",
    "applicant_names",
    "applicant_countries",
    "applicant_count",
    "inventor_names",
    "inventor_countries",
    "inventor_count",
    "parent_publication_number",
];

/// Whether `column` is a known record column.
pub fn is_known_column(column: &str) -> bool {
    COLUMN_WHITELIST.contains(&column)
}

/// One patent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatentRecord {
    /// Stable identifier, always compared as a normalised string.
    #[serde(deserialize_with = "identifier_from_any")]
    pub publication_number: String,

    /// All other columns, keyed by column name.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl PatentRecord {
    /// Create a record with no columns besides its identifier.
    pub fn new(publication_number: impl Into<String>) -> Self {
        Self {
            publication_number: publication_number.into(),
            fields: Map::new(),
        }
    }

    /// Builder-style column setter.
    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(column.to_string(), value.into());
        self
    }

    /// Raw value of a column; missing columns read as `null`.
    pub fn field(&self, column: &str) -> Cow<'_, Value> {
        if column == columns::PUBLICATION_NUMBER {
            return Cow::Owned(Value::String(self.publication_number.clone()));
        }
        match self.fields.get(column) {
            Some(v) => Cow::Borrowed(v),
            None => Cow::Owned(Value::Null),
        }
    }

    /// Display form of a column, `None` when missing or blank.
    pub fn text(&self, column: &str) -> Option<String> {
        display_value(&self.field(column))
    }

    /// The English title, empty when missing.
    pub fn title(&self) -> String {
        self.text(columns::TITLE).unwrap_or_default()
    }

    /// Non-empty text columns joined by blank lines, as indexed.
    pub fn concat_text(&self) -> String {
        columns::TEXT_COLUMNS
            .iter()
            .filter_map(|c| self.text(c))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// A contiguous word window of a record's text, the unit of vector indexing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Owning record.
    pub publication_number: String,
    /// Position of this window within the record.
    pub sequence: usize,
    /// The window text.
    pub text: String,
}

/// Render a JSON scalar the way it is compared and displayed.
///
/// Whole floats lose their fraction (`6.0` → `"6"`), arrays are joined
/// with `"; "`, and `null` or blank strings yield `None`.
pub fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(format_number(n)),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(display_value).collect();
            if parts.is_empty() { None } else { Some(parts.join("; ")) }
        }
        Value::Object(_) => Some(value.to_string()),
    }
}

/// Format a JSON number without a trailing `.0` for whole values.
pub fn format_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

fn identifier_from_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    display_value(&value)
        .map(|s| s.trim().to_string())
        .ok_or_else(|| serde::de::Error::custom("publication_number is empty"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_identifier_is_normalised() {
        let rec: PatentRecord =
            serde_json::from_value(json!({"publication_number": 123456, "title_en": "Pump"})).unwrap();
        assert_eq!(rec.publication_number, "123456");

        let rec: PatentRecord =
            serde_json::from_value(json!({"publication_number": 42.0})).unwrap();
        assert_eq!(rec.publication_number, "42");
    }

    #[test]
    fn empty_identifier_is_rejected() {
        let res: Result<PatentRecord, _> = serde_json::from_value(json!({"publication_number": " "}));
        assert!(res.is_err());
    }

    #[test]
    fn missing_column_reads_as_null() {
        let rec = PatentRecord::new("1");
        assert_eq!(*rec.field("claims"), Value::Null);
        assert!(rec.text("claims").is_none());
        assert_eq!(rec.title(), "");
    }

    #[test]
    fn identifier_is_addressable_as_a_column() {
        let rec = PatentRecord::new("EP1");
        assert_eq!(rec.text(columns::PUBLICATION_NUMBER).as_deref(), Some("EP1"));
    }

    #[test]
    fn display_drops_float_fraction() {
        assert_eq!(display_value(&json!(6.0)).as_deref(), Some("6"));
        assert_eq!(display_value(&json!(6.5)).as_deref(), Some("6.5"));
        assert_eq!(display_value(&json!(["a", "b"])).as_deref(), Some("a; b"));
        assert!(display_value(&json!("  ")).is_none());
    }

    #[test]
    fn concat_text_skips_blank_columns() {
        let rec = PatentRecord::new("1")
            .with(columns::TITLE, "Solar still")
            .with(columns::ABSTRACT, "")
            .with(columns::CLAIMS, "1. A still.");
        assert_eq!(rec.concat_text(), "Solar still\n\n1. A still.");
    }

    #[test]
    fn whitelist_membership() {
        assert!(is_known_column("sdg_number"));
        assert!(!is_known_column("favourite_colour"));
        assert!(!is_known_column(columns::CHUNK_TEXT));
    }
}
