//! # Proposal tables
//!
//! Consumed interface of the external proposal loader. The loader hands the
//! engine a set of **named tables** (`"observations"`, `"exposures"`, ...),
//! each a list of uniform records; this module stores them and exposes typed,
//! optional field access so callers can implement the "missing optional field
//! means skip" policy without poking at raw JSON.
//!
//! The engine never parses the raw proposal format itself. JSON is accepted
//! as the interchange shape because that is what the loader emits:
//!
//! ```json
//! {
//!   "observations": [{"observation": 1, "ra": 80.49, "dec": -69.49,
//!                     "template": "NIRCam Imaging"}],
//!   "exposures":    [{"observation": 1, "exposure": 1, "modules": "ALL"}]
//! }
//! ```

use ahash::AHashMap;
use camino::Utf8Path;
use serde_json::Value;

use crate::roguepath_errors::RoguePathError;

/// One uniform record of a proposal table.
///
/// Field accessors return `Option`: a missing or mistyped field is simply
/// absent, and the caller decides whether that means "skip" or "error".
#[derive(Debug, Clone, PartialEq)]
pub struct Record(serde_json::Map<String, Value>);

impl Record {
    pub fn new(fields: serde_json::Map<String, Value>) -> Self {
        Record(fields)
    }

    /// Numeric field, accepting JSON numbers and numeric strings.
    pub fn f64_field(&self, key: &str) -> Option<f64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Unsigned integer field, accepting JSON numbers and numeric strings.
    pub fn u32_field(&self, key: &str) -> Option<u32> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// String field.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key)?.as_str()
    }

    pub fn has_field(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }
}

/// One named proposal table: an ordered list of uniform records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    records: Vec<Record>,
}

impl Table {
    pub fn new(records: Vec<Record>) -> Self {
        Table { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// The full set of tables delivered by the proposal loader, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct ProposalTables {
    tables: AHashMap<String, Table>,
}

impl ProposalTables {
    /// Parse the loader's JSON interchange form.
    ///
    /// Arguments
    /// ---------
    /// * `json`: an object mapping table names to arrays of records.
    ///
    /// Return
    /// ------
    /// * The table set, or a [`RoguePathError::JsonError`] if the text is not
    ///   of the expected shape.
    pub fn from_json_str(json: &str) -> Result<Self, RoguePathError> {
        let raw: AHashMap<String, Vec<serde_json::Map<String, Value>>> =
            serde_json::from_str(json)?;

        let tables = raw
            .into_iter()
            .map(|(name, records)| {
                let records = records.into_iter().map(Record::new).collect();
                (name, Table::new(records))
            })
            .collect();

        Ok(ProposalTables { tables })
    }

    /// Read and parse a JSON table file.
    pub fn from_json_path(path: &Utf8Path) -> Result<Self, RoguePathError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Insert or replace one table (used by in-memory builders and tests).
    pub fn insert(&mut self, name: impl Into<String>, table: Table) {
        self.tables.insert(name.into(), table);
    }

    /// Fetch a table by name, as an error when absent.
    pub fn table(&self, name: &str) -> Result<&Table, RoguePathError> {
        self.tables
            .get(name)
            .ok_or_else(|| RoguePathError::MissingTable(name.to_string()))
    }

    /// Fetch a table by name, `None` when absent.
    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_str() {
        let tables = ProposalTables::from_json_str(
            r#"{
                "observations": [{"observation": 1, "ra": 80.5, "dec": -69.5}],
                "exposures": [{"observation": 1, "exposure": "001", "template": "NIRCam Imaging"}]
            }"#,
        )
        .unwrap();

        let obs = tables.table("observations").unwrap();
        assert_eq!(obs.len(), 1);
        assert_eq!(obs.records()[0].u32_field("observation"), Some(1));
        assert_eq!(obs.records()[0].f64_field("ra"), Some(80.5));

        let exp = tables.table("exposures").unwrap();
        assert_eq!(exp.records()[0].str_field("template"), Some("NIRCam Imaging"));
        // Numeric strings coerce for numeric accessors.
        assert_eq!(exp.records()[0].u32_field("exposure"), Some(1));
    }

    #[test]
    fn test_missing_table_is_an_error() {
        let tables = ProposalTables::from_json_str("{}").unwrap();
        let err = tables.table("exposures").unwrap_err();
        assert_eq!(err, RoguePathError::MissingTable("exposures".to_string()));
    }

    #[test]
    fn test_missing_fields_are_options() {
        let tables = ProposalTables::from_json_str(
            r#"{"sources": [{"ra": 10.0}, {"ra": "11.25", "dec": -4.0, "k_mag": 7.1}]}"#,
        )
        .unwrap();
        let sources = tables.table("sources").unwrap();
        assert_eq!(sources.records()[0].f64_field("dec"), None);
        assert_eq!(sources.records()[1].f64_field("ra"), Some(11.25));
        assert!(!sources.records()[0].has_field("k_mag"));
    }
}
