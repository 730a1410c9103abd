//! JSON import and export of quote lists.
//!
//! Exports are a pretty-printed array of full records. Imports accept the
//! same shape, or the bare `{ "text", "category" }` objects older quote files
//! contain.

use crate::{error::Result, Error, QuoteRecord, RecordId, UNKNOWN_AUTHOR};
use serde::{Deserialize, Serialize};

/// One quote read from an import file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedQuote {
    /// Identifier, if the file carried one
    #[serde(default)]
    pub id: Option<RecordId>,
    pub text: String,
    #[serde(default)]
    pub author: Option<String>,
    pub category: String,
}

impl ImportedQuote {
    /// Turn into a pending record under `id`.
    pub fn into_record(self, id: RecordId) -> QuoteRecord {
        QuoteRecord::new(
            id,
            self.text,
            self.author.unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
            self.category,
        )
    }
}

/// Counts reported after an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    /// Records added to the store
    pub imported: usize,
    /// Entries dropped because their id already existed or they were invalid
    pub skipped: usize,
}

/// Serialize records as a pretty JSON array.
pub fn export_json(records: &[QuoteRecord]) -> Result<String> {
    serde_json::to_string_pretty(records).map_err(|e| Error::Storage(e.to_string()))
}

/// Parse an import file into quotes.
///
/// The top level must be an array. Elements that are not quote objects are
/// rejected as a whole rather than partially imported.
pub fn parse_import(bytes: &[u8]) -> Result<Vec<ImportedQuote>> {
    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| Error::InvalidImport(e.to_string()))?;

    if !value.is_array() {
        return Err(Error::InvalidImport(
            "expected an array of quotes".to_string(),
        ));
    }

    serde_json::from_value(value).map_err(|e| Error::InvalidImport(e.to_string()))
}
