//! Quote records.

use crate::{error::Result, Error, RecordId, Timestamp, Version};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Author used when a quote has no attribution.
pub const UNKNOWN_AUTHOR: &str = "Unknown";

/// A single quote entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRecord {
    /// Unique identifier within a record set
    pub id: RecordId,
    /// The quote body, never empty
    pub text: String,
    /// Attribution, `UNKNOWN_AUTHOR` when unavailable
    #[serde(default = "unknown_author")]
    pub author: String,
    /// Free-form tag used for filtering
    pub category: String,
    /// Incremented on every local mutation
    #[serde(default = "initial_version")]
    pub version: Version,
    /// Whether the remote side has acknowledged the current version
    #[serde(default)]
    pub synced: bool,
}

fn unknown_author() -> String {
    UNKNOWN_AUTHOR.to_string()
}

fn initial_version() -> Version {
    1
}

impl QuoteRecord {
    /// Create a record at version 1 that has not been pushed yet.
    pub fn new(
        id: impl Into<RecordId>,
        text: impl Into<String>,
        author: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        let author = author.into();
        Self {
            id: id.into(),
            text: text.into(),
            author: if author.trim().is_empty() {
                unknown_author()
            } else {
                author
            },
            category: category.into(),
            version: 1,
            synced: false,
        }
    }

    /// Create a record as received from the remote side.
    pub fn remote(
        id: impl Into<RecordId>,
        text: impl Into<String>,
        author: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            synced: true,
            ..Self::new(id, text, author, category)
        }
    }

    /// Identifier for a locally created record.
    ///
    /// `counter` disambiguates records created within the same millisecond.
    pub fn local_id(timestamp: Timestamp, counter: u64) -> RecordId {
        format!("local-{timestamp}-{counter}")
    }

    /// Field-wise content comparison. `version` and `synced` are ignored.
    pub fn same_content(&self, other: &QuoteRecord) -> bool {
        self.text == other.text && self.author == other.author && self.category == other.category
    }

    /// Apply a local edit, bumping the version and clearing `synced`.
    pub fn edit(
        &mut self,
        text: impl Into<String>,
        author: impl Into<String>,
        category: impl Into<String>,
    ) {
        let author = author.into();
        self.text = text.into();
        self.author = if author.trim().is_empty() {
            unknown_author()
        } else {
            author
        };
        self.category = category.into();
        self.version += 1;
        self.synced = false;
    }

    /// Take over the content of `remote`, keeping the version monotone.
    ///
    /// The result counts as acknowledged since it is what the remote holds.
    pub fn adopt(&mut self, remote: &QuoteRecord) {
        self.text = remote.text.clone();
        self.author = remote.author.clone();
        self.category = remote.category.clone();
        self.version = self.version.max(remote.version);
        self.synced = true;
    }

    /// Check the record can be stored.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::InvalidRecord("id must not be empty".into()));
        }
        if self.text.trim().is_empty() {
            return Err(Error::InvalidRecord(format!(
                "quote {} has empty text",
                self.id
            )));
        }
        if self.category.trim().is_empty() {
            return Err(Error::InvalidRecord(format!(
                "quote {} has empty category",
                self.id
            )));
        }
        Ok(())
    }
}

impl fmt::Display for QuoteRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" - {} [{}]", self.text, self.author, self.category)
    }
}
