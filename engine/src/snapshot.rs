//! Snapshot types for persisting and restoring store state.
//!
//! A snapshot is the single value the [`RecordStore`](crate::RecordStore)
//! writes to its key-value collaborator. Records, pending conflicts and sync
//! metadata travel together so one write replaces all of them at once.

use crate::{error::Result, ConflictEntry, Error, QuoteRecord, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Version of the snapshot format for future compatibility.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// A point-in-time snapshot of the store state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    /// Snapshot format version
    pub format_version: u32,
    /// All records in display order
    pub records: Vec<QuoteRecord>,
    /// Conflicts awaiting a manual decision
    #[serde(default)]
    pub pending_conflicts: Vec<ConflictEntry>,
    /// When the last successful sync finished (milliseconds since epoch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced_at: Option<Timestamp>,
    /// Last category filter chosen by the user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_category: Option<String>,
}

impl StoreSnapshot {
    /// Create a snapshot holding `records` and nothing else.
    pub fn new(records: Vec<QuoteRecord>) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            records,
            pending_conflicts: Vec::new(),
            last_synced_at: None,
            last_category: None,
        }
    }

    /// Count of records.
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Check that ids are unique.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.records.len());
        for record in &self.records {
            if !seen.insert(record.id.as_str()) {
                return Err(Error::StorageCorrupt(format!(
                    "duplicate record id: {}",
                    record.id
                )));
            }
        }
        Ok(())
    }

    /// Serialize to JSON bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::Storage(e.to_string()))
    }

    /// Deserialize from JSON bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let snapshot: Self =
            serde_json::from_slice(bytes).map_err(|e| Error::StorageCorrupt(e.to_string()))?;

        if snapshot.format_version > SNAPSHOT_FORMAT_VERSION {
            return Err(Error::StorageCorrupt(format!(
                "unsupported snapshot format version: {} (max supported: {})",
                snapshot.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }

        snapshot.validate()?;
        Ok(snapshot)
    }
}
