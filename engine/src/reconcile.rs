//! Reconciliation of the local record set against a freshly fetched remote set.
//!
//! # Algorithm
//!
//! 1. Start from a copy of the local records, keeping local order
//! 2. Walk the remote records in remote order
//! 3. Unknown ids are appended as new records
//! 4. Known ids with different content become conflicts, resolved by the
//!    active [`ResolutionPolicy`] at the local record's position
//! 5. Local records the remote does not mention are left untouched
//!
//! Identity is the record `id`; content is `text`, `author` and `category`.
//! Versions never take part in conflict detection.

use crate::{error::Result, Error, QuoteRecord, RecordId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Policy applied when local and remote disagree on a record's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolutionPolicy {
    /// Remote content replaces local content (default)
    #[default]
    ServerWins,
    /// Local content is kept and queued for push
    LocalWins,
    /// Conflicts stay pending until an external decision arrives
    Manual,
}

impl FromStr for ResolutionPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "server" | "server-wins" | "serverwins" => Ok(Self::ServerWins),
            "local" | "local-wins" | "localwins" => Ok(Self::LocalWins),
            "manual" => Ok(Self::Manual),
            other => Err(Error::UnknownPolicy(other.to_string())),
        }
    }
}

/// How a conflict was (or will be) resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// Remote content kept
    Server,
    /// Local content kept
    Local,
    /// Awaiting a manual decision
    Pending,
}

/// A same-id record present on both sides with differing content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictEntry {
    /// The contested record id
    pub id: RecordId,
    /// Local version of the record at detection time
    pub local: QuoteRecord,
    /// Remote version of the record at detection time
    pub remote: QuoteRecord,
    /// Resolution outcome
    pub resolution: Resolution,
}

impl ConflictEntry {
    /// Whether this conflict still awaits a decision.
    pub fn is_pending(&self) -> bool {
        self.resolution == Resolution::Pending
    }

    /// Apply a manual decision to the record currently stored under `id`.
    ///
    /// `Server` adopts the remote content. `Local` keeps what is stored and
    /// clears `synced` so the next run pushes it.
    pub fn settle(&mut self, record: &mut QuoteRecord, choice: Resolution) -> Result<()> {
        if record.id != self.id {
            return Err(Error::RecordNotFound(self.id.clone()));
        }
        match choice {
            Resolution::Server => record.adopt(&self.remote),
            Resolution::Local => record.synced = false,
            Resolution::Pending => {
                return Err(Error::InvalidRecord(
                    "a conflict can only be settled to server or local".into(),
                ))
            }
        }
        self.resolution = choice;
        Ok(())
    }
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeResult {
    /// The new authoritative record set
    pub merged_records: Vec<QuoteRecord>,
    /// Every conflict detected during the pass
    pub conflicts: Vec<ConflictEntry>,
    /// Whether `merged_records` differs from the local input
    pub changed: bool,
    /// Records whose local content won and must be pushed
    pub push_queue: Vec<RecordId>,
    /// Number of records absorbed from the remote side
    pub added: usize,
    /// Number of local records whose content was replaced
    pub replaced: usize,
    /// Ids present in the remote set, in first-seen order
    #[serde(default)]
    pub remote_ids: Vec<RecordId>,
}

impl MergeResult {
    fn unchanged(local: &[QuoteRecord]) -> Self {
        Self {
            merged_records: local.to_vec(),
            conflicts: Vec::new(),
            changed: false,
            push_queue: Vec::new(),
            added: 0,
            replaced: 0,
            remote_ids: Vec::new(),
        }
    }

    /// Conflicts still awaiting a manual decision.
    pub fn pending_conflicts(&self) -> impl Iterator<Item = &ConflictEntry> {
        self.conflicts.iter().filter(|c| c.is_pending())
    }

    /// Whether any conflict awaits a manual decision.
    pub fn has_pending(&self) -> bool {
        self.conflicts.iter().any(ConflictEntry::is_pending)
    }
}

/// The reconciler merges record sets under a resolution policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reconciler {
    policy: ResolutionPolicy,
}

impl Reconciler {
    /// Create a reconciler with the given policy.
    pub fn new(policy: ResolutionPolicy) -> Self {
        Self { policy }
    }

    /// The active policy.
    pub fn policy(&self) -> ResolutionPolicy {
        self.policy
    }

    /// Merge `remote` into `local`.
    ///
    /// Duplicate ids within `remote` collapse to the content of their last
    /// occurrence, placed where the id first appeared.
    pub fn reconcile(&self, local: &[QuoteRecord], remote: &[QuoteRecord]) -> MergeResult {
        let mut result = MergeResult::unchanged(local);
        if remote.is_empty() {
            return result;
        }

        let mut positions: HashMap<RecordId, usize> = result
            .merged_records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect();

        for incoming in collapse_duplicates(remote) {
            result.remote_ids.push(incoming.id.clone());
            let Some(pos) = positions.get(&incoming.id).copied() else {
                positions.insert(incoming.id.clone(), result.merged_records.len());
                result.merged_records.push(incoming);
                result.added += 1;
                result.changed = true;
                continue;
            };

            let existing = &mut result.merged_records[pos];
            if existing.same_content(&incoming) {
                continue;
            }

            let mut entry = ConflictEntry {
                id: incoming.id.clone(),
                local: existing.clone(),
                remote: incoming,
                resolution: Resolution::Pending,
            };

            match self.policy {
                ResolutionPolicy::ServerWins => {
                    existing.adopt(&entry.remote);
                    entry.resolution = Resolution::Server;
                    result.replaced += 1;
                    result.changed = true;
                }
                ResolutionPolicy::LocalWins => {
                    if existing.synced {
                        existing.synced = false;
                        result.changed = true;
                    }
                    entry.resolution = Resolution::Local;
                    result.push_queue.push(entry.id.clone());
                }
                ResolutionPolicy::Manual => {}
            }

            result.conflicts.push(entry);
        }

        result
    }
}

fn collapse_duplicates(remote: &[QuoteRecord]) -> Vec<QuoteRecord> {
    let mut out: Vec<QuoteRecord> = Vec::with_capacity(remote.len());
    let mut seen: HashMap<&str, usize> = HashMap::with_capacity(remote.len());
    for record in remote {
        match seen.get(record.id.as_str()) {
            Some(&i) => out[i] = record.clone(),
            None => {
                seen.insert(record.id.as_str(), out.len());
                out.push(record.clone());
            }
        }
    }
    out
}
