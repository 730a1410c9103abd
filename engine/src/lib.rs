//! # Quotesync Engine
//!
//! A deterministic quote store and reconciliation engine.
//!
//! This crate holds the pure logic of the quote manager: the record model,
//! the owned record store and its persistence boundary, and the merge of a
//! local record set with a freshly fetched remote one. Network access,
//! scheduling and rendering live with the host.
//!
//! ## Design Principles
//!
//! - **No IO**: persistence goes through the [`KeyValueStore`] collaborator
//! - **Deterministic**: timestamps and random seeds are passed in
//! - **Per-record merge**: records are matched by `id` and compared field by field
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! A [`QuoteRecord`] carries `text`, `author` and `category`, plus a
//! `version` bumped by each local edit and a `synced` flag set once the
//! remote acknowledged the current version.
//!
//! ### Reconciliation
//!
//! The [`Reconciler`] merges the remote set into the local one. Unknown ids
//! are appended, same-id records with different content become
//! [`ConflictEntry`]s resolved by the active [`ResolutionPolicy`]:
//! - [`ResolutionPolicy::ServerWins`] - remote content replaces local (default)
//! - [`ResolutionPolicy::LocalWins`] - local content kept and queued for push
//! - [`ResolutionPolicy::Manual`] - conflict left pending for a user decision
//!
//! ## Quick Start
//!
//! ```rust
//! use quotesync_engine::{MemoryStorage, QuoteRecord, Reconciler, RecordStore};
//!
//! // 1. Open a store (seeded on first use)
//! let (mut store, _source) = RecordStore::open(MemoryStorage::new()).unwrap();
//!
//! // 2. Add a quote locally
//! store
//!     .add_quote("Simplicity is prerequisite for reliability.", "Edsger Dijkstra", "Software", 1706745600000)
//!     .unwrap();
//!
//! // 3. Merge what the remote returned
//! let remote = vec![QuoteRecord::remote("1", "sunt aut facere", "quia et suscipit", "ServerData")];
//! let result = Reconciler::default().reconcile(store.records(), &remote);
//! assert!(result.changed);
//!
//! // 4. Persist the merge
//! store.apply_merge(&result).unwrap();
//! assert_eq!(store.len(), 5);
//! ```
//!
//! ## Persistence
//!
//! The store writes a [`StoreSnapshot`] as a single value, so records, pending
//! conflicts and sync metadata are replaced together.

pub mod error;
pub mod reconcile;
pub mod record;
pub mod snapshot;
pub mod storage;
pub mod store;
pub mod transfer;

// Re-export main types at crate root
pub use error::Error;
pub use reconcile::{ConflictEntry, MergeResult, Reconciler, Resolution, ResolutionPolicy};
pub use record::{QuoteRecord, UNKNOWN_AUTHOR};
pub use snapshot::{StoreSnapshot, SNAPSHOT_FORMAT_VERSION};
pub use storage::{KeyValueStore, MemoryStorage};
pub use store::{LoadSource, QuoteQuery, RecordStore, ALL_CATEGORIES, RECORDS_KEY};
pub use transfer::{ImportSummary, ImportedQuote};

/// Type aliases for clarity
pub type RecordId = String;
pub type Version = u64;
pub type Timestamp = u64;
