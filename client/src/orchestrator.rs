//! Sync orchestrator - sequences push, fetch, reconcile, persist and notify.
//!
//! At most one run executes at a time. A trigger arriving while a run is in
//! flight is dropped, not queued. Local edits go through the same store lock
//! as the run, which only holds it across synchronous sections, so an edit
//! made while a fetch is pending is part of that run's merge input.

use crate::error::Result;
use crate::fetcher::{PushOutcome, RemoteFetcher};
use crate::notifier::{Notifier, SyncOutcome};
use crate::transport::Transport;
use async_trait::async_trait;
use quotesync_engine::{
    ConflictEntry, Error, ImportSummary, KeyValueStore, QuoteRecord, Reconciler, RecordId,
    RecordStore, Resolution, ResolutionPolicy, Timestamp,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{Mutex, MutexGuard};

/// Run-lock state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No run in flight; the next trigger starts one
    Idle,
    /// A run is in flight; triggers are dropped
    Running,
}

/// Something a scheduler can fire.
#[async_trait]
pub trait SyncTarget: Send + Sync {
    /// Attempt one run. `None` means the trigger was dropped.
    async fn trigger(&self) -> Option<SyncOutcome>;
}

/// Releases the run-lock when a run ends, however it ends.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Current wall-clock time in milliseconds since the epoch.
pub fn now_millis() -> Timestamp {
    Timestamp::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default()
}

/// Coordinates the record store, the remote fetcher and the notifier.
pub struct SyncOrchestrator<S, T, N> {
    store: Mutex<RecordStore<S>>,
    fetcher: RemoteFetcher<T>,
    notifier: N,
    reconciler: Reconciler,
    running: AtomicBool,
    passes: AtomicU64,
}

impl<S, T, N> SyncOrchestrator<S, T, N>
where
    S: KeyValueStore,
    T: Transport,
    N: Notifier,
{
    /// Create an orchestrator owning `store`.
    pub fn new(
        store: RecordStore<S>,
        fetcher: RemoteFetcher<T>,
        notifier: N,
        policy: ResolutionPolicy,
    ) -> Self {
        Self {
            store: Mutex::new(store),
            fetcher,
            notifier,
            reconciler: Reconciler::new(policy),
            running: AtomicBool::new(false),
            passes: AtomicU64::new(0),
        }
    }

    /// Whether a run is in flight.
    pub fn state(&self) -> SyncState {
        if self.running.load(Ordering::Acquire) {
            SyncState::Running
        } else {
            SyncState::Idle
        }
    }

    /// Number of reconciliation passes executed so far.
    pub fn reconcile_passes(&self) -> u64 {
        self.passes.load(Ordering::Relaxed)
    }

    /// The active resolution policy.
    pub fn policy(&self) -> ResolutionPolicy {
        self.reconciler.policy()
    }

    /// Lock the store for reading or direct edits.
    pub async fn store(&self) -> MutexGuard<'_, RecordStore<S>> {
        self.store.lock().await
    }

    /// Run one sync cycle unless one is already running.
    pub async fn sync_now(&self) -> Option<SyncOutcome> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Sync already running, trigger dropped");
            return None;
        }
        let _guard = RunGuard(&self.running);

        let outcome = match self.run().await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(error = %e, transient = e.is_transient(), "Sync cycle failed");
                SyncOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        self.notifier.outcome(&outcome);
        Some(outcome)
    }

    async fn run(&self) -> Result<SyncOutcome> {
        let pending = self.store.lock().await.pending();
        let mut pushed = self.push_records(pending).await?;

        let remote = self.fetcher.fetch_remote().await?;

        let result = {
            let mut store = self.store.lock().await;
            let result = self.reconciler.reconcile(store.records(), &remote);
            self.passes.fetch_add(1, Ordering::Relaxed);
            store.complete_sync(&result, now_millis())?;
            result
        };

        tracing::debug!(
            remote = remote.len(),
            conflicts = result.conflicts.len(),
            changed = result.changed,
            "Reconciled with remote"
        );

        let pending_conflicts: Vec<ConflictEntry> = result.pending_conflicts().cloned().collect();
        if !pending_conflicts.is_empty() {
            self.notifier.conflicts_pending(&pending_conflicts);
        }

        // merge and sync time are already committed; later failures only log
        if !result.push_queue.is_empty() {
            let queued = self.records_by_id(&result.push_queue).await;
            match self.push_records(queued).await {
                Ok(count) => pushed += count,
                Err(e) => tracing::warn!(error = %e, "Could not mark pushed records synced"),
            }
        }

        Ok(if result.changed {
            SyncOutcome::Synced {
                added: result.added,
                updated: result.replaced,
                pushed,
            }
        } else {
            SyncOutcome::UpToDate { pushed }
        })
    }

    async fn records_by_id(&self, ids: &[RecordId]) -> Vec<QuoteRecord> {
        let store = self.store.lock().await;
        ids.iter().filter_map(|id| store.get(id).cloned()).collect()
    }

    /// Push records, marking acknowledged ones synced. Returns the count.
    async fn push_records(&self, records: Vec<QuoteRecord>) -> Result<usize> {
        let mut acknowledged = 0;
        for record in records {
            if let PushOutcome::Rejected(_) = self.fetcher.push_record(&record).await {
                continue;
            }
            let mut store = self.store.lock().await;
            match store.mark_synced(&record.id, record.version) {
                Ok(true) => acknowledged += 1,
                // edited or deleted while the push was in flight
                Ok(false) | Err(Error::RecordNotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(acknowledged)
    }

    /// Create a quote locally.
    pub async fn add_quote(&self, text: &str, author: &str, category: &str) -> Result<QuoteRecord> {
        let mut store = self.store.lock().await;
        let record = store.add_quote(text, author, category, now_millis())?.clone();
        tracing::info!(id = %record.id, category = %record.category, "Quote added");
        Ok(record)
    }

    /// Edit a quote locally.
    pub async fn update_quote(
        &self,
        id: &str,
        text: &str,
        author: &str,
        category: &str,
    ) -> Result<QuoteRecord> {
        let mut store = self.store.lock().await;
        Ok(store.update_quote(id, text, author, category)?.clone())
    }

    /// Delete a quote locally.
    pub async fn delete_quote(&self, id: &str) -> Result<QuoteRecord> {
        let mut store = self.store.lock().await;
        let removed = store.delete_quote(id)?;
        tracing::info!(id = %removed.id, "Quote deleted");
        Ok(removed)
    }

    /// Import quotes from a JSON array.
    pub async fn import_json(&self, bytes: &[u8]) -> Result<ImportSummary> {
        let mut store = self.store.lock().await;
        let summary = store.import_json(bytes, now_millis())?;
        tracing::info!(
            imported = summary.imported,
            skipped = summary.skipped,
            "Quotes imported"
        );
        Ok(summary)
    }

    /// Export all quotes as a JSON array.
    pub async fn export_json(&self) -> Result<String> {
        Ok(self.store.lock().await.export_json()?)
    }

    /// Conflicts awaiting a manual decision.
    pub async fn pending_conflicts(&self) -> Vec<ConflictEntry> {
        self.store.lock().await.pending_conflicts().to_vec()
    }

    /// Deliver a manual decision for a pending conflict.
    ///
    /// Choosing `Local` leaves the record pending; the next run pushes it.
    pub async fn resolve_conflict(&self, id: &str, choice: Resolution) -> Result<QuoteRecord> {
        let mut store = self.store.lock().await;
        let record = store.resolve_conflict(id, choice)?.clone();
        tracing::info!(id = %record.id, ?choice, "Conflict resolved");
        Ok(record)
    }
}

#[async_trait]
impl<S, T, N> SyncTarget for SyncOrchestrator<S, T, N>
where
    S: KeyValueStore,
    T: Transport,
    N: Notifier,
{
    async fn trigger(&self) -> Option<SyncOutcome> {
        self.sync_now().await
    }
}
