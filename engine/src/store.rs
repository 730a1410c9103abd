//! Store - the owned record container and its persistence boundary.
//!
//! The RecordStore holds the ordered quote list, pending conflicts and sync
//! metadata. Every mutation builds the next state, writes it through the
//! [`KeyValueStore`] as one value, and only then replaces the in-memory state,
//! so a failed write leaves both sides as they were.

use crate::{
    error::Result,
    reconcile::{ConflictEntry, MergeResult, Resolution},
    snapshot::StoreSnapshot,
    storage::KeyValueStore,
    transfer::{self, ImportSummary},
    Error, QuoteRecord, RecordId, Timestamp, Version,
};
use std::collections::{HashMap, HashSet};

/// Default key the store persists under.
pub const RECORDS_KEY: &str = "quotes";

/// Category filter value meaning "no filter".
pub const ALL_CATEGORIES: &str = "all";

/// Where the store's initial contents came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadSource {
    /// Read from storage
    Persisted,
    /// Nothing was stored; the seed set was written
    Seeded,
    /// Stored bytes were unreadable; the seed set replaced them
    Recovered(Error),
}

/// The main store holding all quote state.
#[derive(Debug)]
pub struct RecordStore<S> {
    /// Persistence collaborator
    storage: S,
    /// Key the snapshot lives under
    key: String,
    /// Current state, always equal to what was last written
    state: StoreSnapshot,
    /// Disambiguates local ids created in the same millisecond
    local_counter: u64,
}

impl<S: KeyValueStore> RecordStore<S> {
    /// Open the store under [`RECORDS_KEY`].
    pub fn open(storage: S) -> Result<(Self, LoadSource)> {
        Self::open_with_key(storage, RECORDS_KEY)
    }

    /// Open the store under a custom key.
    ///
    /// Falls back to the seed set when nothing is stored or the stored bytes
    /// are corrupt. Only storage transport failures are returned as errors.
    pub fn open_with_key(storage: S, key: impl Into<String>) -> Result<(Self, LoadSource)> {
        let mut store = Self {
            storage,
            key: key.into(),
            state: StoreSnapshot::new(Vec::new()),
            local_counter: 0,
        };

        let source = match store.load_snapshot() {
            Ok(Some(snapshot)) => {
                store.state = snapshot;
                LoadSource::Persisted
            }
            Ok(None) => {
                store.commit(StoreSnapshot::new(Self::seed()))?;
                LoadSource::Seeded
            }
            Err(err @ Error::StorageCorrupt(_)) => {
                store.commit(StoreSnapshot::new(Self::seed()))?;
                LoadSource::Recovered(err)
            }
            Err(err) => return Err(err),
        };

        Ok((store, source))
    }

    /// The fixed default records used when nothing is persisted.
    pub fn seed() -> Vec<QuoteRecord> {
        vec![
            QuoteRecord::new(
                "seed-1",
                "The journey of a thousand miles begins with one step.",
                "Lao Tzu",
                "Inspirational",
            ),
            QuoteRecord::new(
                "seed-2",
                "Life is what happens when you're busy making other plans.",
                "John Lennon",
                "Life",
            ),
            QuoteRecord::new(
                "seed-3",
                "The best way to predict the future is to create it.",
                "Peter Drucker",
                "Inspiration",
            ),
        ]
    }

    /// Read the persisted records without touching in-memory state.
    ///
    /// Returns `None` when nothing has been persisted yet.
    pub fn load(&self) -> Result<Option<Vec<QuoteRecord>>> {
        Ok(self.load_snapshot()?.map(|s| s.records))
    }

    fn load_snapshot(&self) -> Result<Option<StoreSnapshot>> {
        match self.storage.get(&self.key)? {
            Some(bytes) => StoreSnapshot::from_bytes(&bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Replace the whole record set and persist it.
    pub fn save(&mut self, records: Vec<QuoteRecord>) -> Result<()> {
        let mut next = self.state.clone();
        next.records = records;
        self.commit(next)
    }

    fn commit(&mut self, next: StoreSnapshot) -> Result<()> {
        next.validate()
            .map_err(|e| Error::InvalidRecord(e.to_string()))?;
        let bytes = next.to_bytes()?;
        self.storage.set(&self.key, &bytes)?;
        self.state = next;
        Ok(())
    }

    /// All records in display order.
    pub fn records(&self) -> &[QuoteRecord] {
        &self.state.records
    }

    /// Get a record by id.
    pub fn get(&self, id: &str) -> Option<&QuoteRecord> {
        self.state.records.iter().find(|r| r.id == id)
    }

    fn position(&self, id: &str) -> Result<usize> {
        self.state
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| Error::RecordNotFound(id.to_string()))
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.state.records.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.state.records.is_empty()
    }

    fn next_local_id(&mut self, now: Timestamp) -> RecordId {
        loop {
            let id = QuoteRecord::local_id(now, self.local_counter);
            self.local_counter += 1;
            if self.get(&id).is_none() {
                return id;
            }
        }
    }

    /// Create a quote locally. It stays pending until pushed.
    pub fn add_quote(
        &mut self,
        text: &str,
        author: &str,
        category: &str,
        now: Timestamp,
    ) -> Result<&QuoteRecord> {
        let id = self.next_local_id(now);
        let record = QuoteRecord::new(id, text.trim(), author.trim(), category.trim());
        record.validate()?;

        let mut next = self.state.clone();
        next.records.push(record);
        self.commit(next)?;

        Ok(&self.state.records[self.state.records.len() - 1])
    }

    /// Edit a quote locally, bumping its version.
    pub fn update_quote(
        &mut self,
        id: &str,
        text: &str,
        author: &str,
        category: &str,
    ) -> Result<&QuoteRecord> {
        let pos = self.position(id)?;
        let mut next = self.state.clone();
        let record = &mut next.records[pos];
        record.edit(text.trim(), author.trim(), category.trim());
        record.validate()?;
        self.commit(next)?;

        Ok(&self.state.records[pos])
    }

    /// Remove a quote, together with any conflict pending on it.
    pub fn delete_quote(&mut self, id: &str) -> Result<QuoteRecord> {
        let pos = self.position(id)?;
        let mut next = self.state.clone();
        let removed = next.records.remove(pos);
        next.pending_conflicts.retain(|c| c.id != id);
        self.commit(next)?;
        Ok(removed)
    }

    /// Records the remote has not acknowledged yet, in store order.
    pub fn pending(&self) -> Vec<QuoteRecord> {
        self.state
            .records
            .iter()
            .filter(|r| !r.synced)
            .cloned()
            .collect()
    }

    /// Count of records awaiting push.
    pub fn pending_count(&self) -> usize {
        self.state.records.iter().filter(|r| !r.synced).count()
    }

    /// Mark a pushed record as acknowledged.
    ///
    /// Ignored (returns `false`) when the record changed since `version` was
    /// pushed, so the newer edit stays pending.
    pub fn mark_synced(&mut self, id: &str, version: Version) -> Result<bool> {
        let pos = self.position(id)?;
        let current = &self.state.records[pos];
        if current.version != version || current.synced {
            return Ok(false);
        }

        let mut next = self.state.clone();
        next.records[pos].synced = true;
        self.commit(next)?;
        Ok(true)
    }

    /// Adopt a reconciliation result.
    ///
    /// Versions never go down: if the store holds a newer version of a merged
    /// record, the stored one is kept. Records missing from the merge are
    /// appended rather than dropped. Pending conflicts are recorded, replacing
    /// older ones for the same id, and a stored conflict whose id came back
    /// from the remote without a conflict is dropped. Returns whether anything
    /// was written.
    pub fn apply_merge(&mut self, result: &MergeResult) -> Result<bool> {
        match self.merged_state(result) {
            Some(next) => {
                self.commit(next)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Adopt a reconciliation result and record the sync time in one write.
    pub fn complete_sync(&mut self, result: &MergeResult, now: Timestamp) -> Result<()> {
        let mut next = self.merged_state(result).unwrap_or_else(|| self.state.clone());
        next.last_synced_at = Some(now);
        self.commit(next)
    }

    fn merged_state(&self, result: &MergeResult) -> Option<StoreSnapshot> {
        let seen: HashSet<&str> = result.remote_ids.iter().map(String::as_str).collect();
        let pending: HashSet<&str> = result.pending_conflicts().map(|c| c.id.as_str()).collect();
        let stale = self
            .state
            .pending_conflicts
            .iter()
            .any(|c| seen.contains(c.id.as_str()) && !pending.contains(c.id.as_str()));
        if !result.changed && pending.is_empty() && !stale {
            return None;
        }

        let current: HashMap<&str, &QuoteRecord> = self
            .state
            .records
            .iter()
            .map(|r| (r.id.as_str(), r))
            .collect();

        let mut records: Vec<QuoteRecord> = Vec::with_capacity(result.merged_records.len());
        let mut included: HashSet<&str> = HashSet::with_capacity(result.merged_records.len());
        for merged in &result.merged_records {
            included.insert(merged.id.as_str());
            match current.get(merged.id.as_str()) {
                Some(stored) if stored.version > merged.version => records.push((*stored).clone()),
                _ => records.push(merged.clone()),
            }
        }
        for stored in &self.state.records {
            if !included.contains(stored.id.as_str()) {
                records.push(stored.clone());
            }
        }

        let mut next = self.state.clone();
        next.records = records;
        next.pending_conflicts.retain(|c| !seen.contains(c.id.as_str()));
        next.pending_conflicts.extend(result.pending_conflicts().cloned());
        Some(next)
    }

    /// Conflicts awaiting a manual decision.
    pub fn pending_conflicts(&self) -> &[ConflictEntry] {
        &self.state.pending_conflicts
    }

    /// Settle a pending conflict with `Server` or `Local`.
    pub fn resolve_conflict(&mut self, id: &str, choice: Resolution) -> Result<&QuoteRecord> {
        let conflict_pos = self
            .state
            .pending_conflicts
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| Error::ConflictNotFound(id.to_string()))?;
        let pos = self.position(id)?;

        let mut next = self.state.clone();
        let mut entry = next.pending_conflicts.remove(conflict_pos);
        entry.settle(&mut next.records[pos], choice)?;
        self.commit(next)?;

        Ok(&self.state.records[pos])
    }

    /// When the last successful sync finished.
    pub fn last_synced_at(&self) -> Option<Timestamp> {
        self.state.last_synced_at
    }

    /// The remembered category filter.
    pub fn last_category(&self) -> Option<&str> {
        self.state.last_category.as_deref()
    }

    /// Remember the category filter the user picked.
    pub fn set_last_category(&mut self, category: Option<&str>) -> Result<()> {
        let mut next = self.state.clone();
        next.last_category = category.map(str::to_string);
        self.commit(next)
    }

    /// Distinct categories in first-seen order.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.state
            .records
            .iter()
            .map(|r| r.category.as_str())
            .filter(|c| seen.insert(*c))
            .collect()
    }

    /// Query records.
    pub fn query(&self) -> QuoteQuery<'_, 'static> {
        QuoteQuery::new(&self.state.records)
    }

    /// Records in `category`; `None` or `"all"` returns everything.
    pub fn filter_by_category(&self, category: Option<&str>) -> Vec<&QuoteRecord> {
        let query = self.query();
        match category {
            Some(c) => query.category(c).all(),
            None => query.all(),
        }
    }

    /// Pick one record from the filtered set using a caller-supplied seed.
    pub fn pick(&self, category: Option<&str>, seed: u64) -> Option<&QuoteRecord> {
        let query = self.query();
        match category {
            Some(c) => query.category(c).pick(seed),
            None => query.pick(seed),
        }
    }

    /// Export all records as a JSON array.
    pub fn export_json(&self) -> Result<String> {
        transfer::export_json(&self.state.records)
    }

    /// Import quotes from a JSON array, appending them as pending records.
    pub fn import_json(&mut self, bytes: &[u8], now: Timestamp) -> Result<ImportSummary> {
        let quotes = transfer::parse_import(bytes)?;
        let mut summary = ImportSummary::default();
        let mut added = Vec::with_capacity(quotes.len());
        let mut ids: HashSet<RecordId> =
            self.state.records.iter().map(|r| r.id.clone()).collect();

        for quote in quotes {
            let id = match quote.id.clone() {
                Some(id) if ids.contains(&id) => {
                    summary.skipped += 1;
                    continue;
                }
                Some(id) => id,
                None => {
                    let mut id = self.next_local_id(now);
                    while ids.contains(&id) {
                        id = self.next_local_id(now);
                    }
                    id
                }
            };
            let record = quote.into_record(id);
            if record.validate().is_err() {
                summary.skipped += 1;
                continue;
            }
            ids.insert(record.id.clone());
            added.push(record);
            summary.imported += 1;
        }

        if !added.is_empty() {
            let mut next = self.state.clone();
            next.records.extend(added);
            self.commit(next)?;
        }
        Ok(summary)
    }

    /// The underlying storage collaborator.
    pub fn storage(&self) -> &S {
        &self.storage
    }
}

/// Builder for filtering records.
pub struct QuoteQuery<'a, 'q> {
    records: &'a [QuoteRecord],
    category: Option<&'q str>,
    pending_only: bool,
}

impl<'a, 'q> QuoteQuery<'a, 'q> {
    fn new(records: &'a [QuoteRecord]) -> Self {
        Self {
            records,
            category: None,
            pending_only: false,
        }
    }

    /// Only records in `category`. `"all"` clears the filter.
    pub fn category<'c>(self, category: &'c str) -> QuoteQuery<'a, 'c> {
        QuoteQuery {
            records: self.records,
            category: (category != ALL_CATEGORIES).then_some(category),
            pending_only: self.pending_only,
        }
    }

    /// Only records not yet acknowledged by the remote.
    pub fn pending_only(mut self) -> Self {
        self.pending_only = true;
        self
    }

    fn matches(&self, record: &QuoteRecord) -> bool {
        self.category.map_or(true, |c| record.category == c) && (!self.pending_only || !record.synced)
    }

    /// Get all matching records.
    pub fn all(self) -> Vec<&'a QuoteRecord> {
        self.records.iter().filter(|r| self.matches(r)).collect()
    }

    /// Get the first matching record.
    pub fn first(self) -> Option<&'a QuoteRecord> {
        self.records.iter().find(|r| self.matches(r))
    }

    /// Count matching records.
    pub fn count(self) -> usize {
        self.records.iter().filter(|r| self.matches(r)).count()
    }

    /// Pick `matching[seed % len]`.
    pub fn pick(self, seed: u64) -> Option<&'a QuoteRecord> {
        let matching = self.all();
        if matching.is_empty() {
            return None;
        }
        let index = (seed % matching.len() as u64) as usize;
        Some(matching[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::{Reconciler, ResolutionPolicy};
    use crate::storage::MemoryStorage;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    const NOW: Timestamp = 1706745600000;

    fn open_store() -> RecordStore<Arc<MemoryStorage>> {
        let (store, _) = RecordStore::open(Arc::new(MemoryStorage::new())).unwrap();
        store
    }

    /// Storage whose writes can be made to fail.
    #[derive(Default)]
    struct FlakyStorage {
        inner: MemoryStorage,
        fail_set: AtomicBool,
    }

    impl KeyValueStore for FlakyStorage {
        fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &[u8]) -> Result<()> {
            if self.fail_set.load(Ordering::SeqCst) {
                return Err(Error::Storage("disk full".into()));
            }
            self.inner.set(key, value)
        }
    }

    #[test]
    fn open_empty_storage_seeds() {
        let storage = Arc::new(MemoryStorage::new());
        let (store, source) = RecordStore::open(storage.clone()).unwrap();

        assert_eq!(source, LoadSource::Seeded);
        assert_eq!(store.records(), RecordStore::<MemoryStorage>::seed().as_slice());
        assert!(storage.get(RECORDS_KEY).unwrap().is_some());
    }

    #[test]
    fn open_corrupt_storage_recovers() {
        let storage = MemoryStorage::with_value(RECORDS_KEY, "{truncated");
        let (store, source) = RecordStore::open(storage).unwrap();

        assert!(matches!(source, LoadSource::Recovered(Error::StorageCorrupt(_))));
        assert_eq!(store.len(), 3);
        assert!(store.load().unwrap().is_some());
    }

    #[test]
    fn reopen_reads_persisted() {
        let storage = Arc::new(MemoryStorage::new());
        {
            let (mut store, _) = RecordStore::open(storage.clone()).unwrap();
            store.add_quote("Persist me.", "Tester", "Test", NOW).unwrap();
        }

        let (store, source) = RecordStore::open(storage).unwrap();
        assert_eq!(source, LoadSource::Persisted);
        assert_eq!(store.len(), 4);
        assert_eq!(store.records()[3].text, "Persist me.");
    }

    #[test]
    fn load_reports_corruption() {
        let storage = Arc::new(MemoryStorage::new());
        let (store, _) = RecordStore::open(storage.clone()).unwrap();
        storage.set(RECORDS_KEY, b"[[[").unwrap();

        assert!(matches!(store.load(), Err(Error::StorageCorrupt(_))));
    }

    #[test]
    fn save_replaces_everything() {
        let mut store = open_store();
        store
            .save(vec![QuoteRecord::remote("1", "Only", "One", "Solo")])
            .unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.load().unwrap().unwrap()[0].id, "1");
    }

    #[test]
    fn save_rejects_duplicate_ids() {
        let mut store = open_store();
        let result = store.save(vec![
            QuoteRecord::remote("1", "A", "x", "c"),
            QuoteRecord::remote("1", "B", "y", "d"),
        ]);

        assert!(matches!(result, Err(Error::InvalidRecord(_))));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn failed_write_keeps_state() {
        let storage = Arc::new(FlakyStorage::default());
        let (mut store, _) = RecordStore::open(storage.clone()).unwrap();
        storage.fail_set.store(true, Ordering::SeqCst);

        let err = store.add_quote("Lost", "Nobody", "Void", NOW).unwrap_err();

        assert_eq!(err, Error::Storage("disk full".into()));
        assert_eq!(store.len(), 3);
        assert_eq!(store.load().unwrap().unwrap().len(), 3);
    }

    #[test]
    fn add_quote_assigns_local_ids() {
        let mut store = open_store();
        let first = store.add_quote("One", "", "Test", NOW).unwrap().clone();
        let second = store.add_quote("Two", "Me", "Test", NOW).unwrap().clone();

        assert_ne!(first.id, second.id);
        assert!(first.id.starts_with("local-"));
        assert_eq!(first.author, crate::UNKNOWN_AUTHOR);
        assert!(!first.synced);
        assert_eq!(first.version, 1);
    }

    #[test]
    fn add_quote_requires_text_and_category() {
        let mut store = open_store();
        assert!(store.add_quote("  ", "A", "Test", NOW).is_err());
        assert!(store.add_quote("Text", "A", "", NOW).is_err());
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn update_quote_bumps_version() {
        let mut store = open_store();
        let updated = store
            .update_quote("seed-2", "Edited", "John Lennon", "Life")
            .unwrap();

        assert_eq!(updated.version, 2);
        assert_eq!(updated.text, "Edited");
        assert!(!updated.synced);
    }

    #[test]
    fn update_missing_record() {
        let mut store = open_store();
        assert_eq!(
            store.update_quote("nope", "a", "b", "c").unwrap_err(),
            Error::RecordNotFound("nope".into())
        );
    }

    #[test]
    fn delete_quote_removes() {
        let mut store = open_store();
        let removed = store.delete_quote("seed-1").unwrap();

        assert_eq!(removed.id, "seed-1");
        assert_eq!(store.len(), 2);
        assert!(store.get("seed-1").is_none());
    }

    #[test]
    fn mark_synced_respects_version() {
        let mut store = open_store();
        assert_eq!(store.pending_count(), 3);

        assert!(store.mark_synced("seed-1", 1).unwrap());
        assert!(!store.mark_synced("seed-2", 7).unwrap());
        assert!(!store.mark_synced("seed-1", 1).unwrap());

        assert_eq!(store.pending_count(), 2);
        assert!(store.get("seed-1").unwrap().synced);
    }

    #[test]
    fn apply_merge_keeps_newer_local_version() {
        let mut store = open_store();
        let reconciler = Reconciler::default();
        let remote = vec![QuoteRecord::remote("seed-1", "Changed", "Lao Tzu", "Inspirational")];
        let result = reconciler.reconcile(store.records(), &remote);

        // local edit lands between reconcile and apply
        store.update_quote("seed-1", "Newer", "Lao Tzu", "Inspirational").unwrap();
        store.update_quote("seed-1", "Newest", "Lao Tzu", "Inspirational").unwrap();

        assert!(store.apply_merge(&result).unwrap());
        assert_eq!(store.get("seed-1").unwrap().text, "Newest");
    }

    #[test]
    fn apply_merge_never_drops_records() {
        let mut store = open_store();
        let result = Reconciler::default().reconcile(
            &store.records()[..1],
            &[QuoteRecord::remote("9", "New", "R", "ServerData")],
        );

        store.apply_merge(&result).unwrap();

        assert_eq!(store.len(), 4);
        assert_eq!(store.records()[1].id, "9");
        assert_eq!(store.records()[3].id, "seed-3");
    }

    #[test]
    fn apply_unchanged_merge_writes_nothing() {
        let mut store = open_store();
        let result = Reconciler::default().reconcile(store.records(), &[]);
        assert!(!store.apply_merge(&result).unwrap());
    }

    #[test]
    fn manual_conflict_roundtrip() {
        let storage = Arc::new(MemoryStorage::new());
        let (mut store, _) = RecordStore::open(storage.clone()).unwrap();
        let remote = vec![QuoteRecord::remote("seed-2", "Remote text", "JL", "Life")];
        let result = Reconciler::new(ResolutionPolicy::Manual).reconcile(store.records(), &remote);

        assert!(store.apply_merge(&result).unwrap());
        assert_eq!(store.pending_conflicts().len(), 1);

        // pending conflicts survive a reopen
        let (mut store, _) = RecordStore::open(storage).unwrap();
        assert_eq!(store.pending_conflicts().len(), 1);
        assert_eq!(store.get("seed-2").unwrap().text, "Life is what happens when you're busy making other plans.");

        let record = store.resolve_conflict("seed-2", Resolution::Server).unwrap();
        assert_eq!(record.text, "Remote text");
        assert!(record.synced);
        assert!(store.pending_conflicts().is_empty());
    }

    #[test]
    fn converged_conflict_is_dropped() {
        let mut store = open_store();
        let manual = Reconciler::new(ResolutionPolicy::Manual);
        let contested = vec![QuoteRecord::remote("seed-2", "Remote text", "JL", "Life")];
        store.apply_merge(&manual.reconcile(store.records(), &contested)).unwrap();
        assert_eq!(store.pending_conflicts().len(), 1);

        let agreed = vec![store.get("seed-2").unwrap().clone()];
        let result = manual.reconcile(store.records(), &agreed);
        assert!(result.conflicts.is_empty());

        assert!(store.apply_merge(&result).unwrap());
        assert!(store.pending_conflicts().is_empty());
        assert!(store.resolve_conflict("seed-2", Resolution::Server).is_err());
    }

    #[test]
    fn conflict_absent_from_remote_stays_pending() {
        let mut store = open_store();
        let manual = Reconciler::new(ResolutionPolicy::Manual);
        let contested = vec![QuoteRecord::remote("seed-2", "Remote text", "JL", "Life")];
        store.apply_merge(&manual.reconcile(store.records(), &contested)).unwrap();

        let other = vec![QuoteRecord::remote("9", "Unrelated", "R", "ServerData")];
        store.apply_merge(&manual.reconcile(store.records(), &other)).unwrap();

        assert_eq!(store.pending_conflicts().len(), 1);
    }

    #[test]
    fn complete_sync_stamps_time_with_merge() {
        let mut store = open_store();
        let remote = vec![QuoteRecord::remote("9", "New", "R", "ServerData")];
        let result = Reconciler::default().reconcile(store.records(), &remote);

        store.complete_sync(&result, NOW).unwrap();

        let persisted = store.load().unwrap().unwrap();
        assert_eq!(persisted.len(), 4);
        assert_eq!(store.last_synced_at(), Some(NOW));
    }

    #[test]
    fn failed_complete_sync_changes_nothing() {
        let storage = Arc::new(FlakyStorage::default());
        let (mut store, _) = RecordStore::open(storage.clone()).unwrap();
        let remote = vec![QuoteRecord::remote("9", "New", "R", "ServerData")];
        let result = Reconciler::default().reconcile(store.records(), &remote);
        storage.fail_set.store(true, Ordering::SeqCst);

        assert!(store.complete_sync(&result, NOW).is_err());

        assert_eq!(store.len(), 3);
        assert_eq!(store.last_synced_at(), None);
        assert_eq!(store.load().unwrap().unwrap().len(), 3);
    }

    #[test]
    fn resolve_local_marks_pending_push() {
        let mut store = open_store();
        store.mark_synced("seed-3", 1).unwrap();
        let remote = vec![QuoteRecord::remote("seed-3", "Other", "PD", "Inspiration")];
        let result = Reconciler::new(ResolutionPolicy::Manual).reconcile(store.records(), &remote);
        store.apply_merge(&result).unwrap();

        let record = store.resolve_conflict("seed-3", Resolution::Local).unwrap();

        assert_eq!(record.text, "The best way to predict the future is to create it.");
        assert!(!record.synced);
    }

    #[test]
    fn resolve_unknown_conflict() {
        let mut store = open_store();
        assert_eq!(
            store.resolve_conflict("seed-1", Resolution::Server).unwrap_err(),
            Error::ConflictNotFound("seed-1".into())
        );
    }

    #[test]
    fn delete_drops_pending_conflict() {
        let mut store = open_store();
        let remote = vec![QuoteRecord::remote("seed-1", "X", "Y", "Z")];
        let result = Reconciler::new(ResolutionPolicy::Manual).reconcile(store.records(), &remote);
        store.apply_merge(&result).unwrap();

        store.delete_quote("seed-1").unwrap();
        assert!(store.pending_conflicts().is_empty());
    }

    #[test]
    fn categories_first_seen_order() {
        let mut store = open_store();
        store.add_quote("Again", "Me", "Life", NOW).unwrap();
        store.add_quote("New", "Me", "Humor", NOW).unwrap();

        assert_eq!(
            store.categories(),
            vec!["Inspirational", "Life", "Inspiration", "Humor"]
        );
    }

    #[test]
    fn filter_by_category() {
        let mut store = open_store();
        store.add_quote("Again", "Me", "Life", NOW).unwrap();

        assert_eq!(store.filter_by_category(Some("Life")).len(), 2);
        assert_eq!(store.filter_by_category(Some(ALL_CATEGORIES)).len(), 4);
        assert_eq!(store.filter_by_category(None).len(), 4);
        assert!(store.filter_by_category(Some("Missing")).is_empty());
    }

    #[test]
    fn query_pending_only() {
        let mut store = open_store();
        store.mark_synced("seed-1", 1).unwrap();

        assert_eq!(store.query().pending_only().count(), 2);
        assert_eq!(
            store.query().category("Inspirational").pending_only().first(),
            None
        );
    }

    #[test]
    fn pick_is_deterministic() {
        let store = open_store();

        assert_eq!(store.pick(None, 0).unwrap().id, "seed-1");
        assert_eq!(store.pick(None, 4).unwrap().id, "seed-2");
        assert_eq!(store.pick(Some("Life"), 99).unwrap().id, "seed-2");
        assert!(store.pick(Some("Missing"), 0).is_none());
    }

    #[test]
    fn results_outlive_category_argument() {
        let store = open_store();

        let (filtered, picked) = {
            let wanted = String::from("Life");
            (
                store.filter_by_category(Some(&wanted)),
                store.pick(Some(wanted.as_str()), 0),
            )
        };

        assert_eq!(filtered.len(), 1);
        assert_eq!(picked.map(|r| r.id.as_str()), Some("seed-2"));
    }

    #[test]
    fn last_category_persists() {
        let storage = Arc::new(MemoryStorage::new());
        let (mut store, _) = RecordStore::open(storage.clone()).unwrap();
        store.set_last_category(Some("Life")).unwrap();
        let result = Reconciler::default().reconcile(store.records(), &[]);
        store.complete_sync(&result, NOW).unwrap();

        let (store, _) = RecordStore::open(storage).unwrap();
        assert_eq!(store.last_category(), Some("Life"));
        assert_eq!(store.last_synced_at(), Some(NOW));
    }

    #[test]
    fn import_appends_and_skips_known_ids() {
        let mut store = open_store();
        let file = br#"[
            {"text": "Fresh", "category": "Import"},
            {"id": "seed-1", "text": "Dup", "category": "Import"},
            {"id": "ext-1", "text": "Keyed", "author": "Ext", "category": "Import"},
            {"id": "ext-1", "text": "Keyed twice", "category": "Import"},
            {"text": "", "category": "Import"}
        ]"#;

        let summary = store.import_json(file, NOW).unwrap();

        assert_eq!(summary, ImportSummary { imported: 2, skipped: 3 });
        assert_eq!(store.len(), 5);
        assert!(store.get("ext-1").is_some());
        assert!(store.records().iter().all(|r| r.id != "seed-1" || r.text != "Dup"));
    }

    #[test]
    fn import_rejects_non_array() {
        let mut store = open_store();
        assert!(matches!(
            store.import_json(b"{}", NOW),
            Err(Error::InvalidImport(_))
        ));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn export_then_import_into_fresh_store() {
        let store = open_store();
        let exported = store.export_json().unwrap();

        let (mut other, _) = RecordStore::open(MemoryStorage::new()).unwrap();
        other.save(Vec::new()).unwrap();
        let summary = other.import_json(exported.as_bytes(), NOW).unwrap();

        assert_eq!(summary.imported, 3);
        assert_eq!(other.records()[0].id, "seed-1");
    }
}
