//! Incremental merge (upsert) over keyed snapshots.
//!
//! A [`Snapshot`] is the in-memory form of one persisted table. The functions
//! here are pure: loading and writing snapshots lives in [`crate::store`].
//!
//! ## Invariants
//!
//! 1. The key set of a snapshot only grows through [`merge`].
//! 2. A record whose payload is resolved is never overwritten.
//! 3. Within a batch, the first occurrence of a key wins.
//! 4. `merge(merge(s, b), b)` reports zero changes.

use rustc_hash::{FxHashMap, FxHashSet};

// ============================================================================
// Record Contract
// ============================================================================

/// A record that can live in a snapshot.
pub trait SnapshotRecord: Clone {
    /// Unique key of the record within its snapshot.
    fn key(&self) -> &str;

    /// Whether the record carries its payload. Records without a nullable
    /// payload are resolved as soon as they exist.
    fn is_resolved(&self) -> bool {
        true
    }

    /// Canonicalize the payload before comparison (empty text becomes null).
    fn normalize(&mut self) {}
}

// ============================================================================
// Snapshot
// ============================================================================

/// Ordered records plus a key index. Order is insertion order; it carries no
/// meaning but keeps rewrites deterministic.
#[derive(Clone, Debug)]
pub struct Snapshot<R> {
    records: Vec<R>,
    index: FxHashMap<String, usize>,
}

impl<R: SnapshotRecord> Snapshot<R> {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    /// Build a snapshot from loaded rows: rows are normalized and duplicate
    /// keys keep their first occurrence.
    pub fn from_records(records: impl IntoIterator<Item = R>) -> Self {
        let mut snapshot = Self::new();
        for mut record in records {
            record.normalize();
            if !snapshot.index.contains_key(record.key()) {
                snapshot.push(record);
            }
        }
        snapshot
    }

    fn push(&mut self, record: R) {
        self.index.insert(record.key().to_string(), self.records.len());
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&R> {
        self.index.get(key).map(|&i| &self.records[i])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.records.iter()
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn into_records(self) -> Vec<R> {
        self.records
    }

    /// Number of records carrying their payload
    pub fn resolved_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_resolved()).count()
    }
}

impl<R: SnapshotRecord> Default for Snapshot<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: SnapshotRecord> FromIterator<R> for Snapshot<R> {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        Self::from_records(iter)
    }
}

// ============================================================================
// Work Set
// ============================================================================

/// Candidate keys that need resolution: absent from the snapshot, or present
/// with a null/empty payload. Keeps candidate order, without duplicates.
pub fn missing_keys<R, I, K>(snapshot: &Snapshot<R>, candidates: I) -> Vec<String>
where
    R: SnapshotRecord,
    I: IntoIterator<Item = K>,
    K: AsRef<str>,
{
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut missing = Vec::new();
    for candidate in candidates {
        let key = candidate.as_ref();
        if !seen.insert(key.to_string()) {
            continue;
        }
        let needs_work = snapshot.get(key).map_or(true, |record| !record.is_resolved());
        if needs_work {
            missing.push(key.to_string());
        }
    }
    missing
}

// ============================================================================
// Merge
// ============================================================================

/// Counts reported by [`merge`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    pub added: usize,
    pub updated: usize,
}

impl MergeOutcome {
    /// Nothing changed. Callers skip the write in this case.
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.updated == 0
    }
}

/// Drop repeated keys from a batch, keeping the first occurrence.
pub fn dedup_first<R: SnapshotRecord>(batch: Vec<R>) -> Vec<R> {
    let mut seen: FxHashSet<String> = FxHashSet::default();
    batch
        .into_iter()
        .filter(|record| seen.insert(record.key().to_string()))
        .collect()
}

/// Merge a freshly fetched batch into an existing snapshot.
///
/// - key absent from `old` → added
/// - key present with a null payload and the batch record resolved → overwritten
/// - anything else → the old record is kept
pub fn merge<R: SnapshotRecord>(old: Snapshot<R>, batch: Vec<R>) -> (Snapshot<R>, MergeOutcome) {
    let mut merged = old;
    let mut outcome = MergeOutcome::default();

    for mut record in dedup_first(batch) {
        record.normalize();
        match merged.index.get(record.key()).copied() {
            None => {
                merged.push(record);
                outcome.added += 1;
            }
            Some(i) => {
                if !merged.records[i].is_resolved() && record.is_resolved() {
                    merged.records[i] = record;
                    outcome.updated += 1;
                }
            }
        }
    }

    (merged, outcome)
}

// ============================================================================
// TESTS
// ============================================================================
