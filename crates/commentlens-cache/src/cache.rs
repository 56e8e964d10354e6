//! Per-video LRU analysis cache
//!
//! Each analysed video is stored as one JSON payload under its own key. A
//! separate index records `saved_at` and corpus sizes for every payload and
//! is the only thing consulted for eviction. The cache holds at most
//! `capacity` videos; saving a new one evicts the entry with the smallest
//! `saved_at`.
//!
//! The cache is best-effort: a failed save is logged and dropped, a corrupt
//! or mismatched payload loads as a miss and is removed together with its
//! index entry.

use crate::stats::CacheStats;
use crate::store::KvStore;
use chrono::Utc;
use commentlens_core::{codec, CommentThread, Result, SentimentCache, SentimentMode};
use commentlens_index::AnalysisSnapshot;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, error, info, warn};

/// Default number of videos kept
pub const DEFAULT_CAPACITY: usize = 5;

/// Key prefix for per-video payloads
pub const ENTRY_PREFIX: &str = "commentlens:video:";

/// Key of the cache index
pub const INDEX_KEY: &str = "commentlens:index";

/// Key of the persisted exclude list
pub const EXCLUDE_KEY: &str = "commentlens:exclude";

fn entry_key(video_id: &str) -> String {
    format!("{ENTRY_PREFIX}{video_id}")
}

/// Index metadata for one stored payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMeta {
    /// Milliseconds since the Unix epoch, strictly increasing across saves
    pub saved_at: i64,
    pub document_count: usize,
    pub thread_count: usize,
}

/// videoId → metadata for every stored payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoCacheIndex {
    #[serde(with = "codec::pairs")]
    entries: BTreeMap<String, IndexMeta>,
}

impl VideoCacheIndex {
    pub fn get(&self, video_id: &str) -> Option<&IndexMeta> {
        self.entries.get(video_id)
    }

    pub fn contains(&self, video_id: &str) -> bool {
        self.entries.contains_key(video_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, video_id: &str, meta: IndexMeta) {
        self.entries.insert(video_id.to_string(), meta);
    }

    fn remove(&mut self, video_id: &str) -> Option<IndexMeta> {
        self.entries.remove(video_id)
    }

    /// The least recently saved video
    fn oldest(&self) -> Option<String> {
        self.entries
            .iter()
            .min_by_key(|(_, meta)| meta.saved_at)
            .map(|(video_id, _)| video_id.clone())
    }

    fn latest_saved_at(&self) -> Option<i64> {
        self.entries.values().map(|meta| meta.saved_at).max()
    }
}

/// What gets saved for one video
#[derive(Debug, Clone, Copy)]
pub struct CachePayload<'a> {
    pub corpus: &'a [CommentThread],
    pub snapshot: &'a AnalysisSnapshot,
    pub sentiment_cache: &'a SentimentCache,
    pub mode: SentimentMode,
}

#[derive(Serialize)]
struct StoredEntry<'a> {
    video_id: &'a str,
    corpus: &'a [CommentThread],
    snapshot: &'a AnalysisSnapshot,
    sentiment_cache: &'a SentimentCache,
    mode: SentimentMode,
    saved_at: i64,
}

/// A restored cache entry
#[derive(Debug, Clone, Deserialize)]
pub struct VideoCacheEntry {
    pub video_id: String,
    pub corpus: Vec<CommentThread>,
    pub snapshot: AnalysisSnapshot,
    pub sentiment_cache: SentimentCache,
    #[serde(default)]
    pub mode: SentimentMode,
    pub saved_at: i64,
}

impl VideoCacheEntry {
    /// Whether the payload agrees with its index metadata
    fn matches(&self, video_id: &str, meta: &IndexMeta) -> bool {
        self.video_id == video_id
            && self.saved_at == meta.saved_at
            && self.snapshot.document_count == meta.document_count
            && self.snapshot.thread_count == meta.thread_count
            && self.snapshot.is_current(&self.corpus)
    }
}

/// Result of [`VideoCache::save`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Stored { saved_at: i64, evicted: Vec<String> },
    Dropped { evicted: Vec<String> },
}

impl SaveOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, Self::Stored { .. })
    }

    pub fn evicted(&self) -> &[String] {
        match self {
            Self::Stored { evicted, .. } | Self::Dropped { evicted } => evicted.as_slice(),
        }
    }
}

/// LRU cache of per-video analysis results over a [`KvStore`]
pub struct VideoCache<S> {
    store: S,
    capacity: usize,
    stats: CacheStats,
    // serializes index read-modify-write cycles
    index_lock: Mutex<()>,
}

impl<S: KvStore> VideoCache<S> {
    pub fn new(store: S) -> Self {
        Self::with_capacity(store, DEFAULT_CAPACITY)
    }

    /// A capacity of zero is treated as one
    pub fn with_capacity(store: S, capacity: usize) -> Self {
        Self {
            store,
            capacity: capacity.max(1),
            stats: CacheStats::new(),
            index_lock: Mutex::new(()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Save `payload` as the most recent entry for `video_id`.
    ///
    /// Never fails: a write the store refuses twice is dropped and logged,
    /// and leaves no index entry behind for `video_id`.
    pub fn save(&self, video_id: &str, payload: &CachePayload<'_>) -> SaveOutcome {
        let _guard = self.index_lock.lock();
        let mut index = self.read_index();
        let mut evicted = Vec::new();

        if index.remove(video_id).is_some() {
            self.remove_payload(video_id);
        }

        while index.len() >= self.capacity {
            match index.oldest() {
                Some(oldest) => {
                    self.evict(&mut index, &oldest, "capacity");
                    evicted.push(oldest);
                }
                None => break,
            }
        }

        let saved_at = match index.latest_saved_at() {
            Some(latest) => Utc::now().timestamp_millis().max(latest + 1),
            None => Utc::now().timestamp_millis(),
        };

        let encoded = serde_json::to_string(&StoredEntry {
            video_id,
            corpus: payload.corpus,
            snapshot: payload.snapshot,
            sentiment_cache: payload.sentiment_cache,
            mode: payload.mode,
            saved_at,
        });
        let encoded = match encoded {
            Ok(encoded) => encoded,
            Err(e) => {
                error!("Dropping cache write for {}: cannot encode payload: {}", video_id, e);
                return self.drop_write(&mut index, video_id, evicted);
            }
        };

        let meta = IndexMeta {
            saved_at,
            document_count: payload.snapshot.document_count,
            thread_count: payload.snapshot.thread_count,
        };

        let first = self.write_entry(&mut index, video_id, &encoded, meta);
        let result = match first {
            Err(e) if e.is_quota() => match index.oldest() {
                Some(oldest) => {
                    warn!("Cache quota exceeded saving {}, evicting {} and retrying", video_id, oldest);
                    self.evict(&mut index, &oldest, "quota");
                    evicted.push(oldest);
                    self.write_entry(&mut index, video_id, &encoded, meta)
                }
                None => Err(e),
            },
            other => other,
        };

        match result {
            Ok(()) => {
                self.stats.record_write();
                metrics::counter!("commentlens_cache_writes_total", "outcome" => "stored").increment(1);
                info!("Cached {} ({} documents, {} bytes)", video_id, meta.document_count, encoded.len());
                SaveOutcome::Stored { saved_at, evicted }
            }
            Err(e) => {
                error!("Dropping cache write for {}: {}", video_id, e);
                self.drop_write(&mut index, video_id, evicted)
            }
        }
    }

    /// Load the entry for `video_id`. Unreadable, corrupt or inconsistent
    /// entries are misses and are removed from the store.
    pub fn load(&self, video_id: &str) -> Option<VideoCacheEntry> {
        let _guard = self.index_lock.lock();
        let mut index = self.read_index();

        let Some(meta) = index.get(video_id).copied() else {
            debug!("Cache miss for {}", video_id);
            self.stats.record_miss();
            return None;
        };

        let raw = match self.store.get(&entry_key(video_id)) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                warn!("Cache index lists {} but its payload is missing", video_id);
                self.discard(&mut index, video_id);
                self.stats.record_corrupt();
                return None;
            }
            Err(e) => {
                warn!("Cannot read cache entry {}: {}", video_id, e);
                self.stats.record_miss();
                return None;
            }
        };

        let entry = match serde_json::from_str::<VideoCacheEntry>(&raw) {
            Ok(entry) if entry.matches(video_id, &meta) => entry,
            Ok(_) => {
                warn!("Cache entry {} does not match its index metadata, discarding", video_id);
                self.discard(&mut index, video_id);
                self.stats.record_corrupt();
                return None;
            }
            Err(e) => {
                warn!("Corrupt cache entry {}: {}, discarding", video_id, e);
                self.discard(&mut index, video_id);
                self.stats.record_corrupt();
                return None;
            }
        };

        debug!("Cache hit for {} (saved at {})", video_id, entry.saved_at);
        self.stats.record_hit();
        Some(entry)
    }

    /// Remove the entry for `video_id`; returns whether one existed
    pub fn remove(&self, video_id: &str) -> Result<bool> {
        let _guard = self.index_lock.lock();
        let mut index = self.read_index();

        if index.remove(video_id).is_none() {
            return Ok(false);
        }
        self.store.remove(&entry_key(video_id))?;
        self.write_index(&index)?;
        Ok(true)
    }

    /// Indexed entries, most recently saved first
    pub fn entries(&self) -> Vec<(String, IndexMeta)> {
        let _guard = self.index_lock.lock();
        let mut entries: Vec<_> = self.read_index().entries.into_iter().collect();
        entries.sort_by(|a, b| b.1.saved_at.cmp(&a.1.saved_at).then_with(|| a.0.cmp(&b.0)));
        entries
    }

    pub fn index(&self) -> VideoCacheIndex {
        let _guard = self.index_lock.lock();
        self.read_index()
    }

    /// The persisted exclude list; empty when absent or unreadable
    pub fn load_excluded(&self) -> BTreeSet<String> {
        match self.store.get(EXCLUDE_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Ignoring unreadable exclude list: {}", e);
                BTreeSet::new()
            }),
            Ok(None) => BTreeSet::new(),
            Err(e) => {
                warn!("Cannot read exclude list: {}", e);
                BTreeSet::new()
            }
        }
    }

    pub fn save_excluded(&self, words: &BTreeSet<String>) -> Result<()> {
        let encoded = serde_json::to_string(words)?;
        self.store.set(EXCLUDE_KEY, &encoded)
    }

    fn read_index(&self) -> VideoCacheIndex {
        match self.store.get(INDEX_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Cache index is corrupt, starting empty: {}", e);
                VideoCacheIndex::default()
            }),
            Ok(None) => VideoCacheIndex::default(),
            Err(e) => {
                warn!("Cannot read cache index, starting empty: {}", e);
                VideoCacheIndex::default()
            }
        }
    }

    fn write_index(&self, index: &VideoCacheIndex) -> Result<()> {
        let encoded = serde_json::to_string(index)?;
        self.store.set(INDEX_KEY, &encoded)
    }

    /// Payload first, then the index; on failure the index keeps no entry
    /// for `video_id`
    fn write_entry(&self, index: &mut VideoCacheIndex, video_id: &str, encoded: &str, meta: IndexMeta) -> Result<()> {
        self.store.set(&entry_key(video_id), encoded)?;
        index.insert(video_id, meta);
        if let Err(e) = self.write_index(index) {
            index.remove(video_id);
            return Err(e);
        }
        Ok(())
    }

    fn evict(&self, index: &mut VideoCacheIndex, video_id: &str, reason: &'static str) {
        index.remove(video_id);
        self.remove_payload(video_id);
        self.stats.record_eviction();
        metrics::counter!("commentlens_cache_evictions_total", "reason" => reason).increment(1);
        info!("Evicted cached video {} ({})", video_id, reason);
    }

    fn drop_write(&self, index: &mut VideoCacheIndex, video_id: &str, evicted: Vec<String>) -> SaveOutcome {
        index.remove(video_id);
        self.remove_payload(video_id);
        if let Err(e) = self.write_index(index) {
            warn!("Cannot update cache index after dropped write: {}", e);
        }
        self.stats.record_dropped_write();
        metrics::counter!("commentlens_cache_writes_total", "outcome" => "dropped").increment(1);
        SaveOutcome::Dropped { evicted }
    }

    /// Drop a bad payload and its index entry
    fn discard(&self, index: &mut VideoCacheIndex, video_id: &str) {
        index.remove(video_id);
        self.remove_payload(video_id);
        if let Err(e) = self.write_index(index) {
            warn!("Cannot update cache index after discarding {}: {}", video_id, e);
        }
        metrics::counter!("commentlens_cache_evictions_total", "reason" => "corrupt").increment(1);
    }

    fn remove_payload(&self, video_id: &str) {
        if let Err(e) = self.store.remove(&entry_key(video_id)) {
            warn!("Cannot remove cached payload {}: {}", video_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_index_wire_shape() {
        let mut index = VideoCacheIndex::default();
        index.insert(
            "BV1",
            IndexMeta {
                saved_at: 10,
                document_count: 3,
                thread_count: 2,
            },
        );

        let json = serde_json::to_value(&index).unwrap();
        assert_eq!(
            json,
            serde_json::json!([["BV1", {"saved_at": 10, "document_count": 3, "thread_count": 2}]])
        );
        let back: VideoCacheIndex = serde_json::from_value(json).unwrap();
        assert_eq!(back, index);
    }

    #[test]
    fn test_oldest_uses_saved_at() {
        let mut index = VideoCacheIndex::default();
        for (id, saved_at) in [("a", 30), ("b", 10), ("c", 20)] {
            index.insert(
                id,
                IndexMeta {
                    saved_at,
                    document_count: 0,
                    thread_count: 0,
                },
            );
        }
        assert_eq!(index.oldest().as_deref(), Some("b"));
        assert_eq!(index.latest_saved_at(), Some(30));
    }

    #[test]
    fn test_zero_capacity_keeps_one() {
        let cache = VideoCache::with_capacity(MemoryStore::new(), 0);
        assert_eq!(cache.capacity(), 1);
    }

    #[test]
    fn test_unreadable_exclude_list_is_empty() {
        let store = MemoryStore::new();
        store.set(EXCLUDE_KEY, "not json").unwrap();
        let cache = VideoCache::new(store);
        assert!(cache.load_excluded().is_empty());
    }
}
