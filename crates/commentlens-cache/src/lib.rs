//! commentlens Cache
//!
//! Best-effort persistence of per-video analysis results.
//!
//! Provides:
//! - Quota-bounded key/value stores (in memory and on disk)
//! - An LRU cache of analysis snapshots keyed by video id
//! - Video id extraction from page URLs
//! - Exclude-list persistence

pub mod cache;
pub mod stats;
pub mod store;
pub mod video;

pub use cache::{
    CachePayload, IndexMeta, SaveOutcome, VideoCache, VideoCacheEntry, VideoCacheIndex, DEFAULT_CAPACITY,
    EXCLUDE_KEY, INDEX_KEY,
};
pub use stats::{CacheStats, StatsSnapshot};
pub use store::{FileStore, KvStore, MemoryStore};
pub use video::VideoIdExtractor;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::cache::{CachePayload, VideoCache};
    pub use crate::store::{FileStore, KvStore, MemoryStore};
}
