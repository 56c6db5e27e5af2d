//! Sharded In-Memory Metric Store
//!
//! This module implements the storage engine behind tickstore. Every metric
//! key owns a series of `(timestamp, value)` samples, and the store maps keys
//! to their series.
//!
//! ## Design Decisions
//!
//! 1. **Sharded Locks**: Keys are spread over independent shards so writers to
//!    different keys rarely contend.
//! 2. **Ordered Series**: Each series is a `BTreeMap<i64, f64>`, so a second
//!    `put` on the same timestamp overwrites in place and reads come out
//!    sorted without an extra pass.
//! 3. **Snapshot Wildcard Reads**: `get("*")` takes every shard's read lock
//!    before copying anything out.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      MetricStore                            │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │           │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! A `put` holds exactly one shard write lock, so it is atomic with respect to
//! every reader of that key.

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

/// Number of shards for the store.
const NUM_SHARDS: usize = 64;

/// Key that selects every series in [`MetricStore::get`].
pub const WILDCARD: &str = "*";

/// One recorded measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: i64,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

impl From<(i64, f64)> for Sample {
    fn from((timestamp, value): (i64, f64)) -> Self {
        Self { timestamp, value }
    }
}

/// Result of a read: each matched key with its samples in ascending
/// timestamp order.
pub type SeriesSet = BTreeMap<String, Vec<Sample>>;

/// Samples for one key, at most one value per timestamp.
type Series = BTreeMap<i64, f64>;

fn to_samples(series: &Series) -> Vec<Sample> {
    series
        .iter()
        .map(|(&timestamp, &value)| Sample { timestamp, value })
        .collect()
}

/// A single shard containing a portion of the series.
#[derive(Debug, Default)]
struct Shard {
    series: RwLock<HashMap<String, Series>>,
}

/// The shared metric store.
///
/// Wrap it in an `Arc` and hand a clone to every command executor; all
/// operations take `&self`.
///
/// # Example
///
/// ```
/// use tickstore::storage::{MetricStore, Sample};
///
/// let store = MetricStore::new();
/// store.put("cpu.load", 0.5, 100);
/// store.put("cpu.load", 0.7, 100);
///
/// let result = store.get("cpu.load");
/// assert_eq!(result["cpu.load"], vec![Sample::new(100, 0.7)]);
/// ```
pub struct MetricStore {
    shards: Vec<Shard>,

    /// Number of distinct series
    series_count: AtomicU64,

    /// Number of distinct (key, timestamp) samples
    sample_count: AtomicU64,

    /// Total put operations
    put_count: AtomicU64,

    /// Total get operations
    get_count: AtomicU64,
}

impl std::fmt::Debug for MetricStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricStore")
            .field("shards", &self.shards.len())
            .field("series_count", &self.series_count.load(Ordering::Relaxed))
            .field("sample_count", &self.sample_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for MetricStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        let shards = (0..NUM_SHARDS).map(|_| Shard::default()).collect();

        Self {
            shards,
            series_count: AtomicU64::new(0),
            sample_count: AtomicU64::new(0),
            put_count: AtomicU64::new(0),
            get_count: AtomicU64::new(0),
        }
    }

    #[inline]
    fn shard_index(&self, key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % NUM_SHARDS
    }

    #[inline]
    fn get_shard(&self, key: &str) -> &Shard {
        &self.shards[self.shard_index(key)]
    }

    /// Records `value` at `timestamp` under `key`.
    ///
    /// A sample already stored at the same timestamp is overwritten.
    pub fn put(&self, key: &str, value: f64, timestamp: i64) {
        self.put_count.fetch_add(1, Ordering::Relaxed);

        let mut series = self.get_shard(key).series.write();

        if !series.contains_key(key) {
            series.insert(key.to_owned(), Series::new());
            self.series_count.fetch_add(1, Ordering::Relaxed);
        }

        let is_new = series
            .get_mut(key)
            .is_some_and(|samples| samples.insert(timestamp, value).is_none());

        if is_new {
            self.sample_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Reads the series for `key`, or every series when `key` is `"*"`.
    ///
    /// An unknown key yields a single entry with an empty series.
    pub fn get(&self, key: &str) -> SeriesSet {
        self.get_count.fetch_add(1, Ordering::Relaxed);

        if key == WILDCARD {
            return self.get_all();
        }

        let series = self.get_shard(key).series.read();
        let samples = series.get(key).map(to_samples).unwrap_or_default();

        let mut result = SeriesSet::new();
        result.insert(key.to_owned(), samples);
        result
    }

    fn get_all(&self) -> SeriesSet {
        // Lock every shard first so the copy is a single point-in-time view.
        let guards: Vec<_> = self.shards.iter().map(|s| s.series.read()).collect();

        guards
            .iter()
            .flat_map(|shard| shard.iter())
            .map(|(key, series)| (key.clone(), to_samples(series)))
            .collect()
    }

    /// Returns the number of series.
    pub fn len(&self) -> u64 {
        self.series_count.load(Ordering::Relaxed)
    }

    /// Returns true if no series have been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns store statistics.
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            series: self.series_count.load(Ordering::Relaxed),
            samples: self.sample_count.load(Ordering::Relaxed),
            put_ops: self.put_count.load(Ordering::Relaxed),
            get_ops: self.get_count.load(Ordering::Relaxed),
        }
    }
}

/// Store statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of series currently stored
    pub series: u64,
    /// Number of distinct samples currently stored
    pub samples: u64,
    /// Total put operations
    pub put_ops: u64,
    /// Total get operations
    pub get_ops: u64,
}
