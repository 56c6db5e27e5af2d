//! Storage Module
//!
//! This module provides the metric store for tickstore: a thread-safe,
//! sharded map from metric key to its time-ordered samples.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      MetricStore                            │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │...64    │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ shards  │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The store lives for the whole process. It is only mutated by `put` and
//! nothing is ever removed.
//!
//! ## Example
//!
//! ```
//! use tickstore::storage::{MetricStore, WILDCARD};
//! use std::sync::Arc;
//!
//! let store = Arc::new(MetricStore::new());
//!
//! store.put("temperature", 21.5, 1_700_000_000);
//! store.put("humidity", 0.4, 1_700_000_000);
//!
//! let everything = store.get(WILDCARD);
//! assert_eq!(everything.len(), 2);
//! ```

pub mod engine;

pub use engine::{MetricStore, Sample, SeriesSet, StorageStats, WILDCARD};
