//! Mini Cache - An embeddable in-memory cache engine
//!
//! Provides expiring entries, FIFO size-bounded eviction, glob pattern
//! invalidation, atomic counters, advisory key locks and typed values that
//! survive compression unchanged.

pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod tasks;

pub use cache::{CacheStats, CacheStore, CacheValue, KeyLock, SetOptions};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use tasks::spawn_sweep_task;
