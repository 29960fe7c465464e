//! Cache Module
//!
//! Provides in-memory caching with TTL expiration, FIFO eviction, key locks,
//! pattern invalidation and typed values.

pub mod codec;
mod entry;
mod fifo;
mod locks;
mod pattern;
mod stats;
mod store;
mod value;


// Re-export public types
pub use entry::{CacheEntry, CompressionPolicy};
pub use fifo::FifoTracker;
pub use locks::{KeyLock, LockTable};
pub use pattern::KeyPattern;
pub use stats::{CacheStats, StatsCollector};
pub use store::{CacheStore, SetOptions};
pub use value::CacheValue;
