//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with FIFO eviction, TTL
//! expiration and advisory key locks.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

use crate::cache::entry::{current_timestamp_ms, CompressionPolicy};
use crate::cache::{
    CacheEntry, CacheStats, CacheValue, FifoTracker, KeyLock, KeyPattern, LockTable,
    StatsCollector,
};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};

// == Set Options ==
/// Per-call options for `set_with` and `set_many_with`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Time to live; falls back to the store's default TTL when None
    pub ttl: Option<Duration>,
    /// Store the payload compressed regardless of size
    pub compress: bool,
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn compressed(mut self) -> Self {
        self.compress = true;
        self
    }
}

// == Shelf ==
/// Everything guarded by the store mutex.
#[derive(Debug, Default)]
struct Shelf {
    entries: HashMap<String, CacheEntry>,
    fifo: FifoTracker,
    locks: LockTable,
    next_sequence: u64,
    max_size: Option<usize>,
}

impl Shelf {
    /// Inserts or overwrites `key`. Overwrites take a fresh sequence.
    fn insert(&mut self, key: String, mut entry: CacheEntry) {
        self.next_sequence += 1;
        entry.insertion_sequence = self.next_sequence;
        self.fifo.insert(entry.insertion_sequence, &key);
        if let Some(previous) = self.entries.insert(key, entry) {
            self.fifo.remove(previous.insertion_sequence);
        }
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        self.fifo.remove(entry.insertion_sequence);
        Some(entry)
    }

    /// Drops oldest insertions until the size bound holds.
    fn evict_overflow(&mut self) -> Vec<String> {
        let Some(max_size) = self.max_size else {
            return Vec::new();
        };

        let mut evicted = Vec::new();
        while self.entries.len() > max_size {
            match self.fifo.evict_oldest() {
                Some(key) => {
                    self.entries.remove(&key);
                    evicted.push(key);
                }
                None => break,
            }
        }
        evicted
    }

    /// Removes `key` if it has expired. Returns whether it did.
    fn purge_if_expired(&mut self, key: &str, now: i64) -> bool {
        let expired = self
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_expired_at(now));
        if expired {
            self.remove(key);
        }
        expired
    }

    fn purge_expired(&mut self, now: i64) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove(key);
        }
        expired.len()
    }

    fn live_entries(&self, now: i64) -> impl Iterator<Item = &CacheEntry> {
        self.entries
            .values()
            .filter(move |entry| !entry.is_expired_at(now))
    }

    fn live_entry(&self, key: &str, now: i64) -> Option<&CacheEntry> {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
    }
}

// == Cache Store ==
/// Thread-safe in-memory cache.
///
/// All methods take `&self`; share one store between callers through an
/// `Arc<CacheStore>`. A single mutex guards the entry map, eviction order and
/// lock table, so operations on one key are linearizable. Statistics are kept
/// in atomics outside that mutex.
#[derive(Debug)]
pub struct CacheStore {
    shelf: Mutex<Shelf>,
    /// Signalled whenever a key lock is released
    unlocked: Condvar,
    stats: StatsCollector,
    default_ttl: Option<Duration>,
    compression: CompressionPolicy,
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore {
    // == Constructors ==
    /// Creates an unbounded store with no default TTL.
    pub fn new() -> Self {
        Self {
            shelf: Mutex::new(Shelf::default()),
            unlocked: Condvar::new(),
            stats: StatsCollector::new(),
            default_ttl: None,
            compression: CompressionPolicy::Never,
        }
    }

    /// Creates a store holding at most `max_size` entries.
    pub fn with_max_size(max_size: usize) -> Self {
        let store = Self::new();
        store.configure(Some(max_size));
        store
    }

    /// Creates a store from configuration.
    pub fn from_config(config: &CacheConfig) -> Self {
        let store = Self {
            default_ttl: config.default_ttl.map(Duration::from_secs),
            compression: config
                .compress_threshold
                .map_or(CompressionPolicy::Never, CompressionPolicy::Above),
            ..Self::new()
        };
        store.configure(config.max_size);
        store
    }

    // == Configure ==
    /// Sets the size bound. `None` or `Some(0)` means unbounded.
    ///
    /// Shrinking below the current occupancy evicts right away.
    pub fn configure(&self, max_size: Option<usize>) {
        let mut shelf = self.shelf.lock();
        shelf.max_size = max_size.filter(|&size| size > 0);
        let evicted = shelf.evict_overflow();
        drop(shelf);

        debug!(max_size = ?max_size, "cache size bound configured");
        self.record_evictions(&evicted);
    }

    pub fn max_size(&self) -> Option<usize> {
        self.shelf.lock().max_size
    }

    // == Set ==
    /// Stores a value with the store defaults.
    ///
    /// If the key already exists, the value is overwritten and TTL is reset.
    /// Fails with `Locked` if another caller holds the key.
    pub fn set(&self, key: impl Into<String>, value: impl Into<CacheValue>) -> Result<()> {
        self.set_with(key, value, SetOptions::default())
    }

    /// Stores a value with explicit TTL and compression options.
    pub fn set_with(
        &self,
        key: impl Into<String>,
        value: impl Into<CacheValue>,
        options: SetOptions,
    ) -> Result<()> {
        self.set_as(None, key.into(), value.into(), options)
    }

    pub(crate) fn set_as(
        &self,
        owner: Option<u64>,
        key: String,
        value: CacheValue,
        options: SetOptions,
    ) -> Result<()> {
        let entry = self.build_entry(value, options)?;

        let mut shelf = self.shelf.lock();
        shelf.locks.ensure_writable(&key, owner)?;
        trace!(key = %key, compressed = entry.is_compressed(), "storing entry");
        shelf.insert(key, entry);
        let evicted = shelf.evict_overflow();
        drop(shelf);

        self.record_evictions(&evicted);
        Ok(())
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Returns None if the key is absent or expired; expired entries are
    /// removed. Every call counts as exactly one hit or one miss.
    pub fn get(&self, key: &str) -> Result<Option<CacheValue>> {
        let now = current_timestamp_ms();
        let mut shelf = self.shelf.lock();
        self.lookup(&mut shelf, key, now)
    }

    fn lookup(&self, shelf: &mut Shelf, key: &str, now: i64) -> Result<Option<CacheValue>> {
        if shelf.purge_if_expired(key, now) {
            trace!(key = %key, "dropped expired entry on read");
            self.stats.record_expirations(1);
        }

        match shelf.entries.get(key) {
            Some(entry) => {
                let value = entry.value()?;
                self.stats.record_hit();
                Ok(Some(value))
            }
            None => {
                self.stats.record_miss();
                Ok(None)
            }
        }
    }

    // == Bulk Operations ==
    /// Reads several keys under one acquisition of the store mutex.
    ///
    /// Only keys that were found appear in the result; each key still counts
    /// as its own hit or miss.
    pub fn get_many<I, K>(&self, keys: I) -> Result<HashMap<String, CacheValue>>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let now = current_timestamp_ms();
        let mut shelf = self.shelf.lock();
        let mut found = HashMap::new();

        for key in keys {
            let key = key.as_ref();
            if let Some(value) = self.lookup(&mut shelf, key, now)? {
                found.insert(key.to_string(), value);
            }
        }
        Ok(found)
    }

    /// Stores several values with the store defaults. All or nothing.
    pub fn set_many<I, K, V>(&self, items: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<CacheValue>,
    {
        self.set_many_with(items, SetOptions::default())
    }

    /// Stores several values with shared options.
    ///
    /// If any key is locked the call fails with `Locked` and nothing from the
    /// batch is stored.
    pub fn set_many_with<I, K, V>(&self, items: I, options: SetOptions) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<CacheValue>,
    {
        let staged = items
            .into_iter()
            .map(|(key, value)| -> Result<(String, CacheEntry)> {
                Ok((key.into(), self.build_entry(value.into(), options)?))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut shelf = self.shelf.lock();
        for (key, _) in &staged {
            shelf.locks.ensure_writable(key, None)?;
        }

        let count = staged.len();
        for (key, entry) in staged {
            shelf.insert(key, entry);
        }
        let evicted = shelf.evict_overflow();
        drop(shelf);

        debug!(count, "stored batch");
        self.record_evictions(&evicted);
        Ok(())
    }

    // == Invalidate ==
    /// Removes a key. Returns whether a live entry was removed.
    ///
    /// Absent keys are not an error. Fails with `Locked` if another caller
    /// holds the key.
    pub fn invalidate(&self, key: &str) -> Result<bool> {
        self.invalidate_as(None, key)
    }

    pub(crate) fn invalidate_as(&self, owner: Option<u64>, key: &str) -> Result<bool> {
        let now = current_timestamp_ms();
        let mut shelf = self.shelf.lock();
        shelf.locks.ensure_writable(key, owner)?;

        match shelf.remove(key) {
            Some(entry) if entry.is_expired_at(now) => {
                self.stats.record_expirations(1);
                Ok(false)
            }
            Some(_) => Ok(true),
            None => Ok(false),
        }
    }

    /// Removes every live key matching a glob pattern such as `user:*`.
    ///
    /// Returns the number of keys removed. If a matching key is locked by
    /// someone else the call fails with `Locked` and removes nothing.
    pub fn invalidate_pattern(&self, pattern: &str) -> Result<usize> {
        let pattern = KeyPattern::new(pattern)?;
        let now = current_timestamp_ms();

        let mut shelf = self.shelf.lock();
        let expired = shelf.purge_expired(now);
        self.stats.record_expirations(expired as u64);

        let matched: Vec<String> = shelf
            .entries
            .keys()
            .filter(|key| pattern.matches(key))
            .cloned()
            .collect();
        for key in &matched {
            shelf.locks.ensure_writable(key, None)?;
        }
        for key in &matched {
            shelf.remove(key);
        }
        drop(shelf);

        debug!(
            pattern = pattern.as_str(),
            removed = matched.len(),
            "invalidated keys matching pattern"
        );
        Ok(matched.len())
    }

    // == Clear ==
    /// Removes every entry and releases every lock. Statistics are kept.
    pub fn clear(&self) {
        let mut shelf = self.shelf.lock();
        let removed = shelf.entries.len();
        shelf.entries.clear();
        shelf.fifo.clear();
        shelf.locks.clear();
        drop(shelf);

        self.unlocked.notify_all();
        debug!(removed, "cache cleared");
    }

    // == Counters ==
    /// Adds `by` to a numeric value and returns the new value.
    ///
    /// Fails with `KeyNotFound` if the key is absent or expired and with
    /// `NotNumeric` if it does not hold a number.
    pub fn increment(&self, key: &str, by: i64) -> Result<CacheValue> {
        self.adjust_as(None, key, by)
    }

    /// Subtracts `by` from a numeric value and returns the new value.
    pub fn decrement(&self, key: &str, by: i64) -> Result<CacheValue> {
        let delta = by
            .checked_neg()
            .ok_or_else(|| CacheError::Overflow(key.to_string()))?;
        self.adjust_as(None, key, delta)
    }

    /// Shorthand for `increment(key, 1)`.
    pub fn incr(&self, key: &str) -> Result<CacheValue> {
        self.increment(key, 1)
    }

    /// Shorthand for `decrement(key, 1)`.
    pub fn decr(&self, key: &str) -> Result<CacheValue> {
        self.decrement(key, 1)
    }

    pub(crate) fn adjust_as(&self, owner: Option<u64>, key: &str, delta: i64) -> Result<CacheValue> {
        let now = current_timestamp_ms();
        let mut shelf = self.shelf.lock();
        shelf.locks.ensure_writable(key, owner)?;

        if shelf.purge_if_expired(key, now) {
            self.stats.record_expirations(1);
        }

        let entry = shelf
            .entries
            .get_mut(key)
            .ok_or_else(|| CacheError::KeyNotFound(key.to_string()))?;
        let updated = entry.value()?.offset(key, delta)?;
        entry.replace_value(updated.clone())?;
        Ok(updated)
    }

    // == Locking ==
    /// Takes the lock on `key`, waiting for the current holder if any.
    ///
    /// Locks are not reentrant: locking a key this thread already holds
    /// waits forever. Use [`try_lock`](Self::try_lock) where that can happen.
    pub fn lock(&self, key: impl Into<String>) -> KeyLock<'_> {
        let key = key.into();
        let mut shelf = self.shelf.lock();
        loop {
            if let Some(token) = shelf.locks.acquire(&key) {
                trace!(key = %key, "key locked");
                return KeyLock::new(self, key, token);
            }
            self.unlocked.wait(&mut shelf);
        }
    }

    /// Takes the lock on `key`, failing with `Locked` if it is held.
    pub fn try_lock(&self, key: impl Into<String>) -> Result<KeyLock<'_>> {
        let key = key.into();
        let token = self.shelf.lock().locks.acquire(&key);
        match token {
            Some(token) => Ok(KeyLock::new(self, key, token)),
            None => Err(CacheError::Locked(key)),
        }
    }

    pub fn is_locked(&self, key: &str) -> bool {
        self.shelf.lock().locks.is_held(key)
    }

    pub(crate) fn release_lock(&self, key: &str, token: u64) {
        let released = self.shelf.lock().locks.release(key, token);
        if released {
            trace!(key = %key, "key unlocked");
            self.unlocked.notify_all();
        }
    }

    // == Stats ==
    /// Returns hit/miss counters accumulated since creation or last reset.
    pub fn get_statistics(&self) -> CacheStats {
        self.stats.snapshot(self.len())
    }

    /// Zeroes the statistics counters. Entries are untouched.
    pub fn reset_statistics(&self) {
        self.stats.reset();
    }

    /// Approximate bytes held by live values, using their encoded or
    /// compressed size.
    pub fn get_memory_usage(&self) -> usize {
        let now = current_timestamp_ms();
        self.shelf
            .lock()
            .live_entries(now)
            .map(CacheEntry::size_bytes)
            .sum()
    }

    // == Inspection ==
    /// True if a live entry exists. Does not touch statistics.
    pub fn contains_key(&self, key: &str) -> bool {
        let now = current_timestamp_ms();
        self.shelf.lock().live_entry(key, now).is_some()
    }

    /// Remaining TTL of a live entry, None if absent or without expiry.
    pub fn ttl_remaining(&self, key: &str) -> Option<Duration> {
        let now = current_timestamp_ms();
        self.shelf
            .lock()
            .live_entry(key, now)
            .and_then(CacheEntry::ttl_remaining)
    }

    // == Length ==
    /// Returns the number of live entries.
    pub fn len(&self) -> usize {
        let now = current_timestamp_ms();
        self.shelf.lock().live_entries(now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // == Sweep Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn sweep_expired(&self) -> usize {
        let now = current_timestamp_ms();
        let removed = self.shelf.lock().purge_expired(now);
        self.stats.record_expirations(removed as u64);
        removed
    }

    fn build_entry(&self, value: CacheValue, options: SetOptions) -> Result<CacheEntry> {
        let policy = if options.compress {
            CompressionPolicy::Always
        } else {
            self.compression
        };
        CacheEntry::new(value, options.ttl.or(self.default_ttl), policy)
    }

    fn record_evictions(&self, evicted: &[String]) {
        for key in evicted {
            debug!(key = %key, "evicted oldest entry");
            self.stats.record_eviction();
        }
    }
}
