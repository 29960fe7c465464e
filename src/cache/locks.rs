//! Key Lock Module
//!
//! Advisory per-key locks. A held key rejects mutation from everyone except
//! the [`KeyLock`] guard that holds it; reads are never blocked.

use std::collections::HashMap;
use std::time::Duration;

use crate::cache::{CacheStore, CacheValue, SetOptions};
use crate::error::{CacheError, Result};

// == Lock Table ==
/// Keys currently held, each mapped to the token of its holder.
///
/// Tokens are never reused, so a stale guard can always tell that its lock
/// was taken away (for example by `clear`).
#[derive(Debug, Default)]
pub struct LockTable {
    held: HashMap<String, u64>,
    next_token: u64,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    // == Acquire ==
    /// Takes `key` and returns the holder token, or None if already held.
    pub fn acquire(&mut self, key: &str) -> Option<u64> {
        if self.held.contains_key(key) {
            return None;
        }
        self.next_token += 1;
        self.held.insert(key.to_string(), self.next_token);
        Some(self.next_token)
    }

    // == Release ==
    /// Releases `key` if `token` still holds it. Returns whether it did.
    pub fn release(&mut self, key: &str, token: u64) -> bool {
        if self.held.get(key) == Some(&token) {
            self.held.remove(key);
            true
        } else {
            false
        }
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.held.contains_key(key)
    }

    // == Writable Check ==
    /// Fails with `Locked` unless `key` is free or held by `owner`.
    pub fn ensure_writable(&self, key: &str, owner: Option<u64>) -> Result<()> {
        match self.held.get(key) {
            Some(token) if Some(*token) != owner => Err(CacheError::Locked(key.to_string())),
            _ => Ok(()),
        }
    }

    /// Drops every lock.
    pub fn clear(&mut self) {
        self.held.clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.held.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}

// == Key Lock Guard ==
/// Exclusive hold on one key, released when dropped.
///
/// Mutations made through the guard bypass the lock they hold; the same
/// mutations made directly on the store by anyone fail with `Locked`.
#[must_use = "the key is unlocked as soon as the guard is dropped"]
#[derive(Debug)]
pub struct KeyLock<'a> {
    store: &'a CacheStore,
    key: String,
    token: u64,
}

impl<'a> KeyLock<'a> {
    pub(crate) fn new(store: &'a CacheStore, key: String, token: u64) -> Self {
        Self { store, key, token }
    }

    /// The locked key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Reads the locked key. Counts toward hit/miss statistics.
    pub fn get(&self) -> Result<Option<CacheValue>> {
        self.store.get(&self.key)
    }

    pub fn set(&self, value: impl Into<CacheValue>) -> Result<()> {
        self.set_with(value, SetOptions::default())
    }

    pub fn set_with(&self, value: impl Into<CacheValue>, options: SetOptions) -> Result<()> {
        self.store
            .set_as(Some(self.token), self.key.clone(), value.into(), options)
    }

    pub fn increment(&self, by: i64) -> Result<CacheValue> {
        self.store.adjust_as(Some(self.token), &self.key, by)
    }

    pub fn decrement(&self, by: i64) -> Result<CacheValue> {
        let delta = by
            .checked_neg()
            .ok_or_else(|| CacheError::Overflow(self.key.clone()))?;
        self.store.adjust_as(Some(self.token), &self.key, delta)
    }

    pub fn invalidate(&self) -> Result<bool> {
        self.store.invalidate_as(Some(self.token), &self.key)
    }

    /// Remaining TTL of the locked key, if it has one.
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.store.ttl_remaining(&self.key)
    }
}

impl Drop for KeyLock<'_> {
    fn drop(&mut self) {
        self.store.release_lock(&self.key, self.token);
    }
}
