//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

use chrono::Utc;

use crate::cache::{codec, CacheValue};
use crate::error::Result;

// == Compression Policy ==
/// Decides whether an entry payload is stored compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionPolicy {
    /// Store the value as-is
    Never,
    /// Always store a compressed payload
    Always,
    /// Compress once the encoded value reaches this many bytes
    Above(usize),
}

impl CompressionPolicy {
    fn applies_to(self, encoded_len: usize) -> bool {
        match self {
            CompressionPolicy::Never => false,
            CompressionPolicy::Always => true,
            CompressionPolicy::Above(threshold) => encoded_len >= threshold,
        }
    }
}

#[derive(Debug, Clone)]
enum Payload {
    Plain(CacheValue),
    Compressed(Vec<u8>),
}

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    payload: Payload,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<i64>,
    /// Position in eviction order, assigned by the store on insertion
    pub insertion_sequence: u64,
    /// Encoded (or compressed) size of the payload
    size_bytes: usize,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry with optional TTL.
    ///
    /// The value is encoded once to measure it; under a compressing policy the
    /// compressed bytes are kept instead of the value.
    pub fn new(value: CacheValue, ttl: Option<Duration>, policy: CompressionPolicy) -> Result<Self> {
        let now = current_timestamp_ms();
        let expires_at = ttl.map(|ttl| now.saturating_add(duration_ms(ttl)));
        let (payload, size_bytes) = build_payload(value, policy)?;

        Ok(Self {
            payload,
            created_at: now,
            expires_at,
            insertion_sequence: 0,
            size_bytes,
        })
    }

    // == Value ==
    /// Returns the stored value, decompressing it if needed.
    pub fn value(&self) -> Result<CacheValue> {
        match &self.payload {
            Payload::Plain(value) => Ok(value.clone()),
            Payload::Compressed(bytes) => codec::decode(&codec::decompress(bytes)?),
        }
    }

    // == Replace Value ==
    /// Swaps the value in place, keeping timestamps, sequence and compression.
    pub fn replace_value(&mut self, value: CacheValue) -> Result<()> {
        let policy = if self.is_compressed() {
            CompressionPolicy::Always
        } else {
            CompressionPolicy::Never
        };
        let (payload, size_bytes) = build_payload(value, policy)?;
        self.payload = payload;
        self.size_bytes = size_bytes;
        Ok(())
    }

    /// Whether the payload is held as compressed bytes.
    pub fn is_compressed(&self) -> bool {
        matches!(self.payload, Payload::Compressed(_))
    }

    /// Approximate memory held by the payload.
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry stays valid up to and including its expiration millisecond and
    /// is expired strictly after it.
    #[cfg(test)]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Checks expiry against a given clock reading in milliseconds.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        match self.expires_at {
            Some(expires) => now_ms > expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns remaining TTL, or None if no expiration is set.
    ///
    /// # Returns
    /// - `Some(Duration::ZERO)` if the entry has expired (TTL elapsed)
    /// - `Some(remaining)` if the entry has TTL and hasn't expired
    /// - `None` if the entry has no TTL (never expires)
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.expires_at.map(|expires| {
            let remaining = expires.saturating_sub(current_timestamp_ms()).max(0);
            Duration::from_millis(remaining as u64)
        })
    }
}

fn build_payload(value: CacheValue, policy: CompressionPolicy) -> Result<(Payload, usize)> {
    let encoded = codec::encode(&value)?;
    if policy.applies_to(encoded.len()) {
        let packed = codec::compress(&encoded)?;
        let size = packed.len();
        Ok((Payload::Compressed(packed), size))
    } else {
        Ok((Payload::Plain(value), encoded.len()))
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn duration_ms(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}
