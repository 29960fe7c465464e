//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::str::FromStr;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables; unset values
/// leave the corresponding feature off.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries, None = unbounded
    pub max_size: Option<usize>,
    /// Default TTL in seconds for entries stored without explicit TTL
    pub default_ttl: Option<u64>,
    /// Background sweep interval in seconds, None = lazy expiry only
    pub sweep_interval: Option<u64>,
    /// Encoded size in bytes from which payloads are compressed automatically
    pub compress_threshold: Option<usize>,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_MAX_SIZE` - Maximum entries (default: unbounded, 0 = unbounded)
    /// - `CACHE_DEFAULT_TTL` - Default TTL in seconds (default: none)
    /// - `CACHE_SWEEP_INTERVAL` - Sweep frequency in seconds (default: no sweep)
    /// - `CACHE_COMPRESS_THRESHOLD` - Auto-compression size in bytes (default: off)
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        Self {
            max_size: positive_var("CACHE_MAX_SIZE"),
            default_ttl: positive_var("CACHE_DEFAULT_TTL"),
            sweep_interval: positive_var("CACHE_SWEEP_INTERVAL"),
            compress_threshold: positive_var("CACHE_COMPRESS_THRESHOLD"),
        }
    }
}

fn positive_var<T>(name: &str) -> Option<T>
where
    T: FromStr + Default + PartialEq,
{
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .filter(|v: &T| *v != T::default())
}
