//! Codec Module
//!
//! Turns values into bytes and back. Encoding is tagged JSON via serde_json,
//! compression is gzip via flate2.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::cache::CacheValue;
use crate::error::Result;

/// Encodes a value into its tagged byte form.
pub fn encode(value: &CacheValue) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Decodes bytes produced by [`encode`].
pub fn decode(bytes: &[u8]) -> Result<CacheValue> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Gzip-compresses a byte payload.
pub fn compress(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(bytes.len() / 2), Compression::default());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}

/// Reverses [`compress`].
pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}
