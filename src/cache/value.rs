//! Cache Value Module
//!
//! Tagged representation of everything the cache can hold. Each variant keeps
//! its type identity through the codec, so decimals stay decimals and
//! timestamps stay timestamps after a compressed round trip.

use std::collections::BTreeMap;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

// == Cache Value ==
/// A value stored in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum CacheValue {
    Null,
    Bool(bool),
    Int(i64),
    /// Non-finite floats are encoded as text so they survive compression
    Float(#[serde(with = "float_text")] f64),
    Str(String),
    /// Arbitrary-precision decimal, encoded as its exact decimal text
    Decimal(#[serde(with = "decimal_text")] BigDecimal),
    Timestamp(DateTime<Utc>),
    List(Vec<CacheValue>),
    Map(BTreeMap<String, CacheValue>),
}

impl CacheValue {
    // == Offset ==
    /// Returns this value shifted by `delta`, keeping the numeric variant.
    ///
    /// `key` is only used to label the error.
    pub(crate) fn offset(&self, key: &str, delta: i64) -> Result<CacheValue> {
        match self {
            CacheValue::Int(n) => n
                .checked_add(delta)
                .map(CacheValue::Int)
                .ok_or_else(|| CacheError::Overflow(key.to_string())),
            CacheValue::Float(f) => Ok(CacheValue::Float(f + delta as f64)),
            CacheValue::Decimal(d) => Ok(CacheValue::Decimal(d.clone() + BigDecimal::from(delta))),
            _ => Err(CacheError::NotNumeric(key.to_string())),
        }
    }

    /// Returns the integer if this is an `Int`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CacheValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the string slice if this is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CacheValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

// == Conversions ==
impl From<bool> for CacheValue {
    fn from(value: bool) -> Self {
        CacheValue::Bool(value)
    }
}

impl From<i32> for CacheValue {
    fn from(value: i32) -> Self {
        CacheValue::Int(i64::from(value))
    }
}

impl From<i64> for CacheValue {
    fn from(value: i64) -> Self {
        CacheValue::Int(value)
    }
}

impl From<f64> for CacheValue {
    fn from(value: f64) -> Self {
        CacheValue::Float(value)
    }
}

impl From<&str> for CacheValue {
    fn from(value: &str) -> Self {
        CacheValue::Str(value.to_string())
    }
}

impl From<String> for CacheValue {
    fn from(value: String) -> Self {
        CacheValue::Str(value)
    }
}

impl From<BigDecimal> for CacheValue {
    fn from(value: BigDecimal) -> Self {
        CacheValue::Decimal(value)
    }
}

impl From<DateTime<Utc>> for CacheValue {
    fn from(value: DateTime<Utc>) -> Self {
        CacheValue::Timestamp(value)
    }
}

impl<T: Into<CacheValue>> From<Vec<T>> for CacheValue {
    fn from(values: Vec<T>) -> Self {
        CacheValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<CacheValue>> From<BTreeMap<String, T>> for CacheValue {
    fn from(map: BTreeMap<String, T>) -> Self {
        CacheValue::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<T: Into<CacheValue>> From<Option<T>> for CacheValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CacheValue::Null, Into::into)
    }
}

/// JSON numbers that fit `i64` become `Int`, larger unsigned ones become
/// `Decimal` so no digits are lost, everything else becomes `Float`.
impl From<serde_json::Value> for CacheValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => CacheValue::Null,
            Value::Bool(b) => CacheValue::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    CacheValue::Int(i)
                } else if let Some(u) = n.as_u64() {
                    CacheValue::Decimal(BigDecimal::from(u))
                } else {
                    CacheValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => CacheValue::Str(s),
            Value::Array(items) => CacheValue::List(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => {
                CacheValue::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

// == Decimal Text Encoding ==
/// Serializes decimals as exact text instead of a lossy float.
mod decimal_text {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigDecimal, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigDecimal, D::Error> {
        let text = String::deserialize(deserializer)?;
        BigDecimal::from_str(&text).map_err(de::Error::custom)
    }
}

// == Float Encoding ==
/// JSON has no literal for infinities or NaN; those are written as strings.
mod float_text {
    use std::fmt;

    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};

    const INFINITY: &str = "inf";
    const NEG_INFINITY: &str = "-inf";
    const NAN: &str = "NaN";

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_str(NAN)
        } else if value.is_sign_positive() {
            serializer.serialize_str(INFINITY)
        } else {
            serializer.serialize_str(NEG_INFINITY)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        deserializer.deserialize_any(FloatVisitor)
    }

    struct FloatVisitor;

    impl<'de> Visitor<'de> for FloatVisitor {
        type Value = f64;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a number, \"inf\", \"-inf\" or \"NaN\"")
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<f64, E> {
            Ok(value)
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<f64, E> {
            Ok(value as f64)
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<f64, E> {
            Ok(value as f64)
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<f64, E> {
            match value {
                INFINITY => Ok(f64::INFINITY),
                NEG_INFINITY => Ok(f64::NEG_INFINITY),
                NAN => Ok(f64::NAN),
                other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
            }
        }
    }
}
