//! Conversion between domain types and wire representations.
//!
//! Both wire bindings go through this module: the gRPC binding uses the raw
//! byte and unix-second helpers, the JSON-RPC binding uses the base64 serde
//! impls of [`Hash`] and [`Tx`]. Timestamps always travel as whole seconds,
//! so sub-second precision is dropped on every binding.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ExecutorError, ExecutorResult};
use crate::types::{Hash, Tx};

// ============================================================================
// Timestamps
// ============================================================================

/// Convert a UTC timestamp to whole unix seconds.
pub fn to_unix_seconds(time: DateTime<Utc>) -> i64 {
    time.timestamp()
}

/// Convert whole unix seconds to a UTC timestamp.
pub fn from_unix_seconds(seconds: i64) -> ExecutorResult<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, 0).ok_or(ExecutorError::InvalidTimestamp(seconds))
}

/// Drop the sub-second part of a timestamp, as a wire round trip does.
pub fn truncate_to_seconds(time: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(time.timestamp(), 0).unwrap_or(time)
}

// ============================================================================
// Raw bytes
// ============================================================================

pub fn hash_from_raw(bytes: Vec<u8>) -> Hash {
    Hash::new(bytes)
}

pub fn hash_to_raw(hash: &Hash) -> Vec<u8> {
    hash.as_bytes().to_vec()
}

pub fn txs_from_raw(txs: Vec<Vec<u8>>) -> Vec<Tx> {
    txs.into_iter().map(Tx::new).collect()
}

pub fn txs_to_raw(txs: &[Tx]) -> Vec<Vec<u8>> {
    txs.iter().map(|tx| tx.as_bytes().to_vec()).collect()
}

// ============================================================================
// Base64
// ============================================================================

/// Encode bytes as standard (padded) base64.
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode standard (padded) base64.
pub fn decode_base64(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(encoded)
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&encode_base64(self.as_bytes()))
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        decode_base64(&encoded)
            .map(Hash::new)
            .map_err(|e| D::Error::custom(format!("invalid base64 hash: {e}")))
    }
}

impl Serialize for Tx {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&encode_base64(self.as_bytes()))
    }
}

impl<'de> Deserialize<'de> for Tx {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        decode_base64(&encoded)
            .map(Tx::new)
            .map_err(|e| D::Error::custom(format!("invalid base64 transaction: {e}")))
    }
}
