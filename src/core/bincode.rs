/*!
 * Binary Serialization with bincode
 * Encoding of admin requests and replies exchanged with the call launcher
 */

use serde::{de::DeserializeOwned, Serialize};

/// Result type for bincode operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Binary serialization errors
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

/// Serialize to binary bytes using bincode
#[inline]
pub fn to_vec<T: Serialize>(value: &T) -> CodecResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| CodecError::Serialization(e.to_string()))
}

/// Deserialize from binary bytes using bincode
///
/// Matches the output of `to_vec`.
#[inline]
pub fn from_slice<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    bincode::deserialize(bytes).map_err(|e| CodecError::Deserialization(e.to_string()))
}
