//! CBOR serialization for action arguments and state snapshots.
//!
//! - Use CBOR via `ciborium` (NOT JSON or bincode)
//! - Deterministic encoding: equal values yield equal bytes, so equal
//!   actions yield equal payload hashes
//! - Submitted arguments must be canonical: they are hashed as received,
//!   so two byte strings for one action would split its endorsements
//! - Schema evolution through `#[serde(default)]` (snapshots only)

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Serialization errors.
#[derive(Debug, Error)]
pub enum SerializationError {
    /// CBOR encoding failed.
    #[error("CBOR encoding failed: {0}")]
    Encode(String),

    /// CBOR decoding failed.
    #[error("CBOR decoding failed: {0}")]
    Decode(String),

    /// Bytes decode, but are not the encoding of the decoded value.
    #[error("non-canonical encoding ({actual} bytes, canonical form is {canonical} bytes)")]
    NonCanonical { actual: usize, canonical: usize },
}

/// Serialize to CBOR bytes.
pub fn to_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>, SerializationError> {
    let mut bytes = Vec::new();
    ciborium::into_writer(value, &mut bytes)
        .map_err(|e| SerializationError::Encode(format!("{:?}", e)))?;
    Ok(bytes)
}

/// Deserialize from CBOR bytes.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, SerializationError> {
    ciborium::from_reader(bytes).map_err(|e| SerializationError::Decode(format!("{:?}", e)))
}

/// Deserialize from CBOR bytes that must be exactly `to_cbor` of the result.
///
/// Rejects alternative spellings that decode to the same value: unknown map
/// fields, identifiers written with a `0x` prefix or upper-case hex, and
/// non-minimal integer widths.
pub fn from_canonical_cbor<T>(bytes: &[u8]) -> Result<T, SerializationError>
where
    T: Serialize + DeserializeOwned,
{
    let value: T = from_cbor(bytes)?;
    let canonical = to_cbor(&value)?;
    if canonical != bytes {
        return Err(SerializationError::NonCanonical {
            actual: bytes.len(),
            canonical: canonical.len(),
        });
    }
    Ok(value)
}
