//! Record payload encoding.
//!
//! Records travel to and from the store as JSON: the flattened domain
//! fields plus the integer `owner` stamp.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::record::Record;

/// Encode a record as a JSON payload.
pub fn encode<D: Serialize>(record: &Record<D>) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(record)
}

/// Decode a JSON payload into a record.
pub fn decode<D: DeserializeOwned>(payload: &[u8]) -> Result<Record<D>, serde_json::Error> {
    serde_json::from_slice(payload)
}
