//! Record types and store key derivation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier for one connected session (e.g. a player's user id).
///
/// Owned by the external session registry; the engine only observes
/// presence and absence. Serializes as the bare integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SessionId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Which of a session's save locations a record occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SaveSlot(pub u32);

impl fmt::Display for SaveSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SaveSlot {
    fn from(slot: u32) -> Self {
        Self(slot)
    }
}

/// A session's persisted payload plus its ownership metadata.
///
/// `owner` is stamped when the record is created and never changes;
/// mutable access hands out the domain payload only. On disk the payload
/// fields sit flattened next to `owner` in one JSON object, so `D` must
/// serialize as an object and must not define its own `owner` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<D> {
    /// Session that created this record.
    owner: SessionId,

    /// Application fields, flattened alongside `owner` in the payload.
    #[serde(flatten)]
    data: D,
}

impl<D> Record<D> {
    /// Create a record owned by `owner`.
    pub fn new(owner: SessionId, data: D) -> Self {
        Self { owner, data }
    }

    /// The session this record belongs to.
    pub fn owner(&self) -> SessionId {
        self.owner
    }

    /// Read access to the domain payload.
    pub fn data(&self) -> &D {
        &self.data
    }

    /// Mutable access to the domain payload. The owner stamp stays fixed.
    pub(crate) fn data_mut(&mut self) -> &mut D {
        &mut self.data
    }
}

/// Store key for a session's save slot: `"{session}.{slot}"`.
pub fn store_key(session: SessionId, slot: SaveSlot) -> String {
    format!("{session}.{slot}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestData {
        coins: u32,
        level: u32,
    }

    #[test]
    fn test_store_key_format() {
        assert_eq!(store_key(SessionId(1), SaveSlot(0)), "1.0");
        assert_eq!(store_key(SessionId(12345), SaveSlot(3)), "12345.3");
    }

    #[test]
    fn test_record_round_trip_preserves_owner() {
        let record = Record::new(SessionId(42), TestData { coins: 100, level: 7 });

        let payload = serde_json::to_vec(&record).unwrap();
        let decoded: Record<TestData> = serde_json::from_slice(&payload).unwrap();

        assert_eq!(decoded, record);
        assert_eq!(decoded.owner(), SessionId(42));
        assert_eq!(decoded.data().coins, 100);
    }

    #[test]
    fn test_record_payload_is_flat() {
        let record = Record::new(SessionId(42), TestData { coins: 100, level: 7 });

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "owner": 42, "coins": 100, "level": 7 })
        );
    }

    #[test]
    fn test_payload_without_owner_rejected() {
        let result: Result<Record<TestData>, _> =
            serde_json::from_slice(br#"{"coins": 1, "level": 1}"#);
        assert!(result.is_err());
    }
}
