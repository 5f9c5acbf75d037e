//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of a drug record.
///
/// Opaque to callers. Generated as UUIDv7, so ids are time-ordered and do not
/// collide under rapid successive creation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DrugId(Uuid);

impl DrugId {
    /// Create a new identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DrugId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for DrugId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<Uuid> for DrugId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<DrugId> for Uuid {
    fn from(value: DrugId) -> Self {
        value.0
    }
}

impl FromStr for DrugId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid =
            Uuid::from_str(s).map_err(|e| DomainError::invalid_id(format!("DrugId: {e}")))?;
        Ok(Self(uuid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rapid_generation_does_not_collide() {
        let ids: std::collections::HashSet<DrugId> = (0..10_000).map(|_| DrugId::new()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn parse_round_trips_display() {
        let id = DrugId::new();
        let parsed: DrugId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = "1712345678901".parse::<DrugId>().unwrap_err();
        match err {
            DomainError::InvalidId(msg) => assert!(msg.starts_with("DrugId")),
            other => panic!("expected InvalidId, got {other:?}"),
        }
    }
}
