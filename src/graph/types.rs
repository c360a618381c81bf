//! Core type definitions for the graph data model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier shared by nodes and relationships
///
/// IDs are strings on the wire and in the index. Those produced by the
/// ID generator are decimal integers, so `as_u64` succeeds for them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        EntityId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric view of the ID, if it parses as one
    pub fn as_u64(&self) -> Option<u64> {
        self.0.trim().parse().ok()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        EntityId(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        EntityId(s)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        EntityId(s.to_string())
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id() {
        let id = EntityId::from(42u64);
        assert_eq!(id.as_str(), "42");
        assert_eq!(id.as_u64(), Some(42));
        assert_eq!(format!("{}", id), "42");

        let named: EntityId = "alice".into();
        assert_eq!(named.as_u64(), None);
    }
}
