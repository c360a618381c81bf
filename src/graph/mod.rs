//! Property graph data model
//!
//! Nodes and relationships are typed entities with an open property map.
//! Neither knows how it is stored; see [`crate::codec`] for the mapping
//! onto index documents.

pub mod node;
pub mod property;
pub mod relationship;
pub mod types;

// Re-export main types
pub use node::Node;
pub use property::{PropertyHolder, PropertyMap, PropertyValue, LABEL_KEY, STORED_VALUE_KEY};
pub use relationship::Relationship;
pub use types::EntityId;
