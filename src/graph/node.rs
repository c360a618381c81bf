//! Node implementation for property graph
//!
//! A node has an optional ID (absent until first saved), a type tag, and an
//! open property map.

use super::property::{PropertyHolder, PropertyMap, PropertyValue};
use super::types::EntityId;
use serde::{Deserialize, Serialize};

/// A node in the property graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier, assigned by the manager on first save
    pub id: Option<EntityId>,

    /// Type tag, e.g. `person`
    pub node_type: Option<String>,

    /// Properties associated with this node
    pub properties: PropertyMap,
}

impl Node {
    /// Create a new, unsaved node of the given type
    pub fn new(node_type: impl Into<String>) -> Self {
        Node {
            id: None,
            node_type: Some(node_type.into()),
            properties: PropertyMap::new(),
        }
    }

    /// Create a node with a known ID
    pub fn with_id(id: impl Into<EntityId>, node_type: impl Into<String>) -> Self {
        Node {
            id: Some(id.into()),
            node_type: Some(node_type.into()),
            properties: PropertyMap::new(),
        }
    }

    /// Create a node with type and properties
    pub fn new_with_properties(node_type: impl Into<String>, properties: PropertyMap) -> Self {
        Node {
            id: None,
            node_type: Some(node_type.into()),
            properties,
        }
    }

    /// Reference carrying only an ID and an optional type
    pub fn light(id: impl Into<EntityId>, node_type: Option<String>) -> Self {
        Node {
            id: Some(id.into()),
            node_type,
            properties: PropertyMap::new(),
        }
    }

    /// Builder-style property setter
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> Option<&EntityId> {
        self.id.as_ref()
    }

    pub fn node_type(&self) -> Option<&str> {
        self.node_type.as_deref()
    }

    /// Numeric view of the ID
    pub fn long_id(&self) -> Option<u64> {
        self.id.as_ref().and_then(EntityId::as_u64)
    }

    /// True once the node has been assigned an ID
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Get number of properties
    pub fn property_count(&self) -> usize {
        self.properties.len()
    }
}

impl PropertyHolder for Node {
    fn properties(&self) -> &PropertyMap {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut PropertyMap {
        &mut self.properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_node() {
        let node = Node::new("person");
        assert_eq!(node.node_type(), Some("person"));
        assert!(node.id().is_none());
        assert!(!node.is_persisted());
        assert_eq!(node.property_count(), 0);
    }

    #[test]
    fn test_node_properties() {
        let mut node = Node::new("person").with_property("name", "Alice");
        node.set_property("age", 30i64);

        assert_eq!(node.get_string("name"), Some("Alice".to_string()));
        assert_eq!(node.get_long("age"), Some(30));
        assert!(node.has_property("age"));

        node.remove_property("age");
        assert!(!node.has_property("age"));
        assert_eq!(node.property_count(), 1);
    }

    #[test]
    fn test_light_node() {
        let node = Node::light("17", None);
        assert_eq!(node.long_id(), Some(17));
        assert!(node.node_type().is_none());
        assert!(node.is_persisted());
    }
}
