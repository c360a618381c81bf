//! Relationship implementation for property graph
//!
//! A relationship connects `node1` to `node2`. Direction, when it matters,
//! runs from node1 to node2. Endpoints are usually light nodes (ID and
//! optional type); hydration replaces them with fully loaded nodes.

use super::node::Node;
use super::property::{PropertyHolder, PropertyMap, PropertyValue};
use super::types::EntityId;
use serde::{Deserialize, Serialize};

/// A relationship between two nodes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Unique identifier, assigned by the manager on first save
    pub id: Option<EntityId>,

    /// Type of relationship (e.g., "knows", "works_at")
    pub rel_type: Option<String>,

    /// First endpoint
    pub node1: Option<Node>,

    /// Second endpoint
    pub node2: Option<Node>,

    /// Properties associated with this relationship
    pub properties: PropertyMap,
}

impl Relationship {
    /// Create a new relationship between two nodes
    pub fn new(node1: Node, node2: Node, rel_type: impl Into<String>) -> Self {
        Relationship {
            id: None,
            rel_type: Some(rel_type.into()),
            node1: Some(node1),
            node2: Some(node2),
            properties: PropertyMap::new(),
        }
    }

    /// Relationship whose endpoints are light nodes built from bare IDs
    pub fn light(
        node1_id: impl Into<EntityId>,
        node2_id: impl Into<EntityId>,
        rel_type: impl Into<String>,
    ) -> Self {
        Self::new(
            Node::light(node1_id, None),
            Node::light(node2_id, None),
            rel_type,
        )
    }

    /// Builder-style property setter
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> Option<&EntityId> {
        self.id.as_ref()
    }

    pub fn rel_type(&self) -> Option<&str> {
        self.rel_type.as_deref()
    }

    pub fn node1(&self) -> Option<&Node> {
        self.node1.as_ref()
    }

    pub fn node2(&self) -> Option<&Node> {
        self.node2.as_ref()
    }

    pub fn node1_id(&self) -> Option<&EntityId> {
        self.node1.as_ref().and_then(Node::id)
    }

    pub fn node2_id(&self) -> Option<&EntityId> {
        self.node2.as_ref().and_then(Node::id)
    }

    pub fn node1_type(&self) -> Option<&str> {
        self.node1.as_ref().and_then(Node::node_type)
    }

    pub fn node2_type(&self) -> Option<&str> {
        self.node2.as_ref().and_then(Node::node_type)
    }

    pub fn set_node1(&mut self, node: Node) {
        self.node1 = Some(node);
    }

    pub fn set_node2(&mut self, node: Node) {
        self.node2 = Some(node);
    }

    /// Numeric view of the ID
    pub fn long_id(&self) -> Option<u64> {
        self.id.as_ref().and_then(EntityId::as_u64)
    }

    /// Check if this relationship touches a node on either side
    pub fn touches(&self, id: &EntityId) -> bool {
        self.node1_id() == Some(id) || self.node2_id() == Some(id)
    }

    /// Both endpoints carry an ID, so the relationship may be persisted
    pub fn has_endpoints(&self) -> bool {
        self.node1_id().is_some() && self.node2_id().is_some()
    }

    /// Get number of properties
    pub fn property_count(&self) -> usize {
        self.properties.len()
    }
}

impl PropertyHolder for Relationship {
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
    fn test_light_relationship() {
        let rel = Relationship::light("1", "2", "knows");
        assert_eq!(rel.rel_type(), Some("knows"));
        assert_eq!(rel.node1_id(), Some(&EntityId::from("1")));
        assert_eq!(rel.node2_id(), Some(&EntityId::from("2")));
        assert!(rel.node1_type().is_none());
        assert!(rel.has_endpoints());
        assert!(rel.touches(&EntityId::from("2")));
        assert!(!rel.touches(&EntityId::from("3")));
    }

    #[test]
    fn test_missing_endpoint() {
        let mut rel = Relationship::light("1", "2", "knows");
        rel.node2 = Some(Node::new("person"));
        assert!(!rel.has_endpoints());
    }

    #[test]
    fn test_relationship_properties() {
        let alice = Node::with_id(1u64, "person");
        let acme = Node::with_id(2u64, "company");
        let mut rel = Relationship::new(alice, acme, "works_at").with_property("since", 2020i64);
        rel.set_label("employment");

        assert_eq!(rel.node2_type(), Some("company"));
        assert_eq!(rel.get_long("since"), Some(2020));
        assert_eq!(rel.label(), Some("employment".to_string()));
        assert_eq!(rel.property_count(), 2);
    }
}
