//! Mapping between graph entities and index documents
//!
//! Encoding rules:
//! - strings become analyzed text fields
//! - integers become long points, floats double points, datetimes date points
//! - booleans become `true` / `false` terms
//! - lists repeat the field once per element
//! - the `storedvalue` property is stored but never indexed
//!
//! Entity ID, type and relationship endpoints live in reserved keyword
//! fields and are lifted out of the property map on decode. IDs and endpoint
//! IDs are matched exactly; types are matched case-insensitively. A property value
//! stored more than once decodes to a list in field order, so list order is
//! only as reliable as the index's field order.

use crate::error::{GraphError, GraphResult};
use crate::graph::{EntityId, Node, PropertyMap, PropertyValue, Relationship, STORED_VALUE_KEY};
use crate::index::{Analyzer, Document, FieldValue};
use std::collections::HashMap;
use tracing::debug;

pub const ID_KEY: &str = "id";
pub const TYPE_KEY: &str = "type";
pub const NODE1_KEY: &str = "node1";
pub const NODE2_KEY: &str = "node2";
pub const NODE1_TYPE_KEY: &str = "node1type";
pub const NODE2_TYPE_KEY: &str = "node2type";

/// Fields owned by the codec rather than by entity properties
pub const RESERVED_FIELDS: [&str; 6] = [
    ID_KEY,
    TYPE_KEY,
    NODE1_KEY,
    NODE2_KEY,
    NODE1_TYPE_KEY,
    NODE2_TYPE_KEY,
];

/// Reserved fields holding IDs
pub const ID_FIELDS: [&str; 3] = [ID_KEY, NODE1_KEY, NODE2_KEY];

pub fn is_reserved(name: &str) -> bool {
    RESERVED_FIELDS.contains(&name)
}

/// Analyzer that keeps reserved fields whole and ID fields verbatim
pub fn entity_analyzer() -> Analyzer {
    Analyzer::with_keyword_fields([TYPE_KEY, NODE1_TYPE_KEY, NODE2_TYPE_KEY])
        .with_exact_fields(ID_FIELDS)
}

/// Encode a node that already has its ID
pub fn encode_node(node: &Node) -> GraphResult<Document> {
    let id = node
        .id()
        .ok_or_else(|| GraphError::validation("node has no ID"))?;
    let node_type = node
        .node_type()
        .ok_or_else(|| GraphError::validation(format!("node {} has no type", id)))?;

    let mut doc = Document::new();
    doc.add(ID_KEY, FieldValue::Keyword(id.to_string()));
    doc.add(TYPE_KEY, FieldValue::Keyword(node_type.to_string()));
    encode_properties(&mut doc, &node.properties);
    Ok(doc)
}

/// Encode a relationship that already has its ID and both endpoint IDs
pub fn encode_relationship(rel: &Relationship) -> GraphResult<Document> {
    let id = rel
        .id()
        .ok_or_else(|| GraphError::validation("relationship has no ID"))?;
    let rel_type = rel
        .rel_type()
        .ok_or_else(|| GraphError::validation(format!("relationship {} has no type", id)))?;
    let node1 = rel
        .node1_id()
        .ok_or_else(|| GraphError::validation(format!("relationship {} has no node1 ID", id)))?;
    let node2 = rel
        .node2_id()
        .ok_or_else(|| GraphError::validation(format!("relationship {} has no node2 ID", id)))?;

    let mut doc = Document::new();
    doc.add(ID_KEY, FieldValue::Keyword(id.to_string()));
    doc.add(TYPE_KEY, FieldValue::Keyword(rel_type.to_string()));
    doc.add(NODE1_KEY, FieldValue::Keyword(node1.to_string()));
    if let Some(t) = rel.node1_type() {
        doc.add(NODE1_TYPE_KEY, FieldValue::Keyword(t.to_string()));
    }
    doc.add(NODE2_KEY, FieldValue::Keyword(node2.to_string()));
    if let Some(t) = rel.node2_type() {
        doc.add(NODE2_TYPE_KEY, FieldValue::Keyword(t.to_string()));
    }
    encode_properties(&mut doc, &rel.properties);
    Ok(doc)
}

fn encode_properties(doc: &mut Document, properties: &PropertyMap) {
    for (name, value) in properties {
        if is_reserved(name) {
            debug!("Skipping property {} which shadows a reserved field", name);
            continue;
        }
        if name == STORED_VALUE_KEY {
            if let Some(text) = value.to_plain_string() {
                doc.add(name.as_str(), FieldValue::Stored(text));
            }
            continue;
        }
        encode_value(doc, name, value);
    }
}

fn encode_value(doc: &mut Document, name: &str, value: &PropertyValue) {
    match value {
        PropertyValue::String(s) => doc.add(name, FieldValue::Text(s.clone())),
        PropertyValue::Integer(i) => doc.add(name, FieldValue::Long(*i)),
        PropertyValue::Float(f) => doc.add(name, FieldValue::Double(*f)),
        PropertyValue::Boolean(b) => doc.add(name, FieldValue::Boolean(*b)),
        PropertyValue::DateTime(ms) => doc.add(name, FieldValue::Date(*ms)),
        PropertyValue::Array(values) => {
            for v in values {
                encode_value(doc, name, v);
            }
        }
        PropertyValue::Null => {}
    }
}

fn decode_value(value: &FieldValue) -> PropertyValue {
    match value {
        FieldValue::Text(s) | FieldValue::Keyword(s) | FieldValue::Stored(s) => {
            PropertyValue::String(s.clone())
        }
        FieldValue::Long(i) => PropertyValue::Integer(*i),
        FieldValue::Double(f) => PropertyValue::Float(*f),
        FieldValue::Date(ms) => PropertyValue::DateTime(*ms),
        FieldValue::Boolean(b) => PropertyValue::Boolean(*b),
    }
}

/// Non-reserved fields of a document as a property map
fn decode_properties(doc: &Document) -> PropertyMap {
    let mut collected: HashMap<&str, Vec<PropertyValue>> = HashMap::new();
    for field in doc.fields() {
        if is_reserved(&field.name) {
            continue;
        }
        collected
            .entry(field.name.as_str())
            .or_default()
            .push(decode_value(&field.value));
    }

    collected
        .into_iter()
        .map(|(name, mut values)| {
            let value = if values.len() == 1 {
                values.remove(0)
            } else {
                PropertyValue::Array(values)
            };
            (name.to_string(), value)
        })
        .collect()
}

pub fn decode_node(doc: &Document) -> Node {
    Node {
        id: doc.get_str(ID_KEY).map(EntityId::from),
        node_type: doc.get_str(TYPE_KEY).map(str::to_string),
        properties: decode_properties(doc),
    }
}

/// Decode a relationship with light endpoints
pub fn decode_relationship(doc: &Document) -> Relationship {
    let endpoint = |id_key: &str, type_key: &str| {
        doc.get_str(id_key)
            .map(|id| Node::light(id, doc.get_str(type_key).map(str::to_string)))
    };

    Relationship {
        id: doc.get_str(ID_KEY).map(EntityId::from),
        rel_type: doc.get_str(TYPE_KEY).map(str::to_string),
        node1: endpoint(NODE1_KEY, NODE1_TYPE_KEY),
        node2: endpoint(NODE2_KEY, NODE2_TYPE_KEY),
        properties: decode_properties(doc),
    }
}
