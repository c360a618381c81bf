//! Observed schema: property names and coarse value types per entity type
//!
//! The schema is advisory. It is never used to validate writes, and bulk
//! loads only feed it a sample of their input, so a rarely populated
//! property can go unseen until a single save or a rebuild picks it up.

use crate::error::StorageResult;
use crate::graph::{Node, PropertyMap, PropertyValue, Relationship};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

/// Name of the schema file inside a graph's meta directory
pub const SCHEMA_FILE_NAME: &str = "graphmeta.json";

/// Smallest sample drawn from an index when rebuilding, if it holds that many
pub const MIN_REBUILD_SAMPLES: u64 = 100;

/// Coarse type tag of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Long,
    Double,
    Integer,
    Float,
    Short,
    Date,
}

impl SchemaType {
    /// Tag for a value; lists take the tag of their first non-null element
    pub fn infer(value: &PropertyValue) -> Option<SchemaType> {
        match value {
            PropertyValue::String(_) | PropertyValue::Boolean(_) => Some(SchemaType::String),
            PropertyValue::Integer(_) => Some(SchemaType::Long),
            PropertyValue::Float(_) => Some(SchemaType::Double),
            PropertyValue::DateTime(_) => Some(SchemaType::Date),
            PropertyValue::Array(values) => values.iter().find_map(SchemaType::infer),
            PropertyValue::Null => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaType::String => "string",
            SchemaType::Long => "long",
            SchemaType::Double => "double",
            SchemaType::Integer => "integer",
            SchemaType::Float => "float",
            SchemaType::Short => "short",
            SchemaType::Date => "date",
        }
    }
}

/// Property name -> type tag
pub type TypeSchema = BTreeMap<String, SchemaType>;

/// Entity type -> its properties, for nodes and relationships
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSchema {
    #[serde(default)]
    pub nodes: BTreeMap<String, TypeSchema>,
    #[serde(default)]
    pub rels: BTreeMap<String, TypeSchema>,
}

impl GraphSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every property of a node. Untyped nodes are ignored.
    pub fn observe_node(&mut self, node: &Node) {
        if let Some(node_type) = node.node_type() {
            observe(&mut self.nodes, node_type, &node.properties);
        }
    }

    /// Record every property of a relationship. Untyped relationships are ignored.
    pub fn observe_relationship(&mut self, rel: &Relationship) {
        if let Some(rel_type) = rel.rel_type() {
            observe(&mut self.rels, rel_type, &rel.properties);
        }
    }

    /// Record the sampled subset of a node batch
    pub fn observe_node_sample<N: Borrow<Node>>(&mut self, nodes: &[N]) {
        for i in sample_indices(nodes.len(), &NODE_SAMPLING) {
            self.observe_node(nodes[i].borrow());
        }
    }

    /// Record the sampled subset of a relationship batch
    pub fn observe_relationship_sample<R: Borrow<Relationship>>(&mut self, rels: &[R]) {
        for i in sample_indices(rels.len(), &RELATIONSHIP_SAMPLING) {
            self.observe_relationship(rels[i].borrow());
        }
    }

    pub fn node_schema(&self, node_type: &str) -> Option<&TypeSchema> {
        self.nodes.get(node_type)
    }

    pub fn relationship_schema(&self, rel_type: &str) -> Option<&TypeSchema> {
        self.rels.get(rel_type)
    }

    /// Property names of one node type, or of every node type
    pub fn node_property_names(&self, node_type: Option<&str>) -> BTreeSet<String> {
        property_names(&self.nodes, node_type)
    }

    /// Property names of one relationship type, or of every relationship type
    pub fn relationship_property_names(&self, rel_type: Option<&str>) -> BTreeSet<String> {
        property_names(&self.rels, rel_type)
    }

    pub fn to_json(&self) -> StorageResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> StorageResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

fn observe(types: &mut BTreeMap<String, TypeSchema>, entity_type: &str, properties: &PropertyMap) {
    let schema = types.entry(entity_type.to_string()).or_default();
    for (name, value) in properties {
        // Later observations win
        if let Some(tag) = SchemaType::infer(value) {
            schema.insert(name.clone(), tag);
        }
    }
}

fn property_names(types: &BTreeMap<String, TypeSchema>, entity_type: Option<&str>) -> BTreeSet<String> {
    // Type names are matched without case, like the index's type terms
    let wanted = entity_type.map(str::to_lowercase);
    types
        .iter()
        .filter(|(t, _)| wanted.as_ref().map_or(true, |w| t.to_lowercase() == *w))
        .flat_map(|(_, schema)| schema.keys().cloned())
        .collect()
}

/// Which items of a bulk batch feed the schema
#[derive(Debug, Clone, Copy)]
pub struct SamplePolicy {
    /// Batches smaller than this are observed in full
    pub full_scan_below: usize,
    /// Also take the first and third quartile
    pub quartiles: bool,
}

pub const NODE_SAMPLING: SamplePolicy = SamplePolicy {
    full_scan_below: 10,
    quartiles: true,
};

pub const RELATIONSHIP_SAMPLING: SamplePolicy = SamplePolicy {
    full_scan_below: 5,
    quartiles: false,
};

/// Sorted, distinct indices to observe out of a batch of `len`
pub fn sample_indices(len: usize, policy: &SamplePolicy) -> Vec<usize> {
    if len == 0 {
        return Vec::new();
    }
    if len < policy.full_scan_below {
        return (0..len).collect();
    }
    let mut picks = vec![0, len - 1, len / 2];
    if policy.quartiles {
        picks.push(len / 4);
        picks.push(3 * len / 4);
    }
    picks.sort_unstable();
    picks.dedup();
    picks
}

/// Random internal doc IDs to inspect when rebuilding from an index holding
/// `max_doc` slots. Draws `fraction * max_doc` IDs, but at least
/// `min(MIN_REBUILD_SAMPLES, max_doc)`, with replacement. `fraction` is
/// clamped to `[0, 1]`.
pub fn sample_doc_ids<R: Rng>(max_doc: u64, fraction: f64, rng: &mut R) -> Vec<u64> {
    if max_doc == 0 {
        return Vec::new();
    }
    let requested = (max_doc as f64 * fraction.clamp(0.0, 1.0)) as u64;
    let count = requested.min(max_doc).max(MIN_REBUILD_SAMPLES.min(max_doc));
    (0..count).map(|_| rng.gen_range(0..max_doc)).collect()
}

/// Schema kept in memory and mirrored to a JSON side file
#[derive(Debug)]
pub struct SchemaStore {
    schema: Mutex<GraphSchema>,
    path: PathBuf,
}

impl SchemaStore {
    /// Load the schema at `path`; a missing or corrupt file yields an empty schema
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let schema = match fs::read_to_string(&path) {
            Ok(json) => GraphSchema::from_json(&json).unwrap_or_else(|e| {
                warn!("Ignoring unreadable schema file {}: {}", path.display(), e);
                GraphSchema::new()
            }),
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to read schema file {}: {}", path.display(), e);
                }
                GraphSchema::new()
            }
        };

        debug!(
            "Loaded schema with {} node types and {} relationship types",
            schema.nodes.len(),
            schema.rels.len()
        );

        SchemaStore {
            schema: Mutex::new(schema),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the current schema
    pub fn snapshot(&self) -> GraphSchema {
        self.schema
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Apply an update and rewrite the side file
    pub fn update<F>(&self, apply: F) -> StorageResult<()>
    where
        F: FnOnce(&mut GraphSchema),
    {
        let mut schema = self.schema.lock().unwrap_or_else(PoisonError::into_inner);
        apply(&mut schema);
        write_schema(&self.path, &schema)
    }

    /// Swap in a whole new schema, on disk first
    pub fn replace(&self, replacement: GraphSchema) -> StorageResult<()> {
        let mut schema = self.schema.lock().unwrap_or_else(PoisonError::into_inner);
        write_schema(&self.path, &replacement)?;
        *schema = replacement;
        Ok(())
    }
}

fn write_schema(path: &Path, schema: &GraphSchema) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, schema.to_json()?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
