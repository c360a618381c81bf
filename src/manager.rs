//! Graph manager: nodes and relationships over two document indexes
//!
//! Every mutating call commits before it returns, so a successful call is
//! always visible to the next search. Saving an entity that already has an
//! ID deletes its document and inserts the new one; the index has no update.
//!
//! Node and relationship indexes commit independently. Deleting a node
//! removes its relationships in a second commit, so a reader (or a crash)
//! between the two commits can see a relationship whose endpoint is gone.
//! [`GraphManager::repair_dangling_relationships`] cleans those up.

use crate::codec::{
    self, decode_node, decode_relationship, encode_node, encode_relationship, ID_KEY, NODE1_KEY,
    NODE2_KEY, TYPE_KEY,
};
use crate::compiler::{compile, render};
use crate::config::{GraphConfig, ResolvedGraph};
use crate::criterion::{effective_max_hits, Criterion, GraphQuery};
use crate::error::{GraphError, GraphResult, StorageContext, StorageError};
use crate::graph::{EntityId, Node, PropertyValue, Relationship};
use crate::id_gen::{IdGenerator, ID_FILE_NAME};
use crate::index::{DocumentIndex, IndexOptions, IndexQuery, RocksIndex};
use crate::schema::{sample_doc_ids, GraphSchema, SchemaStore, SCHEMA_FILE_NAME};
use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Hook that enriches entities before they are persisted
pub trait DataDecorator: Send + Sync {
    fn decorates_nodes(&self) -> bool {
        true
    }

    fn decorates_relationships(&self) -> bool {
        true
    }

    fn decorate_node(&self, _node: &mut Node) {}

    fn decorate_relationship(&self, _rel: &mut Relationship) {}
}

/// One named graph
pub struct GraphManager {
    name: String,
    nodes: Box<dyn DocumentIndex>,
    rels: Box<dyn DocumentIndex>,
    ids: IdGenerator,
    schema: SchemaStore,
    decorator: RwLock<Option<Arc<dyn DataDecorator>>>,
}

impl GraphManager {
    /// Open the graph called `name` as laid out by `config`
    pub fn open(config: &GraphConfig, name: &str) -> GraphResult<Self> {
        let resolved = config.resolve(name);
        Self::open_resolved(&resolved)
    }

    pub fn open_resolved(graph: &ResolvedGraph) -> GraphResult<Self> {
        info!("Opening graph '{}'", graph.name);

        let options = IndexOptions {
            read_only: graph.read_only,
            default_max_hits: graph.default_max_hits,
        };
        let nodes = RocksIndex::open(&graph.node_dir, codec::entity_analyzer(), options.clone())
            .context(|| format!("opening node index {}", graph.node_dir.display()))?;
        let rels = RocksIndex::open(&graph.rel_dir, codec::entity_analyzer(), options)
            .context(|| format!("opening relationship index {}", graph.rel_dir.display()))?;

        Ok(Self::with_indexes(
            graph.name.clone(),
            Box::new(nodes),
            Box::new(rels),
            &graph.meta_dir,
        ))
    }

    /// Assemble a manager over arbitrary index implementations. The meta
    /// directory holds the ID sequence and schema files.
    pub fn with_indexes(
        name: impl Into<String>,
        nodes: Box<dyn DocumentIndex>,
        rels: Box<dyn DocumentIndex>,
        meta_dir: &Path,
    ) -> Self {
        let ids = IdGenerator::open(meta_dir.join(ID_FILE_NAME));
        let schema = SchemaStore::open(meta_dir.join(SCHEMA_FILE_NAME));
        GraphManager {
            name: name.into(),
            nodes,
            rels,
            ids,
            schema,
            decorator: RwLock::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_read_only(&self) -> bool {
        self.nodes.is_read_only() || self.rels.is_read_only()
    }

    /// Last ID handed out by this graph's sequence
    pub fn last_allocated_id(&self) -> u64 {
        self.ids.current()
    }

    fn ensure_writable(&self, action: &str) -> GraphResult<()> {
        if self.is_read_only() {
            return Err(GraphError::storage(
                action,
                StorageError::ReadOnly(self.name.clone()),
            ));
        }
        Ok(())
    }

    fn keyword_query(index: &dyn DocumentIndex, field: &str, value: &str) -> IndexQuery {
        IndexQuery::term(field, index.analyzer().keyword_term(field, value))
    }

    fn allocate_ids(&self, count: usize) -> GraphResult<Vec<EntityId>> {
        self.ids
            .next_ids(count)
            .context(|| format!("allocating {} IDs", count))
    }

    // ---- decoration ----

    pub fn set_data_decorator(&self, decorator: Arc<dyn DataDecorator>) {
        *self.decorator.write().unwrap_or_else(PoisonError::into_inner) = Some(decorator);
    }

    pub fn data_decorator(&self) -> Option<Arc<dyn DataDecorator>> {
        self.decorator
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear_data_decorator(&self) {
        *self.decorator.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn decorate_nodes<'a>(&self, nodes: impl IntoIterator<Item = &'a mut Node>) {
        if let Some(decorator) = self.data_decorator().filter(|d| d.decorates_nodes()) {
            for node in nodes {
                decorator.decorate_node(node);
            }
        }
    }

    fn decorate_relationships<'a>(&self, rels: impl IntoIterator<Item = &'a mut Relationship>) {
        if let Some(decorator) = self.data_decorator().filter(|d| d.decorates_relationships()) {
            for rel in rels {
                decorator.decorate_relationship(rel);
            }
        }
    }

    // ---- schema ----

    fn observe_node_sample<N: Borrow<Node>>(&self, nodes: &[N]) -> GraphResult<()> {
        self.schema
            .update(|schema| schema.observe_node_sample(nodes))
            .context(|| "writing schema".to_string())
    }

    fn observe_relationship_sample<R: Borrow<Relationship>>(&self, rels: &[R]) -> GraphResult<()> {
        self.schema
            .update(|schema| schema.observe_relationship_sample(rels))
            .context(|| "writing schema".to_string())
    }

    /// Copy of the tracked schema
    pub fn schema(&self) -> GraphSchema {
        self.schema.snapshot()
    }

    /// Rebuild a schema from a random sample of both indexes.
    ///
    /// `fraction` of each index is sampled, but at least 100 documents when
    /// the index has that many. The result is returned, not installed.
    pub fn generate_schema_from_sample(&self, fraction: f64) -> GraphResult<GraphSchema> {
        let mut rng = rand::thread_rng();
        let mut schema = GraphSchema::new();

        let max = self
            .nodes
            .max_document_count()
            .context(|| "sizing node index".to_string())?;
        for doc_id in sample_doc_ids(max, fraction, &mut rng) {
            match self.nodes.fetch_document(doc_id) {
                Ok(Some(doc)) => schema.observe_node(&decode_node(&doc)),
                Ok(None) => {}
                Err(e) => warn!("Error sampling node document {}: {}", doc_id, e),
            }
        }

        let max = self
            .rels
            .max_document_count()
            .context(|| "sizing relationship index".to_string())?;
        for doc_id in sample_doc_ids(max, fraction, &mut rng) {
            match self.rels.fetch_document(doc_id) {
                Ok(Some(doc)) => schema.observe_relationship(&decode_relationship(&doc)),
                Ok(None) => {}
                Err(e) => warn!("Error sampling relationship document {}: {}", doc_id, e),
            }
        }

        Ok(schema)
    }

    /// Install `schema` in memory and on disk
    pub fn replace_schema(&self, schema: GraphSchema) -> GraphResult<()> {
        self.ensure_writable("replacing schema")?;
        self.schema
            .replace(schema)
            .context(|| "replacing schema".to_string())
    }

    pub fn property_names_for_node_type(&self, node_type: &str) -> Vec<String> {
        self.schema
            .snapshot()
            .node_property_names(Some(node_type))
            .into_iter()
            .collect()
    }

    pub fn property_names_for_relationship_type(&self, rel_type: &str) -> Vec<String> {
        self.schema
            .snapshot()
            .relationship_property_names(Some(rel_type))
            .into_iter()
            .collect()
    }

    /// Property names for every node type present in the index
    pub fn property_names_by_node_type(&self) -> GraphResult<BTreeMap<String, Vec<String>>> {
        let schema = self.schema.snapshot();
        Ok(self
            .node_types()?
            .into_iter()
            .map(|t| {
                let names = schema.node_property_names(Some(&t)).into_iter().collect();
                (t, names)
            })
            .collect())
    }

    /// Property names for every relationship type present in the index
    pub fn property_names_by_relationship_type(
        &self,
    ) -> GraphResult<BTreeMap<String, Vec<String>>> {
        let schema = self.schema.snapshot();
        Ok(self
            .relationship_types()?
            .into_iter()
            .map(|t| {
                let names = schema
                    .relationship_property_names(Some(&t))
                    .into_iter()
                    .collect();
                (t, names)
            })
            .collect())
    }

    // ---- nodes ----

    /// Insert a new node or replace an existing one.
    ///
    /// A node without an ID is assigned the next ID from the sequence.
    pub fn save_node(&self, node: &mut Node) -> GraphResult<()> {
        self.ensure_writable("saving node")?;
        if node.node_type.is_none() {
            return Err(GraphError::validation("node has no type"));
        }

        let existing = node.id.is_some();
        if !existing {
            let mut ids = self.allocate_ids(1)?;
            node.id = ids.pop();
        }
        self.decorate_nodes(std::iter::once(&mut *node));

        let doc = encode_node(node)?;
        let id = node.id.clone().ok_or_else(|| GraphError::validation("node has no id"))?;
        if existing {
            self.nodes
                .delete_documents(&Self::keyword_query(&*self.nodes, ID_KEY, id.as_str()))
                .context(|| format!("replacing node {}", id))?;
        }
        self.nodes
            .add_document(doc)
            .context(|| format!("saving node {}", id))?;
        self.nodes
            .commit()
            .context(|| format!("committing node {}", id))?;

        debug!("Saved node {}", id);
        self.observe_node_sample(std::slice::from_ref(&*node))
    }

    /// Insert nodes that are all new, assigning IDs in input order
    pub fn ingest_nodes(&self, nodes: &mut [Node]) -> GraphResult<()> {
        let mut refs: Vec<&mut Node> = nodes.iter_mut().collect();
        self.insert_new_nodes(&mut refs)
    }

    fn insert_new_nodes(&self, nodes: &mut [&mut Node]) -> GraphResult<()> {
        if nodes.is_empty() {
            return Ok(());
        }
        self.ensure_writable("ingesting nodes")?;
        if nodes.iter().any(|n| n.node_type.is_none()) {
            return Err(GraphError::validation("node has no type"));
        }

        let ids = self.allocate_ids(nodes.len())?;
        for (node, id) in nodes.iter_mut().zip(ids) {
            node.id = Some(id);
        }
        self.decorate_nodes(nodes.iter_mut().map(|n| &mut **n));

        let docs = nodes
            .iter()
            .map(|n| encode_node(n))
            .collect::<GraphResult<Vec<_>>>()?;
        for doc in docs {
            self.nodes
                .add_document(doc)
                .context(|| "ingesting nodes".to_string())?;
        }
        self.nodes
            .commit()
            .context(|| format!("committing {} ingested nodes", nodes.len()))?;

        info!("Ingested {} nodes into '{}'", nodes.len(), self.name);
        self.observe_node_sample(&*nodes)
    }

    /// Save a mix of new and existing nodes.
    ///
    /// New nodes go through the bulk insert path; existing ones are replaced
    /// in one commit. Their relationships are left alone.
    pub fn save_nodes(&self, nodes: &mut [Node]) -> GraphResult<()> {
        let (mut fresh, mut existing): (Vec<&mut Node>, Vec<&mut Node>) =
            nodes.iter_mut().partition(|n| n.id.is_none());

        self.insert_new_nodes(&mut fresh)?;

        if existing.is_empty() {
            return Ok(());
        }
        self.ensure_writable("saving nodes")?;
        self.decorate_nodes(existing.iter_mut().map(|n| &mut **n));

        let docs = existing
            .iter()
            .map(|n| encode_node(n))
            .collect::<GraphResult<Vec<_>>>()?;
        for (node, doc) in existing.iter().zip(docs) {
            if let Some(id) = node.id() {
                self.nodes
                    .delete_documents(&Self::keyword_query(&*self.nodes, ID_KEY, id.as_str()))
                    .context(|| format!("replacing node {}", id))?;
            }
            self.nodes
                .add_document(doc)
                .context(|| "saving nodes".to_string())?;
        }
        self.nodes
            .commit()
            .context(|| format!("committing {} saved nodes", existing.len()))?;

        self.observe_node_sample(existing.as_slice())
    }

    /// Fetch a node by ID
    pub fn get_node(&self, id: &EntityId) -> GraphResult<Option<Node>> {
        let query = Self::keyword_query(&*self.nodes, ID_KEY, id.as_str());
        let docs = self
            .nodes
            .search(&query, 1)
            .context(|| format!("getting node {}", id))?;
        Ok(docs.first().map(decode_node))
    }

    /// Delete a node and every relationship touching it
    pub fn delete_node(&self, id: &EntityId) -> GraphResult<()> {
        self.delete_nodes_by_id(std::slice::from_ref(id))
    }

    /// Delete nodes carrying an ID; nodes without one are skipped
    pub fn delete_nodes(&self, nodes: &[Node]) -> GraphResult<()> {
        let ids: Vec<EntityId> = nodes.iter().filter_map(|n| n.id.clone()).collect();
        self.delete_nodes_by_id(&ids)
    }

    /// Delete nodes by ID along with their relationships.
    ///
    /// The node index commits first, then the relationship index.
    pub fn delete_nodes_by_id(&self, ids: &[EntityId]) -> GraphResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.ensure_writable("deleting nodes")?;

        for id in ids {
            self.nodes
                .delete_documents(&Self::keyword_query(&*self.nodes, ID_KEY, id.as_str()))
                .context(|| format!("deleting node {}", id))?;
            for field in [NODE1_KEY, NODE2_KEY] {
                self.rels
                    .delete_documents(&Self::keyword_query(&*self.rels, field, id.as_str()))
                    .context(|| format!("deleting relationships of node {}", id))?;
            }
        }
        self.nodes
            .commit()
            .context(|| "committing node deletes".to_string())?;
        self.rels
            .commit()
            .context(|| "committing relationship deletes".to_string())?;

        debug!("Deleted {} nodes from '{}'", ids.len(), self.name);
        Ok(())
    }

    // ---- relationships ----

    /// Insert a new relationship or replace an existing one.
    ///
    /// Both endpoints must carry an ID; nothing is allocated otherwise.
    pub fn save_relationship(&self, rel: &mut Relationship) -> GraphResult<()> {
        self.ensure_writable("saving relationship")?;
        validate_relationship(rel)?;

        let existing = rel.id.is_some();
        if !existing {
            let mut ids = self.allocate_ids(1)?;
            rel.id = ids.pop();
        }
        self.decorate_relationships(std::iter::once(&mut *rel));

        let doc = encode_relationship(rel)?;
        let id = rel
            .id
            .clone()
            .ok_or_else(|| GraphError::validation("relationship has no id"))?;
        if existing {
            self.rels
                .delete_documents(&Self::keyword_query(&*self.rels, ID_KEY, id.as_str()))
                .context(|| format!("replacing relationship {}", id))?;
        }
        self.rels
            .add_document(doc)
            .context(|| format!("saving relationship {}", id))?;
        self.rels
            .commit()
            .context(|| format!("committing relationship {}", id))?;

        debug!("Saved relationship {}", id);
        self.observe_relationship_sample(std::slice::from_ref(&*rel))
    }

    /// Insert relationships that are all new, assigning IDs in input order
    pub fn ingest_relationships(&self, rels: &mut [Relationship]) -> GraphResult<()> {
        let mut refs: Vec<&mut Relationship> = rels.iter_mut().collect();
        self.insert_new_relationships(&mut refs)
    }

    fn insert_new_relationships(&self, rels: &mut [&mut Relationship]) -> GraphResult<()> {
        if rels.is_empty() {
            return Ok(());
        }
        self.ensure_writable("ingesting relationships")?;
        for rel in rels.iter() {
            validate_relationship(rel)?;
        }

        let ids = self.allocate_ids(rels.len())?;
        for (rel, id) in rels.iter_mut().zip(ids) {
            rel.id = Some(id);
        }
        self.decorate_relationships(rels.iter_mut().map(|r| &mut **r));

        let docs = rels
            .iter()
            .map(|r| encode_relationship(r))
            .collect::<GraphResult<Vec<_>>>()?;
        for doc in docs {
            self.rels
                .add_document(doc)
                .context(|| "ingesting relationships".to_string())?;
        }
        self.rels
            .commit()
            .context(|| format!("committing {} ingested relationships", rels.len()))?;

        info!("Ingested {} relationships into '{}'", rels.len(), self.name);
        self.observe_relationship_sample(&*rels)
    }

    /// Save a mix of new and existing relationships
    pub fn save_relationships(&self, rels: &mut [Relationship]) -> GraphResult<()> {
        let (mut fresh, mut existing): (Vec<&mut Relationship>, Vec<&mut Relationship>) =
            rels.iter_mut().partition(|r| r.id.is_none());

        self.insert_new_relationships(&mut fresh)?;

        if existing.is_empty() {
            return Ok(());
        }
        self.ensure_writable("saving relationships")?;
        for rel in existing.iter() {
            validate_relationship(rel)?;
        }
        self.decorate_relationships(existing.iter_mut().map(|r| &mut **r));

        let docs = existing
            .iter()
            .map(|r| encode_relationship(r))
            .collect::<GraphResult<Vec<_>>>()?;
        for (rel, doc) in existing.iter().zip(docs) {
            if let Some(id) = rel.id() {
                self.rels
                    .delete_documents(&Self::keyword_query(&*self.rels, ID_KEY, id.as_str()))
                    .context(|| format!("replacing relationship {}", id))?;
            }
            self.rels
                .add_document(doc)
                .context(|| "saving relationships".to_string())?;
        }
        self.rels
            .commit()
            .context(|| format!("committing {} saved relationships", existing.len()))?;

        self.observe_relationship_sample(existing.as_slice())
    }

    /// Fetch a relationship by ID, optionally with full endpoint nodes
    pub fn get_relationship(
        &self,
        id: &EntityId,
        fetch_nodes: bool,
    ) -> GraphResult<Option<Relationship>> {
        let query = Self::keyword_query(&*self.rels, ID_KEY, id.as_str());
        let docs = self
            .rels
            .search(&query, 1)
            .context(|| format!("getting relationship {}", id))?;
        let mut rels: Vec<Relationship> = docs.iter().map(decode_relationship).collect();
        if fetch_nodes {
            self.hydrate(&mut rels)?;
        }
        Ok(rels.pop())
    }

    pub fn delete_relationship(&self, id: &EntityId) -> GraphResult<()> {
        self.delete_relationships_by_id(std::slice::from_ref(id))
    }

    /// Delete relationships carrying an ID; ones without are skipped
    pub fn delete_relationships(&self, rels: &[Relationship]) -> GraphResult<()> {
        let ids: Vec<EntityId> = rels.iter().filter_map(|r| r.id.clone()).collect();
        self.delete_relationships_by_id(&ids)
    }

    pub fn delete_relationships_by_id(&self, ids: &[EntityId]) -> GraphResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.ensure_writable("deleting relationships")?;
        for id in ids {
            self.rels
                .delete_documents(&Self::keyword_query(&*self.rels, ID_KEY, id.as_str()))
                .context(|| format!("deleting relationship {}", id))?;
        }
        self.rels
            .commit()
            .context(|| "committing relationship deletes".to_string())?;
        debug!("Deleted {} relationships from '{}'", ids.len(), self.name);
        Ok(())
    }

    /// Replace light endpoints with the stored nodes.
    ///
    /// Endpoints whose node no longer exists stay light.
    pub fn hydrate(&self, rels: &mut [Relationship]) -> GraphResult<()> {
        let mut wanted: Vec<&EntityId> = Vec::new();
        let mut seen = HashSet::new();
        for rel in rels.iter() {
            for id in [rel.node1_id(), rel.node2_id()].into_iter().flatten() {
                if seen.insert(id) {
                    wanted.push(id);
                }
            }
        }
        if wanted.is_empty() {
            return Ok(());
        }

        let query = IndexQuery::should(
            wanted
                .iter()
                .map(|id| Self::keyword_query(&*self.nodes, ID_KEY, id.as_str()))
                .collect(),
        );
        debug!("Hydrating {} endpoint nodes", wanted.len());
        let docs = self
            .nodes
            .search(&query, wanted.len())
            .context(|| "hydrating relationship endpoints".to_string())?;

        let found: HashMap<EntityId, Node> = docs
            .iter()
            .map(decode_node)
            .filter_map(|n| n.id.clone().map(|id| (id, n)))
            .collect();

        for rel in rels.iter_mut() {
            if let Some(node) = rel.node1_id().and_then(|id| found.get(id)) {
                rel.node1 = Some(node.clone());
            }
            if let Some(node) = rel.node2_id().and_then(|id| found.get(id)) {
                rel.node2 = Some(node.clone());
            }
        }
        Ok(())
    }

    // ---- search ----

    fn type_criterion(entity_type: &str) -> Criterion {
        Criterion::equals(TYPE_KEY, entity_type)
    }

    /// Criterion for the type / key-value lookups, or `None` when there is
    /// nothing to search for
    fn lookup_criterion(
        entity_type: Option<&str>,
        key: Option<&str>,
        value: Option<PropertyValue>,
    ) -> GraphResult<Option<Criterion>> {
        let pair = match (key, value) {
            (Some(_), None) | (Some(_), Some(PropertyValue::Null)) => {
                warn!("Unable to search for null values");
                return Ok(None);
            }
            (Some(k), Some(v)) => Some(Criterion::equals(k, v)),
            (None, _) => None,
        };
        Ok(match (entity_type.map(Self::type_criterion), pair) {
            (Some(t), Some(p)) => Some(Criterion::and(vec![p, t])),
            (Some(t), None) => Some(t),
            (None, Some(p)) => Some(p),
            (None, None) => {
                return Err(GraphError::validation("a type or a key is required"));
            }
        })
    }

    /// Nodes whose `key` equals `value`
    pub fn find_nodes(&self, key: &str, value: impl Into<PropertyValue>) -> GraphResult<Vec<Node>> {
        self.find_nodes_by_type(None, Some(key), Some(value.into()), 0)
    }

    /// Nodes of a type, optionally also matching `key = value`.
    ///
    /// `max_results` of zero or less means the index default.
    pub fn find_nodes_by_type(
        &self,
        node_type: Option<&str>,
        key: Option<&str>,
        value: Option<PropertyValue>,
        max_results: i32,
    ) -> GraphResult<Vec<Node>> {
        match Self::lookup_criterion(node_type, key, value)? {
            Some(criterion) => self.search_nodes(&criterion, max_results),
            None => Ok(Vec::new()),
        }
    }

    /// Nodes matching a criterion query
    pub fn find_nodes_query(&self, query: &GraphQuery) -> GraphResult<Vec<Node>> {
        self.search_nodes(&query.criterion, query.max_results)
    }

    fn search_nodes(&self, criterion: &Criterion, max_results: i32) -> GraphResult<Vec<Node>> {
        info!("Node query: {}", render(criterion));
        let query = compile(criterion, self.nodes.analyzer())?;
        let max_hits = effective_max_hits(max_results, self.nodes.default_max_hits());
        let docs = self
            .nodes
            .search(&query, max_hits)
            .context(|| format!("searching nodes for {}", query))?;
        Ok(docs.iter().map(decode_node).collect())
    }

    /// Relationships whose `key` equals `value`
    pub fn find_relationships(
        &self,
        key: &str,
        value: impl Into<PropertyValue>,
        fetch_nodes: bool,
    ) -> GraphResult<Vec<Relationship>> {
        self.find_relationships_by_type(None, Some(key), Some(value.into()), fetch_nodes, 0)
    }

    /// Relationships of a type, optionally also matching `key = value`
    pub fn find_relationships_by_type(
        &self,
        rel_type: Option<&str>,
        key: Option<&str>,
        value: Option<PropertyValue>,
        fetch_nodes: bool,
        max_results: i32,
    ) -> GraphResult<Vec<Relationship>> {
        match Self::lookup_criterion(rel_type, key, value)? {
            Some(criterion) => self.search_relationships(&criterion, max_results, fetch_nodes),
            None => Ok(Vec::new()),
        }
    }

    /// Relationships matching a criterion query
    pub fn find_relationships_query(&self, query: &GraphQuery) -> GraphResult<Vec<Relationship>> {
        self.search_relationships(&query.criterion, query.max_results, query.fetch_nodes)
    }

    fn search_relationships(
        &self,
        criterion: &Criterion,
        max_results: i32,
        fetch_nodes: bool,
    ) -> GraphResult<Vec<Relationship>> {
        info!("Relationship query: {}", render(criterion));
        let query = compile(criterion, self.rels.analyzer())?;
        let max_hits = effective_max_hits(max_results, self.rels.default_max_hits());
        self.relationships_for(&query, max_hits, fetch_nodes)
    }

    fn relationships_for(
        &self,
        query: &IndexQuery,
        max_hits: usize,
        fetch_nodes: bool,
    ) -> GraphResult<Vec<Relationship>> {
        let docs = self
            .rels
            .search(query, max_hits)
            .context(|| format!("searching relationships for {}", query))?;
        let mut rels: Vec<Relationship> = docs.iter().map(decode_relationship).collect();
        if fetch_nodes {
            self.hydrate(&mut rels)?;
        }
        Ok(rels)
    }

    /// Every relationship touching the node, with endpoints hydrated
    pub fn find_related_nodes(&self, id: &EntityId) -> GraphResult<Vec<Relationship>> {
        let query = IndexQuery::should(vec![
            Self::keyword_query(&*self.rels, NODE1_KEY, id.as_str()),
            Self::keyword_query(&*self.rels, NODE2_KEY, id.as_str()),
        ]);
        let rels = self.relationships_for(&query, self.rels.default_max_hits(), true)?;
        if rels.is_empty() {
            info!("No relationships found for node {}", id);
        } else {
            info!("Found {} relationships for node {}", rels.len(), id);
        }
        Ok(rels)
    }

    // ---- counts and types ----

    pub fn count_nodes(&self, node_type: &str) -> GraphResult<usize> {
        self.nodes
            .count(&Self::keyword_query(&*self.nodes, TYPE_KEY, node_type))
            .context(|| format!("counting nodes of type {}", node_type))
    }

    pub fn count_relationships(&self, rel_type: &str) -> GraphResult<usize> {
        self.rels
            .count(&Self::keyword_query(&*self.rels, TYPE_KEY, rel_type))
            .context(|| format!("counting relationships of type {}", rel_type))
    }

    /// Distinct node types, as stored in the index
    pub fn node_types(&self) -> GraphResult<Vec<String>> {
        Ok(self
            .nodes
            .list_terms(TYPE_KEY)
            .context(|| "listing node types".to_string())?
            .into_iter()
            .collect())
    }

    /// Distinct relationship types, as stored in the index
    pub fn relationship_types(&self) -> GraphResult<Vec<String>> {
        Ok(self
            .rels
            .list_terms(TYPE_KEY)
            .context(|| "listing relationship types".to_string())?
            .into_iter()
            .collect())
    }

    pub fn node_counts_by_type(&self) -> GraphResult<BTreeMap<String, usize>> {
        self.node_types()?
            .into_iter()
            .map(|t| self.count_nodes(&t).map(|count| (t, count)))
            .collect()
    }

    pub fn relationship_counts_by_type(&self) -> GraphResult<BTreeMap<String, usize>> {
        self.relationship_types()?
            .into_iter()
            .map(|t| self.count_relationships(&t).map(|count| (t, count)))
            .collect()
    }

    // ---- maintenance ----

    /// Delete relationships whose endpoint node no longer exists.
    ///
    /// Returns the number of relationships removed.
    pub fn repair_dangling_relationships(&self) -> GraphResult<usize> {
        self.ensure_writable("repairing relationships")?;

        let cap = self
            .rels
            .max_document_count()
            .context(|| "sizing relationship index".to_string())?;
        let rels = self.relationships_for(&IndexQuery::All, cap as usize, false)?;

        let mut exists: HashMap<EntityId, bool> = HashMap::new();
        let mut dangling = Vec::new();
        for rel in &rels {
            let mut ok = true;
            for id in [rel.node1_id(), rel.node2_id()].into_iter().flatten() {
                let present = match exists.get(id) {
                    Some(present) => *present,
                    None => {
                        let present = self
                            .nodes
                            .count(&Self::keyword_query(&*self.nodes, ID_KEY, id.as_str()))
                            .context(|| format!("checking node {}", id))?
                            > 0;
                        exists.insert(id.clone(), present);
                        present
                    }
                };
                ok &= present;
            }
            if !ok {
                if let Some(id) = rel.id() {
                    warn!("Relationship {} points at a missing node", id);
                    dangling.push(id.clone());
                }
            }
        }

        self.delete_relationships_by_id(&dangling)?;
        info!(
            "Repair removed {} dangling relationships from '{}'",
            dangling.len(),
            self.name
        );
        Ok(dangling.len())
    }
}

fn validate_relationship(rel: &Relationship) -> GraphResult<()> {
    if !rel.has_endpoints() {
        return Err(GraphError::validation(
            "relationship needs IDs on both endpoints",
        ));
    }
    if rel.rel_type.is_none() {
        return Err(GraphError::validation("relationship has no type"));
    }
    Ok(())
}
