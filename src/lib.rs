//! Docgraph
//!
//! A property graph persisted as two document indexes: one holding nodes,
//! one holding relationships. Entities are flattened into documents of typed
//! fields, searched by term or range, and rebuilt on the way out.
//!
//! # Layout
//!
//! - [`graph`]: nodes, relationships and property values
//! - [`index`]: the document index abstraction and its RocksDB implementation
//! - [`codec`]: entity <-> document conversion
//! - [`criterion`] and [`compiler`]: query predicates and their compilation
//! - [`schema`]: observed property names and types per entity type
//! - [`manager`]: the graph API; [`registry`] hands out one manager per name
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use docgraph::{Criterion, GraphConfig, GraphQuery, GraphRegistry, Node};
//!
//! let registry = GraphRegistry::new(GraphConfig::with_data_dir("/tmp/graphs"));
//! let graph = registry.get("").unwrap();
//!
//! let mut alice = Node::new("person").with_property("name", "Alice");
//! graph.save_node(&mut alice).unwrap();
//!
//! let query = GraphQuery::new(Criterion::and(vec![
//!     Criterion::equals("type", "person"),
//!     Criterion::equals("name", "alice"),
//! ]));
//! let found = graph.find_nodes_query(&query).unwrap();
//! assert_eq!(found.len(), 1);
//! ```

pub mod codec;
pub mod compiler;
pub mod config;
pub mod criterion;
pub mod error;
pub mod graph;
pub mod id_gen;
pub mod index;
pub mod manager;
pub mod registry;
pub mod schema;

pub use config::{GraphConfig, GraphSettings, ResolvedGraph, DEFAULT_GRAPH_NAME};
pub use criterion::{Combinator, Criterion, CriterionValue, GraphQuery, Operator};
pub use error::{GraphError, GraphResult, StorageError, StorageResult};
pub use graph::{EntityId, Node, PropertyHolder, PropertyMap, PropertyValue, Relationship};
pub use manager::{DataDecorator, GraphManager};
pub use registry::GraphRegistry;
pub use schema::{GraphSchema, SchemaType};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
