//! Document index layer
//!
//! Nodes and relationships are each persisted in their own document index.
//! Writes are staged and only become visible to searches after `commit`.

pub mod analyzer;
pub mod document;
pub mod query;
pub mod rocks;

pub use analyzer::Analyzer;
pub use document::{Document, Field, FieldValue, IndexEntry};
pub use query::IndexQuery;
pub use rocks::{IndexOptions, RocksIndex};

use crate::error::StorageResult;
use std::collections::BTreeSet;

/// Durable store of documents with term and range search
pub trait DocumentIndex: Send + Sync {
    /// Stage a document for the next commit
    fn add_document(&self, doc: Document) -> StorageResult<()>;

    /// Stage deletion of every document matching `query`, including ones
    /// added earlier in the same commit
    fn delete_documents(&self, query: &IndexQuery) -> StorageResult<()>;

    /// Apply all staged changes atomically and make them visible
    fn commit(&self) -> StorageResult<()>;

    /// Committed documents matching `query`, in insertion order, at most `max_hits`
    fn search(&self, query: &IndexQuery, max_hits: usize) -> StorageResult<Vec<Document>>;

    /// Number of committed documents matching `query`
    fn count(&self, query: &IndexQuery) -> StorageResult<usize>;

    /// Distinct committed terms of a field
    fn list_terms(&self, field: &str) -> StorageResult<BTreeSet<String>>;

    /// Committed document by internal ID, if it is still live
    fn fetch_document(&self, doc_id: u64) -> StorageResult<Option<Document>>;

    /// Upper bound of internal document IDs handed out so far
    fn max_document_count(&self) -> StorageResult<u64>;

    /// Analyzer used to build terms
    fn analyzer(&self) -> &Analyzer;

    /// Hit cap used when the caller does not supply one
    fn default_max_hits(&self) -> usize;

    /// Whether mutations are refused
    fn is_read_only(&self) -> bool;
}
