//! RocksDB-backed document index
//!
//! Layout, one column family each:
//! - `docs`: internal doc ID (big-endian u64) -> bincode document
//! - `terms`: `field \0 term \0 doc_id` postings
//! - `longs` / `doubles`: `field \0 sortable(value) doc_id` points
//! - `meta`: the next internal doc ID
//!
//! Adds and deletes are kept in an in-memory log until `commit`, which
//! resolves them in order against a snapshot and writes one atomic batch.
//! Searches always read a snapshot of committed state.

use super::analyzer::Analyzer;
use super::document::{Document, IndexEntry};
use super::query::{in_bounds, IndexQuery};
use super::DocumentIndex;
use crate::error::{StorageError, StorageResult};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, DB};
use rustc_hash::FxHashSet;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};

const CF_DOCS: &str = "docs";
const CF_TERMS: &str = "terms";
const CF_LONGS: &str = "longs";
const CF_DOUBLES: &str = "doubles";
const CF_META: &str = "meta";

const COLUMN_FAMILIES: [&str; 6] = ["default", CF_DOCS, CF_TERMS, CF_LONGS, CF_DOUBLES, CF_META];

const NEXT_DOC_KEY: &[u8] = b"next_doc_id";

const SIGN_BIT: u64 = 1 << 63;

/// Default cap on hits for a single search
pub const DEFAULT_MAX_HITS: usize = 100_000;

/// Options for opening an index
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Refuse every mutation
    pub read_only: bool,
    /// Hit cap used when the caller asks for "no limit"
    pub default_max_hits: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        IndexOptions {
            read_only: false,
            default_max_hits: DEFAULT_MAX_HITS,
        }
    }
}

/// Staged mutation
#[derive(Debug)]
enum PendingOp {
    Add(Document),
    Delete(IndexQuery),
}

/// Document index stored in RocksDB
pub struct RocksIndex {
    /// `None` for a read-only index whose directory does not exist yet
    db: Option<DB>,
    path: String,
    analyzer: Analyzer,
    options: IndexOptions,
    pending: Mutex<Vec<PendingOp>>,
}

impl RocksIndex {
    /// Open or create an index
    pub fn open(
        path: impl AsRef<Path>,
        analyzer: Analyzer,
        options: IndexOptions,
    ) -> StorageResult<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        info!("Opening document index at: {}", path_str);

        let opts = Self::db_options();

        let db = if options.read_only {
            if path.join("CURRENT").exists() {
                Some(DB::open_cf_for_read_only(&opts, path, COLUMN_FAMILIES, false)?)
            } else {
                warn!("No index at {}; serving it as empty", path_str);
                None
            }
        } else {
            std::fs::create_dir_all(path)?;
            Some(DB::open_cf_descriptors(&opts, path, Self::cf_descriptors())?)
        };

        info!(
            "Document index opened successfully (read_only={})",
            options.read_only
        );

        Ok(Self {
            db,
            path: path_str,
            analyzer,
            options,
            pending: Mutex::new(Vec::new()),
        })
    }

    fn db_options() -> Options {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        opts.set_write_buffer_size(64 * 1024 * 1024); // 64 MB
        opts.set_max_write_buffer_number(3);
        opts.set_min_write_buffer_number_to_merge(1);

        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts.set_wal_recovery_mode(rocksdb::DBRecoveryMode::PointInTime);
        opts
    }

    fn cf_descriptors() -> Vec<ColumnFamilyDescriptor> {
        COLUMN_FAMILIES
            .iter()
            .map(|name| {
                let mut opts = Options::default();
                opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
                ColumnFamilyDescriptor::new(*name, opts)
            })
            .collect()
    }

    /// Location on disk
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Number of staged operations not yet committed
    pub fn pending_count(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn cf(&self, name: &str) -> StorageResult<&ColumnFamily> {
        self.db
            .as_ref()
            .and_then(|db| db.cf_handle(name))
            .ok_or_else(|| StorageError::ColumnFamily(name.to_string()))
    }

    fn ensure_writable(&self) -> StorageResult<()> {
        if self.options.read_only {
            return Err(StorageError::ReadOnly(self.path.clone()));
        }
        Ok(())
    }

    fn next_doc_id(&self, snapshot: &rocksdb::Snapshot<'_>) -> StorageResult<u64> {
        let meta = self.cf(CF_META)?;
        Ok(snapshot
            .get_cf(meta, NEXT_DOC_KEY)?
            .and_then(|bytes| read_u64(&bytes))
            .unwrap_or(0))
    }

    fn load_document(
        &self,
        snapshot: &rocksdb::Snapshot<'_>,
        doc_id: u64,
    ) -> StorageResult<Option<Document>> {
        let docs = self.cf(CF_DOCS)?;
        match snapshot.get_cf(docs, doc_id.to_be_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Walk keys of `cf` starting at `start` while they share `prefix`.
    /// The visitor returns false to stop early.
    fn scan<F>(
        &self,
        snapshot: &rocksdb::Snapshot<'_>,
        cf: &str,
        prefix: &[u8],
        start: &[u8],
        mut visit: F,
    ) -> StorageResult<()>
    where
        F: FnMut(&[u8]) -> bool,
    {
        let handle = self.cf(cf)?;
        let iter = snapshot.iterator_cf(handle, IteratorMode::From(start, Direction::Forward));
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(prefix) || !visit(&key) {
                break;
            }
        }
        Ok(())
    }

    /// Resolve a query to the set of matching committed doc IDs
    fn evaluate(
        &self,
        snapshot: &rocksdb::Snapshot<'_>,
        query: &IndexQuery,
    ) -> StorageResult<FxHashSet<u64>> {
        let mut ids = FxHashSet::default();
        match query {
            IndexQuery::All => {
                self.scan(snapshot, CF_DOCS, &[], &[], |key| {
                    if let Some(id) = read_u64(key) {
                        ids.insert(id);
                    }
                    true
                })?;
            }
            IndexQuery::Term { field, term } => {
                let prefix = term_prefix(field, term);
                self.scan(snapshot, CF_TERMS, &prefix, &prefix, |key| {
                    if key.len() == prefix.len() + 8 {
                        if let Some(id) = read_u64(key) {
                            ids.insert(id);
                        }
                    }
                    true
                })?;
            }
            IndexQuery::LongRange {
                field,
                lower,
                upper,
            } => {
                let prefix = field_prefix(field);
                let start = match lower {
                    Bound::Included(v) | Bound::Excluded(v) => {
                        [prefix.as_slice(), &encode_i64(*v)].concat()
                    }
                    Bound::Unbounded => prefix.clone(),
                };
                self.scan(snapshot, CF_LONGS, &prefix, &start, |key| {
                    let Some(value) = point_value(key, prefix.len()).map(decode_i64) else {
                        return true;
                    };
                    if !in_bounds(&value, Bound::Unbounded, upper.as_ref()) {
                        return false;
                    }
                    if in_bounds(&value, lower.as_ref(), Bound::Unbounded) {
                        if let Some(id) = read_u64(key) {
                            ids.insert(id);
                        }
                    }
                    true
                })?;
            }
            IndexQuery::DoubleRange {
                field,
                lower,
                upper,
            } => {
                let prefix = field_prefix(field);
                let start = match lower {
                    Bound::Included(v) | Bound::Excluded(v) => {
                        [prefix.as_slice(), &encode_f64(*v)].concat()
                    }
                    Bound::Unbounded => prefix.clone(),
                };
                self.scan(snapshot, CF_DOUBLES, &prefix, &start, |key| {
                    let Some(value) = point_value(key, prefix.len()).map(decode_f64) else {
                        return true;
                    };
                    if !in_bounds(&value, Bound::Unbounded, upper.as_ref()) {
                        return false;
                    }
                    if in_bounds(&value, lower.as_ref(), Bound::Unbounded) {
                        if let Some(id) = read_u64(key) {
                            ids.insert(id);
                        }
                    }
                    true
                })?;
            }
            IndexQuery::TermRange {
                field,
                lower,
                upper,
            } => {
                let prefix = field_prefix(field);
                let lower = lower.as_ref().map(String::as_str);
                let upper = upper.as_ref().map(String::as_str);
                self.scan(snapshot, CF_TERMS, &prefix, &prefix, |key| {
                    if let Some(term) = posting_term(key, prefix.len()) {
                        if in_bounds(term, lower, upper) {
                            if let Some(id) = read_u64(key) {
                                ids.insert(id);
                            }
                        }
                    }
                    true
                })?;
            }
            IndexQuery::Boolean { must, should } => {
                if let Some((first, rest)) = must.split_first() {
                    ids = self.evaluate(snapshot, first)?;
                    for clause in rest {
                        if ids.is_empty() {
                            break;
                        }
                        let other = self.evaluate(snapshot, clause)?;
                        ids.retain(|id| other.contains(id));
                    }
                } else {
                    for clause in should {
                        ids.extend(self.evaluate(snapshot, clause)?);
                    }
                }
            }
        }
        Ok(ids)
    }

    fn put_postings(&self, batch: &mut WriteBatch, doc_id: u64, doc: &Document) -> StorageResult<()> {
        for entry in doc.entries(&self.analyzer) {
            let (cf, key) = entry_key(&entry, doc_id);
            batch.put_cf(self.cf(cf)?, key, b"");
        }
        Ok(())
    }

    fn delete_postings(
        &self,
        batch: &mut WriteBatch,
        doc_id: u64,
        doc: &Document,
    ) -> StorageResult<()> {
        for entry in doc.entries(&self.analyzer) {
            let (cf, key) = entry_key(&entry, doc_id);
            batch.delete_cf(self.cf(cf)?, key);
        }
        Ok(())
    }
}

impl DocumentIndex for RocksIndex {
    fn add_document(&self, doc: Document) -> StorageResult<()> {
        self.ensure_writable()?;
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(PendingOp::Add(doc));
        Ok(())
    }

    fn delete_documents(&self, query: &IndexQuery) -> StorageResult<()> {
        self.ensure_writable()?;
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(PendingOp::Delete(query.clone()));
        Ok(())
    }

    fn commit(&self) -> StorageResult<()> {
        self.ensure_writable()?;

        // Held for the whole commit so commits apply one at a time
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if pending.is_empty() {
            return Ok(());
        }
        let db = self
            .db
            .as_ref()
            .ok_or_else(|| StorageError::ReadOnly(self.path.clone()))?;
        let ops = std::mem::take(&mut *pending);

        let snapshot = db.snapshot();
        let mut next_id = self.next_doc_id(&snapshot)?;
        let mut batch = WriteBatch::default();
        let mut staged: BTreeMap<u64, Document> = BTreeMap::new();
        let mut removed: FxHashSet<u64> = FxHashSet::default();
        let docs_cf = self.cf(CF_DOCS)?;

        for op in ops {
            match op {
                PendingOp::Add(doc) => {
                    staged.insert(next_id, doc);
                    next_id += 1;
                }
                PendingOp::Delete(query) => {
                    for doc_id in self.evaluate(&snapshot, &query)? {
                        if !removed.insert(doc_id) {
                            continue;
                        }
                        if let Some(doc) = self.load_document(&snapshot, doc_id)? {
                            self.delete_postings(&mut batch, doc_id, &doc)?;
                        }
                        batch.delete_cf(docs_cf, doc_id.to_be_bytes());
                    }
                    staged.retain(|_, doc| !query.matches(&doc.entries(&self.analyzer)));
                }
            }
        }

        let added = staged.len();
        for (doc_id, doc) in &staged {
            batch.put_cf(docs_cf, doc_id.to_be_bytes(), bincode::serialize(doc)?);
            self.put_postings(&mut batch, *doc_id, doc)?;
        }
        batch.put_cf(self.cf(CF_META)?, NEXT_DOC_KEY, next_id.to_be_bytes());

        drop(snapshot);
        db.write(batch)?;

        debug!(
            "Committed {} adds and {} deletes to {}",
            added,
            removed.len(),
            self.path
        );
        Ok(())
    }

    fn search(&self, query: &IndexQuery, max_hits: usize) -> StorageResult<Vec<Document>> {
        let snapshot = match &self.db {
            Some(db) => db.snapshot(),
            None => return Ok(Vec::new()),
        };
        let mut ids: Vec<u64> = self.evaluate(&snapshot, query)?.into_iter().collect();
        ids.sort_unstable();
        ids.truncate(max_hits);

        let mut docs = Vec::with_capacity(ids.len());
        for doc_id in ids {
            if let Some(doc) = self.load_document(&snapshot, doc_id)? {
                docs.push(doc);
            }
        }
        debug!("Query {} returned {} documents", query, docs.len());
        Ok(docs)
    }

    fn count(&self, query: &IndexQuery) -> StorageResult<usize> {
        let snapshot = match &self.db {
            Some(db) => db.snapshot(),
            None => return Ok(0),
        };
        Ok(self.evaluate(&snapshot, query)?.len())
    }

    fn list_terms(&self, field: &str) -> StorageResult<BTreeSet<String>> {
        let snapshot = match &self.db {
            Some(db) => db.snapshot(),
            None => return Ok(BTreeSet::new()),
        };
        let prefix = field_prefix(field);
        let mut terms = BTreeSet::new();
        self.scan(&snapshot, CF_TERMS, &prefix, &prefix, |key| {
            if let Some(term) = posting_term(key, prefix.len()) {
                if !terms.contains(term) {
                    terms.insert(term.to_string());
                }
            }
            true
        })?;
        Ok(terms)
    }

    fn fetch_document(&self, doc_id: u64) -> StorageResult<Option<Document>> {
        let snapshot = match &self.db {
            Some(db) => db.snapshot(),
            None => return Ok(None),
        };
        self.load_document(&snapshot, doc_id)
    }

    fn max_document_count(&self) -> StorageResult<u64> {
        let snapshot = match &self.db {
            Some(db) => db.snapshot(),
            None => return Ok(0),
        };
        self.next_doc_id(&snapshot)
    }

    fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    fn default_max_hits(&self) -> usize {
        self.options.default_max_hits
    }

    fn is_read_only(&self) -> bool {
        self.options.read_only
    }
}

fn field_prefix(field: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(field.len() + 1);
    key.extend_from_slice(field.as_bytes());
    key.push(0);
    key
}

fn term_prefix(field: &str, term: &str) -> Vec<u8> {
    let mut key = field_prefix(field);
    key.extend_from_slice(term.as_bytes());
    key.push(0);
    key
}

/// Column family and key of the posting for one entry
fn entry_key(entry: &IndexEntry, doc_id: u64) -> (&'static str, Vec<u8>) {
    let (cf, mut key) = match entry {
        IndexEntry::Term { field, term } => (CF_TERMS, term_prefix(field, term)),
        IndexEntry::Long { field, value } => {
            let mut key = field_prefix(field);
            key.extend_from_slice(&encode_i64(*value));
            (CF_LONGS, key)
        }
        IndexEntry::Double { field, value } => {
            let mut key = field_prefix(field);
            key.extend_from_slice(&encode_f64(*value));
            (CF_DOUBLES, key)
        }
    };
    key.extend_from_slice(&doc_id.to_be_bytes());
    (cf, key)
}

/// Trailing big-endian u64 of a key
fn read_u64(bytes: &[u8]) -> Option<u64> {
    let tail = bytes.len().checked_sub(8).map(|start| &bytes[start..])?;
    tail.try_into().ok().map(u64::from_be_bytes)
}

/// The 8 value bytes of a point key
fn point_value(key: &[u8], prefix_len: usize) -> Option<[u8; 8]> {
    if key.len() != prefix_len + 16 {
        return None;
    }
    key[prefix_len..prefix_len + 8].try_into().ok()
}

/// The term of a posting key
fn posting_term(key: &[u8], prefix_len: usize) -> Option<&str> {
    let end = key.len().checked_sub(9)?;
    if end < prefix_len || key[end] != 0 {
        return None;
    }
    std::str::from_utf8(&key[prefix_len..end]).ok()
}

fn encode_i64(value: i64) -> [u8; 8] {
    ((value as u64) ^ SIGN_BIT).to_be_bytes()
}

fn decode_i64(bytes: [u8; 8]) -> i64 {
    (u64::from_be_bytes(bytes) ^ SIGN_BIT) as i64
}

fn encode_f64(value: f64) -> [u8; 8] {
    let bits = value.to_bits();
    let sortable = if bits & SIGN_BIT != 0 {
        !bits
    } else {
        bits | SIGN_BIT
    };
    sortable.to_be_bytes()
}

fn decode_f64(bytes: [u8; 8]) -> f64 {
    let sortable = u64::from_be_bytes(bytes);
    let bits = if sortable & SIGN_BIT != 0 {
        sortable & !SIGN_BIT
    } else {
        !sortable
    };
    f64::from_bits(bits)
}
