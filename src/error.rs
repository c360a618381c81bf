//! Error types
//!
//! `StorageError` comes out of the document index layer. `GraphError` is what
//! the manager hands to callers; storage failures are wrapped with a short
//! description of the operation that hit them.

use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// RocksDB error
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// JSON side file error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Column family error
    #[error("Column family error: {0}")]
    ColumnFamily(String),

    /// Write attempted against a read-only index
    #[error("Index is read-only: {0}")]
    ReadOnly(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Errors returned by the graph manager
#[derive(Error, Debug)]
pub enum GraphError {
    /// Underlying index or side-file failure
    #[error("Storage error while {context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: StorageError,
    },

    /// Entity or criterion is missing something it needs
    #[error("Validation error: {0}")]
    Validation(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type GraphResult<T> = Result<T, GraphError>;

impl GraphError {
    pub fn storage(context: impl Into<String>, source: StorageError) -> Self {
        GraphError::Storage {
            context: context.into(),
            source,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        GraphError::Validation(message.into())
    }

    /// True when the failure came from a read-only graph
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            GraphError::Storage {
                source: StorageError::ReadOnly(_),
                ..
            }
        )
    }
}

impl From<StorageError> for GraphError {
    fn from(source: StorageError) -> Self {
        GraphError::storage("accessing the index", source)
    }
}

/// Attach context to storage results
pub(crate) trait StorageContext<T> {
    fn context(self, context: impl FnOnce() -> String) -> GraphResult<T>;
}

impl<T> StorageContext<T> for StorageResult<T> {
    fn context(self, context: impl FnOnce() -> String) -> GraphResult<T> {
        self.map_err(|source| GraphError::storage(context(), source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let err = GraphError::storage("saving node 7", StorageError::ReadOnly("nodes".into()));
        assert_eq!(
            err.to_string(),
            "Storage error while saving node 7: Index is read-only: nodes"
        );
        assert!(err.is_read_only());
    }

    #[test]
    fn test_context_helper() {
        let result: StorageResult<()> = Err(StorageError::ColumnFamily("docs".into()));
        let err = result.context(|| "counting".to_string()).unwrap_err();
        assert!(matches!(err, GraphError::Storage { ref context, .. } if context == "counting"));
        assert!(!err.is_read_only());
    }
}
