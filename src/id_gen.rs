//! Durable ID sequence shared by nodes and relationships
//!
//! The counter is mirrored to a one-line text file after every allocation.
//! An allocation is only handed out once that write has succeeded.

use crate::error::{StorageError, StorageResult};
use crate::graph::EntityId;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Name of the sequence file inside a graph's meta directory
pub const ID_FILE_NAME: &str = "id.store";

/// Monotonic ID allocator backed by a file
#[derive(Debug)]
pub struct IdGenerator {
    last: Mutex<u64>,
    path: PathBuf,
}

impl IdGenerator {
    /// Load the counter from `path`, starting at zero when the file is
    /// missing or unreadable
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let last = match fs::read_to_string(&path) {
            Ok(text) => match text.trim().parse::<u64>() {
                Ok(value) => value,
                Err(e) => {
                    warn!("Unreadable ID file {}: {}; starting at 0", path.display(), e);
                    0
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No ID file at {}; starting at 0", path.display());
                0
            }
            Err(e) => {
                warn!("Failed to read ID file {}: {}; starting at 0", path.display(), e);
                0
            }
        };

        debug!("ID generator seeded with {}", last);

        IdGenerator {
            last: Mutex::new(last),
            path,
        }
    }

    /// Last ID handed out, or zero
    pub fn current(&self) -> u64 {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Allocate one ID
    pub fn next_id(&self) -> StorageResult<EntityId> {
        let mut ids = self.next_ids(1)?;
        ids.pop()
            .ok_or_else(|| StorageError::Io(std::io::Error::other("empty ID allocation")))
    }

    /// Allocate `count` contiguous IDs in ascending order
    pub fn next_ids(&self, count: usize) -> StorageResult<Vec<EntityId>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let first = *last + 1;
        let end = *last + count as u64;

        persist(&self.path, end)?;
        *last = end;

        Ok((first..=end).map(EntityId::from).collect())
    }
}

/// Write the counter through a temporary file so a crash never leaves a
/// truncated value behind
fn persist(path: &Path, value: u64) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, format!("{}\n", value))?;
    fs::rename(&tmp, path)?;
    Ok(())
}
