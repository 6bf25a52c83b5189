//! Storage abstraction layer for glaive.
//!
//! An index lives in a [`Storage`]: a flat namespace of named byte files
//! with existence checks, atomic rename and advisory named locks. Segment
//! files are written once under a fresh name and never modified; index
//! metadata is published by writing a temporary file and renaming it over
//! the old one.
//!
//! # Storage Types
//!
//! ## FileStorage
//! - One directory on disk, one OS file per index file
//! - Locks are `<name>.lock` files created exclusively
//!
//! ## MemoryStorage
//! - Files kept in a shared map, useful for tests and scratch indexes
//! - Can be seeded as a deep copy of another store
//!
//! ## CompoundStorage
//! - Read-only view over a segment packed into a single `.cfs` container
//!
//! # Example
//!
//! ```
//! use glaive::storage::memory::{MemoryStorage, MemoryStorageConfig};
//! use glaive::storage::Storage;
//! use std::io::Write;
//!
//! # fn main() -> glaive::error::Result<()> {
//! let storage = MemoryStorage::new(MemoryStorageConfig::default());
//! let mut output = storage.create_output("segments.tmp")?;
//! output.write_all(b"{}")?;
//! output.close()?;
//! storage.rename_file("segments.tmp", "segments")?;
//! assert!(storage.file_exists("segments"));
//! # Ok(())
//! # }
//! ```

use std::io::{Read, Seek, Write};
use std::sync::Arc;

use crate::error::{GlaiveError, Result};

pub mod compound;
pub mod file;
pub mod memory;
pub mod structured;

/// A trait for storage backends that hold an index's files.
pub trait Storage: Send + Sync + std::fmt::Debug {
    /// Open an existing file for reading.
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>>;

    /// Create (or truncate) a file for writing. The file becomes visible
    /// under `name` once the output is closed.
    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>>;

    /// Check if a file exists.
    fn file_exists(&self, name: &str) -> bool;

    /// Delete a file. Deleting a missing file is not an error.
    fn delete_file(&self, name: &str) -> Result<()>;

    /// List all files, sorted by name. Lock files are not included.
    fn list_files(&self) -> Result<Vec<String>>;

    /// Size of a file in bytes.
    fn file_len(&self, name: &str) -> Result<u64>;

    /// Atomically replace `new_name` with `old_name`.
    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()>;

    /// Create an empty file if it is missing, otherwise leave it alone.
    fn touch(&self, name: &str) -> Result<()>;

    /// Build a named advisory lock bound to this store.
    fn make_lock(&self, name: &str) -> Result<Box<dyn Lock>>;

    /// Remove every file (locks excepted).
    fn clear_all(&self) -> Result<()> {
        for name in self.list_files()? {
            self.delete_file(&name)?;
        }
        Ok(())
    }

    /// Number of files in the store.
    fn file_count(&self) -> Result<usize> {
        Ok(self.list_files()?.len())
    }

    /// Read a whole file into memory.
    fn read_all(&self, name: &str) -> Result<Vec<u8>> {
        let mut input = self.open_input(name)?;
        let mut bytes = Vec::with_capacity(input.size()? as usize);
        input.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    /// Flush any buffered state to durable storage.
    fn sync(&self) -> Result<()> {
        Ok(())
    }

    /// Close the storage; further operations fail.
    fn close(&self) -> Result<()>;
}

/// A trait for reading data from storage.
pub trait StorageInput: Read + Seek + Send + std::fmt::Debug {
    /// Get the size of the input stream.
    fn size(&self) -> Result<u64>;

    /// Close the input stream.
    fn close(&mut self) -> Result<()>;
}

/// A trait for writing data to storage.
pub trait StorageOutput: Write + Seek + Send + std::fmt::Debug {
    /// Flush and sync the output to storage.
    fn flush_and_sync(&mut self) -> Result<()>;

    /// Get the current position in the output stream.
    fn position(&self) -> Result<u64>;

    /// Close the output stream, publishing the file.
    fn close(&mut self) -> Result<()>;
}

impl StorageOutput for Box<dyn StorageOutput> {
    fn flush_and_sync(&mut self) -> Result<()> {
        self.as_mut().flush_and_sync()
    }

    fn position(&self) -> Result<u64> {
        self.as_ref().position()
    }

    fn close(&mut self) -> Result<()> {
        self.as_mut().close()
    }
}

impl StorageInput for Box<dyn StorageInput> {
    fn size(&self) -> Result<u64> {
        self.as_ref().size()
    }

    fn close(&mut self) -> Result<()> {
        self.as_mut().close()
    }
}

/// An exclusive, advisory, non-blocking named lock.
///
/// A lock object starts unheld. `obtain` returns `false` instead of waiting
/// when someone else holds the name. Dropping a held lock releases it.
pub trait Lock: Send + std::fmt::Debug {
    /// Name of the lock.
    fn name(&self) -> &str;

    /// Try to take the lock. Returns `true` on success.
    fn obtain(&mut self) -> Result<bool>;

    /// Release the lock if this object holds it.
    fn release(&mut self) -> Result<()>;

    /// Whether anyone currently holds this lock name.
    fn is_locked(&self) -> bool;
}

/// Name of the lock guarding index modification.
pub const WRITE_LOCK_NAME: &str = "write";

/// Configuration for storage backends.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// File-based storage configuration (includes path).
    File(file::FileStorageConfig),

    /// Memory-based storage configuration.
    Memory(memory::MemoryStorageConfig),
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Memory(memory::MemoryStorageConfig::default())
    }
}

/// A factory for creating storage instances from configuration.
pub struct StorageFactory;

impl StorageFactory {
    /// Create a new storage instance with the given configuration.
    pub fn create(config: StorageConfig) -> Result<Arc<dyn Storage>> {
        match config {
            StorageConfig::Memory(mem_config) => Ok(Arc::new(memory::MemoryStorage::new(mem_config))),
            StorageConfig::File(file_config) => {
                let path = file_config.path.clone();
                Ok(Arc::new(file::FileStorage::new(&path, file_config)?))
            }
        }
    }
}

/// Error types specific to storage operations.
#[derive(Debug, Clone)]
pub enum StorageError {
    /// File not found.
    FileNotFound(String),

    /// Storage is closed.
    StorageClosed,

    /// Invalid file name or operation.
    InvalidOperation(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::FileNotFound(name) => write!(f, "File not found: {name}"),
            StorageError::StorageClosed => write!(f, "Storage is closed"),
            StorageError::InvalidOperation(msg) => write!(f, "Invalid operation: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<StorageError> for GlaiveError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::FileNotFound(name) => GlaiveError::not_found(format!("file {name}")),
            other => GlaiveError::storage(other.to_string()),
        }
    }
}
