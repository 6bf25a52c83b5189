//! In-memory ("ram") storage implementation.

use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::error::Result;
use crate::storage::{Lock, Storage, StorageError, StorageInput, StorageOutput};

type FileMap = Arc<RwLock<HashMap<String, Arc<[u8]>>>>;

/// Configuration for memory storage.
#[derive(Debug, Clone)]
pub struct MemoryStorageConfig {
    /// Initial capacity of the file map.
    pub initial_capacity: usize,
}

impl Default for MemoryStorageConfig {
    fn default() -> Self {
        MemoryStorageConfig {
            initial_capacity: 16,
        }
    }
}

/// An in-memory storage implementation.
///
/// Finished files are immutable `Arc<[u8]>` buffers, so inputs opened on a
/// file keep seeing the old bytes after the name is replaced or deleted.
#[derive(Debug)]
pub struct MemoryStorage {
    files: FileMap,
    locks: Arc<Mutex<HashSet<String>>>,
    closed: AtomicBool,
}

impl MemoryStorage {
    /// Create a new, empty memory storage.
    pub fn new(config: MemoryStorageConfig) -> Self {
        MemoryStorage {
            files: Arc::new(RwLock::new(HashMap::with_capacity(config.initial_capacity))),
            locks: Arc::new(Mutex::new(HashSet::new())),
            closed: AtomicBool::new(false),
        }
    }

    /// Create a memory storage holding a deep copy of every file in `other`.
    ///
    /// The copy shares nothing with the source: later writes to either
    /// store are invisible to the other. Locks are not copied.
    pub fn copy_of(other: &dyn Storage) -> Result<Self> {
        let storage = MemoryStorage::new(MemoryStorageConfig::default());
        {
            let mut files = storage.files.write();
            for name in other.list_files()? {
                let bytes = other.read_all(&name)?;
                files.insert(name, Arc::from(bytes.into_boxed_slice()));
            }
        }
        log::debug!(
            "copied {} files into memory storage",
            storage.files.read().len()
        );
        Ok(storage)
    }

    /// Total size of all files.
    pub fn total_size(&self) -> u64 {
        self.files.read().values().map(|data| data.len() as u64).sum()
    }

    fn check_closed(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(StorageError::StorageClosed.into())
        } else {
            Ok(())
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new(MemoryStorageConfig::default())
    }
}

impl Storage for MemoryStorage {
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>> {
        self.check_closed()?;
        let data = self
            .files
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::FileNotFound(name.to_string()))?;
        Ok(Box::new(MemoryInput::new(data)))
    }

    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        self.check_closed()?;
        Ok(Box::new(MemoryOutput::new(
            name.to_string(),
            Arc::clone(&self.files),
        )))
    }

    fn file_exists(&self, name: &str) -> bool {
        !self.closed.load(Ordering::Acquire) && self.files.read().contains_key(name)
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        self.check_closed()?;
        self.files.write().remove(name);
        Ok(())
    }

    fn list_files(&self) -> Result<Vec<String>> {
        self.check_closed()?;
        let mut names: Vec<String> = self.files.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn file_len(&self, name: &str) -> Result<u64> {
        self.check_closed()?;
        self.files
            .read()
            .get(name)
            .map(|data| data.len() as u64)
            .ok_or_else(|| StorageError::FileNotFound(name.to_string()).into())
    }

    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()> {
        self.check_closed()?;
        let mut files = self.files.write();
        let data = files
            .remove(old_name)
            .ok_or_else(|| StorageError::FileNotFound(old_name.to_string()))?;
        files.insert(new_name.to_string(), data);
        Ok(())
    }

    fn touch(&self, name: &str) -> Result<()> {
        self.check_closed()?;
        self.files
            .write()
            .entry(name.to_string())
            .or_insert_with(|| Arc::from(Vec::new().into_boxed_slice()));
        Ok(())
    }

    fn make_lock(&self, name: &str) -> Result<Box<dyn Lock>> {
        self.check_closed()?;
        Ok(Box::new(MemoryLock {
            name: name.to_string(),
            registry: Arc::clone(&self.locks),
            held: false,
        }))
    }

    fn read_all(&self, name: &str) -> Result<Vec<u8>> {
        self.check_closed()?;
        self.files
            .read()
            .get(name)
            .map(|data| data.to_vec())
            .ok_or_else(|| StorageError::FileNotFound(name.to_string()).into())
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        self.locks.lock().clear();
        Ok(())
    }
}

/// A memory-based input implementation.
#[derive(Debug)]
pub struct MemoryInput {
    cursor: Cursor<Arc<[u8]>>,
}

impl MemoryInput {
    fn new(data: Arc<[u8]>) -> Self {
        MemoryInput {
            cursor: Cursor::new(data),
        }
    }
}

impl Read for MemoryInput {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl Seek for MemoryInput {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.cursor.seek(pos)
    }
}

impl StorageInput for MemoryInput {
    fn size(&self) -> Result<u64> {
        Ok(self.cursor.get_ref().len() as u64)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A memory-based output. The buffer is published into the file map on
/// close (or drop).
#[derive(Debug)]
pub struct MemoryOutput {
    name: String,
    cursor: Cursor<Vec<u8>>,
    files: FileMap,
    closed: bool,
}

impl MemoryOutput {
    fn new(name: String, files: FileMap) -> Self {
        MemoryOutput {
            name,
            cursor: Cursor::new(Vec::new()),
            files,
            closed: false,
        }
    }
}

impl Write for MemoryOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.closed {
            return Err(std::io::Error::other("Output is closed"));
        }
        self.cursor.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Seek for MemoryOutput {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        if self.closed {
            return Err(std::io::Error::other("Output is closed"));
        }
        self.cursor.seek(pos)
    }
}

impl StorageOutput for MemoryOutput {
    fn flush_and_sync(&mut self) -> Result<()> {
        Ok(())
    }

    fn position(&self) -> Result<u64> {
        Ok(self.cursor.position())
    }

    fn close(&mut self) -> Result<()> {
        if !self.closed {
            let data = std::mem::take(self.cursor.get_mut());
            self.files
                .write()
                .insert(self.name.clone(), Arc::from(data.into_boxed_slice()));
            self.closed = true;
        }
        Ok(())
    }
}

impl Drop for MemoryOutput {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// A lock held in the owning store's lock registry.
#[derive(Debug)]
pub struct MemoryLock {
    name: String,
    registry: Arc<Mutex<HashSet<String>>>,
    held: bool,
}

impl Lock for MemoryLock {
    fn name(&self) -> &str {
        &self.name
    }

    fn obtain(&mut self) -> Result<bool> {
        if self.held {
            return Ok(true);
        }
        self.held = self.registry.lock().insert(self.name.clone());
        Ok(self.held)
    }

    fn release(&mut self) -> Result<()> {
        if self.held {
            self.registry.lock().remove(&self.name);
            self.held = false;
        }
        Ok(())
    }

    fn is_locked(&self) -> bool {
        self.registry.lock().contains(&self.name)
    }
}

impl Drop for MemoryLock {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_file(storage: &dyn Storage, name: &str, data: &[u8]) {
        let mut output = storage.create_output(name).unwrap();
        output.write_all(data).unwrap();
        output.close().unwrap();
    }

    #[test]
    fn test_memory_storage_basic_ops() {
        let storage = MemoryStorage::default();
        write_file(&storage, "test.txt", b"Hello, World!");

        assert!(storage.file_exists("test.txt"));
        assert_eq!(storage.file_len("test.txt").unwrap(), 13);

        let mut input = storage.open_input("test.txt").unwrap();
        let mut buffer = Vec::new();
        input.read_to_end(&mut buffer).unwrap();
        assert_eq!(buffer, b"Hello, World!");
    }

    #[test]
    fn test_file_invisible_until_closed() {
        let storage = MemoryStorage::default();
        let mut output = storage.create_output("partial").unwrap();
        output.write_all(b"abc").unwrap();
        assert!(!storage.file_exists("partial"));
        output.close().unwrap();
        assert!(storage.file_exists("partial"));
    }

    #[test]
    fn test_rename_replaces_and_open_inputs_survive() {
        let storage = MemoryStorage::default();
        write_file(&storage, "segments", b"old");
        let mut old_input = storage.open_input("segments").unwrap();

        write_file(&storage, "segments.tmp", b"new");
        storage.rename_file("segments.tmp", "segments").unwrap();

        assert!(!storage.file_exists("segments.tmp"));
        assert_eq!(storage.read_all("segments").unwrap(), b"new");

        let mut buf = Vec::new();
        old_input.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"old");
    }

    #[test]
    fn test_list_touch_delete() {
        let storage = MemoryStorage::default();
        storage.touch("b").unwrap();
        storage.touch("a").unwrap();
        write_file(&storage, "c", b"x");
        storage.touch("c").unwrap();

        assert_eq!(storage.list_files().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(storage.file_len("c").unwrap(), 1);

        storage.delete_file("b").unwrap();
        storage.delete_file("missing").unwrap();
        assert_eq!(storage.file_count().unwrap(), 2);
    }

    #[test]
    fn test_copy_of_is_deep() {
        let source = MemoryStorage::default();
        write_file(&source, "a", b"one");

        let copy = MemoryStorage::copy_of(&source).unwrap();
        write_file(&source, "a", b"changed");
        write_file(&copy, "b", b"two");

        assert_eq!(copy.read_all("a").unwrap(), b"one");
        assert!(!source.file_exists("b"));
    }

    #[test]
    fn test_locks_are_exclusive() {
        let storage = MemoryStorage::default();
        let mut first = storage.make_lock("write").unwrap();
        let mut second = storage.make_lock("write").unwrap();

        assert!(!first.is_locked());
        assert!(first.obtain().unwrap());
        assert!(!second.obtain().unwrap());
        assert!(second.is_locked());

        first.release().unwrap();
        assert!(!second.is_locked());
        assert!(second.obtain().unwrap());

        drop(second);
        assert!(!first.is_locked());
    }

    #[test]
    fn test_closed_storage_rejects_operations() {
        let storage = MemoryStorage::default();
        storage.close().unwrap();
        assert!(storage.create_output("x").is_err());
        assert!(!storage.file_exists("x"));
    }
}
