//! File-based storage implementation.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{GlaiveError, Result};
use crate::storage::{Lock, Storage, StorageError, StorageInput, StorageOutput};

const LOCK_SUFFIX: &str = ".lock";
const PARTIAL_SUFFIX: &str = ".partial";

/// Configuration for file storage.
#[derive(Debug, Clone)]
pub struct FileStorageConfig {
    /// Directory holding the index.
    pub path: PathBuf,
    /// Buffer size for reads and writes.
    pub buffer_size: usize,
    /// fsync every output on close.
    pub sync_writes: bool,
}

impl FileStorageConfig {
    /// Create a configuration rooted at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        FileStorageConfig {
            path: path.as_ref().to_path_buf(),
            buffer_size: 65536,
            sync_writes: true,
        }
    }
}

/// A file-based storage implementation.
///
/// Outputs are written to `<name>.partial` and renamed into place on close,
/// so a crashed writer never leaves a truncated file under a real name.
#[derive(Debug)]
pub struct FileStorage {
    directory: PathBuf,
    config: FileStorageConfig,
    closed: AtomicBool,
}

impl FileStorage {
    /// Create a new file storage in the given directory, creating it if
    /// needed.
    pub fn new<P: AsRef<Path>>(directory: P, config: FileStorageConfig) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();

        if !directory.exists() {
            std::fs::create_dir_all(&directory).map_err(|e| {
                GlaiveError::storage(format!(
                    "Failed to create directory {}: {e}",
                    directory.display()
                ))
            })?;
        }
        if !directory.is_dir() {
            return Err(GlaiveError::storage(format!(
                "Path is not a directory: {}",
                directory.display()
            )));
        }

        Ok(FileStorage {
            directory,
            config,
            closed: AtomicBool::new(false),
        })
    }

    /// Open a storage at `directory` with default settings.
    pub fn open<P: AsRef<Path>>(directory: P) -> Result<Self> {
        let config = FileStorageConfig::new(&directory);
        Self::new(directory, config)
    }

    /// The root directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn file_path(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains('/') || name.contains('\\') || name == ".." {
            return Err(StorageError::InvalidOperation(format!("bad file name {name:?}")).into());
        }
        Ok(self.directory.join(name))
    }

    fn check_closed(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(StorageError::StorageClosed.into())
        } else {
            Ok(())
        }
    }
}

fn not_found_or_io(name: &str, e: std::io::Error) -> GlaiveError {
    if e.kind() == std::io::ErrorKind::NotFound {
        StorageError::FileNotFound(name.to_string()).into()
    } else {
        e.into()
    }
}

impl Storage for FileStorage {
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>> {
        self.check_closed()?;
        let path = self.file_path(name)?;
        let file = File::open(&path).map_err(|e| not_found_or_io(name, e))?;
        Ok(Box::new(FileInput::new(file, self.config.buffer_size)?))
    }

    fn create_output(&self, name: &str) -> Result<Box<dyn StorageOutput>> {
        self.check_closed()?;
        let path = self.file_path(name)?;
        let partial = self.file_path(&format!("{name}{PARTIAL_SUFFIX}"))?;
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&partial)?;

        Ok(Box::new(FileOutput {
            writer: Some(BufWriter::with_capacity(self.config.buffer_size, file)),
            partial,
            path,
            sync_writes: self.config.sync_writes,
        }))
    }

    fn file_exists(&self, name: &str) -> bool {
        !self.closed.load(Ordering::Acquire)
            && self.file_path(name).map(|p| p.is_file()).unwrap_or(false)
    }

    fn delete_file(&self, name: &str) -> Result<()> {
        self.check_closed()?;
        match std::fs::remove_file(self.file_path(name)?) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn list_files(&self) -> Result<Vec<String>> {
        self.check_closed()?;
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.directory)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.ends_with(LOCK_SUFFIX) && !name.ends_with(PARTIAL_SUFFIX) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn file_len(&self, name: &str) -> Result<u64> {
        self.check_closed()?;
        let metadata =
            std::fs::metadata(self.file_path(name)?).map_err(|e| not_found_or_io(name, e))?;
        Ok(metadata.len())
    }

    fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()> {
        self.check_closed()?;
        std::fs::rename(self.file_path(old_name)?, self.file_path(new_name)?)
            .map_err(|e| not_found_or_io(old_name, e))
    }

    fn touch(&self, name: &str) -> Result<()> {
        self.check_closed()?;
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.file_path(name)?)?;
        Ok(())
    }

    fn make_lock(&self, name: &str) -> Result<Box<dyn Lock>> {
        self.check_closed()?;
        let path = self.file_path(&format!("{name}{LOCK_SUFFIX}"))?;
        Ok(Box::new(FileLock {
            name: name.to_string(),
            path,
            held: false,
        }))
    }

    fn sync(&self) -> Result<()> {
        self.check_closed()?;
        #[cfg(unix)]
        File::open(&self.directory)?.sync_all()?;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

/// A buffered file input.
#[derive(Debug)]
pub struct FileInput {
    reader: BufReader<File>,
    size: u64,
}

impl FileInput {
    fn new(file: File, buffer_size: usize) -> Result<Self> {
        let size = file.metadata()?.len();
        Ok(FileInput {
            reader: BufReader::with_capacity(buffer_size, file),
            size,
        })
    }
}

impl Read for FileInput {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.read(buf)
    }
}

impl Seek for FileInput {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.reader.seek(pos)
    }
}

impl StorageInput for FileInput {
    fn size(&self) -> Result<u64> {
        Ok(self.size)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A buffered file output that publishes itself on close.
#[derive(Debug)]
pub struct FileOutput {
    writer: Option<BufWriter<File>>,
    partial: PathBuf,
    path: PathBuf,
    sync_writes: bool,
}

impl FileOutput {
    fn writer(&mut self) -> std::io::Result<&mut BufWriter<File>> {
        self.writer
            .as_mut()
            .ok_or_else(|| std::io::Error::other("Output is closed"))
    }
}

impl Write for FileOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer()?.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer()?.flush()
    }
}

impl Seek for FileOutput {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.writer()?.seek(pos)
    }
}

impl StorageOutput for FileOutput {
    fn flush_and_sync(&mut self) -> Result<()> {
        let writer = self.writer()?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    }

    fn position(&self) -> Result<u64> {
        match &self.writer {
            Some(writer) => {
                let mut file = writer.get_ref();
                Ok(file.stream_position()? + writer.buffer().len() as u64)
            }
            None => Err(GlaiveError::storage("Output is closed")),
        }
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            if self.sync_writes {
                writer.get_ref().sync_all()?;
            }
            drop(writer);
            std::fs::rename(&self.partial, &self.path)?;
        }
        Ok(())
    }
}

impl Drop for FileOutput {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("failed to close {}: {e}", self.path.display());
        }
    }
}

/// A lock backed by an exclusively created `<name>.lock` file.
#[derive(Debug)]
pub struct FileLock {
    name: String,
    path: PathBuf,
    held: bool,
}

impl Lock for FileLock {
    fn name(&self) -> &str {
        &self.name
    }

    fn obtain(&mut self) -> Result<bool> {
        if self.held {
            return Ok(true);
        }
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(mut file) => {
                writeln!(file, "{}", std::process::id())?;
                self.held = true;
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn release(&mut self) -> Result<()> {
        if self.held {
            self.held = false;
            match std::fs::remove_file(&self.path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
                _ => {}
            }
        }
        Ok(())
    }

    fn is_locked(&self) -> bool {
        self.path.exists()
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            log::warn!("failed to release lock {}: {e}", self.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    fn create_test_storage() -> (TempDir, FileStorage) {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::open(temp_dir.path()).unwrap();
        (temp_dir, storage)
    }

    #[test]
    fn test_create_and_read_file() {
        let (_dir, storage) = create_test_storage();

        let mut output = storage.create_output("test.txt").unwrap();
        output.write_all(b"Hello, World!").unwrap();
        assert_eq!(output.position().unwrap(), 13);
        assert!(!storage.file_exists("test.txt"));
        output.close().unwrap();

        assert!(storage.file_exists("test.txt"));
        assert_eq!(storage.read_all("test.txt").unwrap(), b"Hello, World!");
        assert_eq!(storage.file_len("test.txt").unwrap(), 13);
    }

    #[test]
    fn test_file_operations() {
        let (_dir, storage) = create_test_storage();

        storage.touch("file2.txt").unwrap();
        storage.touch("file1.txt").unwrap();
        assert_eq!(storage.list_files().unwrap(), vec!["file1.txt", "file2.txt"]);

        storage.rename_file("file1.txt", "renamed.txt").unwrap();
        assert!(!storage.file_exists("file1.txt"));
        assert!(storage.file_exists("renamed.txt"));

        storage.delete_file("file2.txt").unwrap();
        assert_eq!(storage.file_count().unwrap(), 1);

        storage.clear_all().unwrap();
        assert_eq!(storage.file_count().unwrap(), 0);
    }

    #[test]
    fn test_file_not_found() {
        let (_dir, storage) = create_test_storage();
        let err = storage.open_input("nonexistent.txt").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_bad_names_rejected() {
        let (_dir, storage) = create_test_storage();
        assert!(storage.create_output("../escape").is_err());
    }

    #[test]
    fn test_lock_files() {
        let (_dir, storage) = create_test_storage();
        let mut lock = storage.make_lock("write").unwrap();
        let mut other = storage.make_lock("write").unwrap();

        assert!(lock.obtain().unwrap());
        assert!(other.is_locked());
        assert!(!other.obtain().unwrap());
        // lock files are not index files
        assert_eq!(storage.file_count().unwrap(), 0);

        lock.release().unwrap();
        assert!(!other.is_locked());
        assert!(other.obtain().unwrap());
    }

    #[test]
    fn test_storage_close() {
        let (_dir, storage) = create_test_storage();
        storage.close().unwrap();
        assert!(storage.create_output("test.txt").is_err());
    }
}
