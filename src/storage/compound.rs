//! Compound files: all of a segment's files packed into one `.cfs`
//! container.
//!
//! Layout: header, entry count, then `(name, offset, length)` for every
//! packed file, then the file bodies back to back, then a CRC32 trailer.
//! Offsets are absolute within the container.

use std::collections::HashMap;
use std::io::{Read, Seek, SeekFrom};
use std::sync::Arc;

use crate::error::{GlaiveError, Result};
use crate::storage::structured::{StructReader, StructWriter, check_header, read_checked, write_header};
use crate::storage::{Lock, Storage, StorageError, StorageInput, StorageOutput};

const MAGIC: &[u8; 4] = b"GCFS";
const VERSION: u32 = 1;

/// Packs named files of a store into a compound container.
#[derive(Debug)]
pub struct CompoundWriter<'a> {
    storage: &'a dyn Storage,
    name: String,
    files: Vec<String>,
}

impl<'a> CompoundWriter<'a> {
    /// Start a container called `name` in `storage`.
    pub fn new(storage: &'a dyn Storage, name: impl Into<String>) -> Self {
        CompoundWriter {
            storage,
            name: name.into(),
            files: Vec::new(),
        }
    }

    /// Queue a file for packing.
    pub fn add_file(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        if self.files.contains(&name) {
            return Err(GlaiveError::storage(format!(
                "{name} added twice to compound file {}",
                self.name
            )));
        }
        self.files.push(name);
        Ok(())
    }

    /// Write the container, copying each file in `chunk_size` blocks.
    /// The source files are left in place.
    pub fn close(self, chunk_size: usize) -> Result<()> {
        let mut sizes = Vec::with_capacity(self.files.len());
        for file in &self.files {
            sizes.push(self.storage.file_len(file)?);
        }

        let mut header = StructWriter::new(Vec::new());
        write_header(&mut header, MAGIC, VERSION)?;
        header.write_vint(self.files.len() as u32)?;
        // entry table size is needed before offsets are known
        let mut table_len = 0u64;
        for file in &self.files {
            let name_len = file.len() as u64;
            table_len += crate::util::varint::encode_u32(name_len as u32).len() as u64 + name_len + 16;
        }
        let mut offset = header.position() + table_len;
        for (file, size) in self.files.iter().zip(&sizes) {
            header.write_string(file)?;
            header.write_u64(offset)?;
            header.write_u64(*size)?;
            offset += size;
        }
        let head_len = header.position();
        let head = header.finish()?;
        let head = &head[..head_len as usize];

        let output = self.storage.create_output(&self.name)?;
        let mut writer = StructWriter::new(output);
        writer.write_raw(head)?;

        let mut buf = vec![0u8; chunk_size.max(512)];
        for file in &self.files {
            let mut input = self.storage.open_input(file)?;
            loop {
                let read = input.read(&mut buf)?;
                if read == 0 {
                    break;
                }
                writer.write_raw(&buf[..read])?;
            }
        }
        writer.close()?;
        log::debug!("packed {} files into {}", self.files.len(), self.name);
        Ok(())
    }
}

/// A read-only store view over a compound container.
#[derive(Debug)]
pub struct CompoundStorage {
    name: String,
    data: Arc<[u8]>,
    entries: HashMap<String, (usize, usize)>,
}

impl CompoundStorage {
    /// Open the container `name` inside `storage`.
    pub fn open(storage: &dyn Storage, name: &str) -> Result<Self> {
        let bytes = read_checked(storage, name)?;
        let mut entries = HashMap::new();
        {
            let mut reader = StructReader::new(&bytes);
            check_header(&mut reader, name, MAGIC, VERSION)?;
            let count = reader.read_vint()?;
            for _ in 0..count {
                let file = reader.read_string()?;
                let offset = reader.read_u64()? as usize;
                let len = reader.read_u64()? as usize;
                if offset.checked_add(len).is_none_or(|end| end > bytes.len()) {
                    return Err(GlaiveError::corrupt(format!(
                        "{name}: entry {file} extends past end of container"
                    )));
                }
                entries.insert(file, (offset, len));
            }
        }
        Ok(CompoundStorage {
            name: name.to_string(),
            data: Arc::from(bytes.into_boxed_slice()),
            entries,
        })
    }

    fn entry(&self, name: &str) -> Result<(usize, usize)> {
        self.entries
            .get(name)
            .copied()
            .ok_or_else(|| StorageError::FileNotFound(format!("{name} in {}", self.name)).into())
    }

    fn read_only(&self) -> GlaiveError {
        StorageError::InvalidOperation(format!("compound file {} is read-only", self.name)).into()
    }
}

impl Storage for CompoundStorage {
    fn open_input(&self, name: &str) -> Result<Box<dyn StorageInput>> {
        let (start, len) = self.entry(name)?;
        Ok(Box::new(CompoundInput {
            data: Arc::clone(&self.data),
            start,
            len,
            pos: 0,
        }))
    }

    fn create_output(&self, _name: &str) -> Result<Box<dyn StorageOutput>> {
        Err(self.read_only())
    }

    fn file_exists(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    fn delete_file(&self, _name: &str) -> Result<()> {
        Err(self.read_only())
    }

    fn list_files(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn file_len(&self, name: &str) -> Result<u64> {
        Ok(self.entry(name)?.1 as u64)
    }

    fn rename_file(&self, _old_name: &str, _new_name: &str) -> Result<()> {
        Err(self.read_only())
    }

    fn touch(&self, _name: &str) -> Result<()> {
        Err(self.read_only())
    }

    fn make_lock(&self, _name: &str) -> Result<Box<dyn Lock>> {
        Err(self.read_only())
    }

    fn read_all(&self, name: &str) -> Result<Vec<u8>> {
        let (start, len) = self.entry(name)?;
        Ok(self.data[start..start + len].to_vec())
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// A window onto one packed file.
#[derive(Debug)]
pub struct CompoundInput {
    data: Arc<[u8]>,
    start: usize,
    len: usize,
    pos: usize,
}

impl Read for CompoundInput {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let remaining = self.len.saturating_sub(self.pos);
        let n = remaining.min(buf.len());
        let from = self.start + self.pos;
        buf[..n].copy_from_slice(&self.data[from..from + n]);
        self.pos += n;
        Ok(n)
    }
}

impl Seek for CompoundInput {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(p) => p as i64,
            SeekFrom::End(d) => self.len as i64 + d,
            SeekFrom::Current(d) => self.pos as i64 + d,
        };
        if target < 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "seek before start of file",
            ));
        }
        self.pos = target as usize;
        Ok(self.pos as u64)
    }
}

impl StorageInput for CompoundInput {
    fn size(&self) -> Result<u64> {
        Ok(self.len as u64)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStorage;
    use std::io::Write;

    fn write_file(storage: &dyn Storage, name: &str, data: &[u8]) {
        let mut out = storage.create_output(name).unwrap();
        out.write_all(data).unwrap();
        out.close().unwrap();
    }

    #[test]
    fn test_pack_and_read_back() {
        let storage = MemoryStorage::default();
        write_file(&storage, "_0.tis", b"terms");
        write_file(&storage, "_0.frq", &[7u8; 3000]);
        write_file(&storage, "_0.nrm", b"");

        let mut writer = CompoundWriter::new(&storage, "_0.cfs");
        writer.add_file("_0.tis").unwrap();
        writer.add_file("_0.frq").unwrap();
        writer.add_file("_0.nrm").unwrap();
        assert!(writer.add_file("_0.nrm").is_err());
        writer.close(1024).unwrap();

        let cfs = CompoundStorage::open(&storage, "_0.cfs").unwrap();
        assert_eq!(cfs.list_files().unwrap(), vec!["_0.frq", "_0.nrm", "_0.tis"]);
        assert_eq!(cfs.read_all("_0.tis").unwrap(), b"terms");
        assert_eq!(cfs.read_all("_0.frq").unwrap(), vec![7u8; 3000]);
        assert_eq!(cfs.file_len("_0.nrm").unwrap(), 0);

        let mut input = cfs.open_input("_0.tis").unwrap();
        input.seek(SeekFrom::Start(2)).unwrap();
        let mut rest = String::new();
        input.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "rms");
    }

    #[test]
    fn test_compound_is_read_only() {
        let storage = MemoryStorage::default();
        write_file(&storage, "a", b"x");
        let mut writer = CompoundWriter::new(&storage, "c.cfs");
        writer.add_file("a").unwrap();
        writer.close(512).unwrap();

        let cfs = CompoundStorage::open(&storage, "c.cfs").unwrap();
        assert!(cfs.create_output("b").is_err());
        assert!(cfs.delete_file("a").is_err());
        assert!(cfs.open_input("missing").is_err());
    }
}
