//! The `segments` file: the list of live segments, the schema and a version
//! counter.
//!
//! A commit writes the new list to `segments.tmp` and renames it over
//! `segments`, so readers always see either the old or the new list.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{GlaiveError, Result};
use crate::index::field_infos::FieldInfos;
use crate::storage::Storage;
use crate::storage::structured::{StructWriter, read_checked};

/// Name of the file listing the committed segments.
pub const SEGMENTS_FILE: &str = "segments";

/// Staging name the segments file is written under before the rename.
pub const SEGMENTS_TMP_FILE: &str = "segments.tmp";

const FORMAT: u32 = 1;

/// Files every segment has, by extension. Compound segments pack these
/// into a single `.cfs`.
pub const SEGMENT_EXTENSIONS: [&str; 9] = ["tis", "tii", "frq", "prx", "fdx", "fdt", "nrm", "tvx", "tvd"];

/// Descriptor of one committed segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentInfo {
    pub name: String,
    /// Documents in the segment, deleted ones included.
    pub doc_count: u32,
    /// Documents marked deleted.
    pub del_count: u32,
    /// Generation of the current deletions file, 0 when there is none.
    pub del_gen: u32,
    pub use_compound_file: bool,
}

impl SegmentInfo {
    pub fn new<S: Into<String>>(name: S, doc_count: u32, use_compound_file: bool) -> Self {
        SegmentInfo {
            name: name.into(),
            doc_count,
            del_count: 0,
            del_gen: 0,
            use_compound_file,
        }
    }

    pub fn has_deletions(&self) -> bool {
        self.del_gen > 0 && self.del_count > 0
    }

    /// Live documents.
    pub fn live_docs(&self) -> u32 {
        self.doc_count - self.del_count
    }

    /// `_N.ext`.
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{extension}", self.name)
    }

    /// Name of the deletions file for generation `generation`.
    pub fn del_file_name(&self, generation: u32) -> String {
        format!("{}_{}.del", self.name, to_base36(generation as u64))
    }

    /// Every file this segment currently consists of.
    pub fn files(&self) -> Vec<String> {
        let mut files = if self.use_compound_file {
            vec![self.file_name("cfs")]
        } else {
            SEGMENT_EXTENSIONS
                .iter()
                .map(|ext| self.file_name(ext))
                .collect()
        };
        if self.del_gen > 0 {
            files.push(self.del_file_name(self.del_gen));
        }
        files
    }
}

/// The committed state of an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentInfos {
    pub format: u32,
    /// Bumped by every commit.
    pub version: u64,
    /// Source of fresh segment names.
    pub counter: u64,
    pub segments: Vec<SegmentInfo>,
    pub field_infos: FieldInfos,
}

impl SegmentInfos {
    /// An empty index with the given schema.
    pub fn new(field_infos: FieldInfos) -> Self {
        SegmentInfos {
            format: FORMAT,
            version: 1,
            counter: 0,
            segments: Vec::new(),
            field_infos,
        }
    }

    /// Whether `storage` holds an index.
    pub fn exists(storage: &dyn Storage) -> bool {
        storage.file_exists(SEGMENTS_FILE)
    }

    /// Load the committed state.
    pub fn read(storage: &dyn Storage) -> Result<Self> {
        let bytes = read_checked(storage, SEGMENTS_FILE)?;
        let infos: SegmentInfos = serde_json::from_slice(&bytes)?;
        if infos.format != FORMAT {
            return Err(GlaiveError::corrupt(format!(
                "{SEGMENTS_FILE}: unsupported format {}",
                infos.format
            )));
        }
        for segment in &infos.segments {
            if segment.del_count > segment.doc_count {
                return Err(GlaiveError::corrupt(format!(
                    "{SEGMENTS_FILE}: segment {} has {} deletions but only {} documents",
                    segment.name, segment.del_count, segment.doc_count
                )));
            }
        }
        Ok(infos)
    }

    /// Version of the committed state without keeping the rest.
    pub fn read_version(storage: &dyn Storage) -> Result<u64> {
        Ok(Self::read(storage)?.version)
    }

    /// Publish this state: write to a staging file, then rename it over the
    /// live one.
    pub fn write(&self, storage: &dyn Storage) -> Result<()> {
        let json = serde_json::to_vec(self)?;
        let output = storage.create_output(SEGMENTS_TMP_FILE)?;
        let mut writer = StructWriter::new(output);
        writer.write_raw(&json)?;
        writer.close()?;
        storage.rename_file(SEGMENTS_TMP_FILE, SEGMENTS_FILE)?;
        storage.sync()?;
        log::debug!(
            "committed version {} with {} segments",
            self.version,
            self.segments.len()
        );
        Ok(())
    }

    /// Reserve a new segment name.
    pub fn next_segment_name(&mut self) -> String {
        let name = format!("_{}", to_base36(self.counter));
        self.counter += 1;
        name
    }

    /// Documents including deleted ones.
    pub fn max_doc(&self) -> u64 {
        self.segments.iter().map(|s| s.doc_count as u64).sum()
    }

    /// Live documents.
    pub fn num_docs(&self) -> u64 {
        self.segments.iter().map(|s| s.live_docs() as u64).sum()
    }

    /// Every file this state refers to.
    pub fn files(&self) -> BTreeSet<String> {
        let mut files: BTreeSet<String> = self.segments.iter().flat_map(SegmentInfo::files).collect();
        files.insert(SEGMENTS_FILE.to_string());
        files
    }

    /// Delete segment files (`_*`) no longer referenced by this state.
    /// Files that cannot be deleted are left for the next commit.
    pub fn remove_unreferenced_files(&self, storage: &dyn Storage) -> Result<usize> {
        let live = self.files();
        let mut removed = 0;
        for name in storage.list_files()? {
            if !name.starts_with('_') || live.contains(&name) {
                continue;
            }
            match storage.delete_file(&name) {
                Ok(()) => removed += 1,
                Err(e) => log::warn!("could not delete obsolete file {name}: {e}"),
            }
        }
        if removed > 0 {
            log::debug!("removed {removed} obsolete files");
        }
        Ok(removed)
    }
}

/// Lowercase base-36 rendering used in segment and generation names.
pub fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::storage::memory::MemoryStorage;

    #[test]
    fn test_names() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");

        let mut infos = SegmentInfos::new(FieldInfos::default());
        assert_eq!(infos.next_segment_name(), "_0");
        assert_eq!(infos.next_segment_name(), "_1");

        let mut seg = SegmentInfo::new("_a", 3, false);
        assert_eq!(seg.files().len(), SEGMENT_EXTENSIONS.len());
        seg.use_compound_file = true;
        seg.del_gen = 37;
        assert_eq!(seg.files(), vec!["_a.cfs", "_a_11.del"]);
    }

    #[test]
    fn test_write_read_and_cleanup() {
        let storage = MemoryStorage::default();
        assert!(!SegmentInfos::exists(&storage));
        let err = SegmentInfos::read(&storage).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let mut infos = SegmentInfos::new(FieldInfos::default());
        infos.field_infos.add_or_get("body");
        infos.segments.push(SegmentInfo::new("_0", 2, true));
        infos.write(&storage).unwrap();

        storage.touch("_0.cfs").unwrap();
        storage.touch("_1.cfs").unwrap();
        storage.touch("notes.txt").unwrap();

        let back = SegmentInfos::read(&storage).unwrap();
        assert_eq!(back, infos);
        assert_eq!(SegmentInfos::read_version(&storage).unwrap(), 1);
        assert!(!storage.file_exists(SEGMENTS_TMP_FILE));

        assert_eq!(back.remove_unreferenced_files(&storage).unwrap(), 1);
        assert!(storage.file_exists("_0.cfs"));
        assert!(!storage.file_exists("_1.cfs"));
        assert!(storage.file_exists("notes.txt"));
    }
}
