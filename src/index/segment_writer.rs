//! Writes a [`SegmentContent`] out as segment files.
//!
//! | file   | contents                                                     |
//! |--------|--------------------------------------------------------------|
//! | `.tis` | sorted term dictionary, prefix-compressed                    |
//! | `.tii` | every `index_interval`-th term with its `.tis` offset        |
//! | `.frq` | doc deltas and frequencies, then skip entries per term       |
//! | `.prx` | position deltas                                              |
//! | `.fdx` | `.fdt` offset per document                                   |
//! | `.fdt` | stored values, LZ4 compressed for `Compress` fields          |
//! | `.nrm` | one norm byte per document per normed field                  |
//! | `.tvx` | `.tvd` offset per document                                   |
//! | `.tvd` | term vectors                                                 |
//!
//! Nothing references the files until the segments file naming the new
//! segment is committed, so a failed write leaves the index untouched.

use crate::error::{GlaiveError, Result};
use crate::index::field_infos::FieldInfos;
use crate::index::postings::SegmentContent;
use crate::index::segment_infos::{SEGMENT_EXTENSIONS, SegmentInfo};
use crate::storage::compound::CompoundWriter;
use crate::storage::structured::{StructWriter, write_header};
use crate::storage::{Storage, StorageOutput};

pub(crate) const TIS_MAGIC: &[u8; 4] = b"GTIS";
pub(crate) const TII_MAGIC: &[u8; 4] = b"GTII";
pub(crate) const FRQ_MAGIC: &[u8; 4] = b"GFRQ";
pub(crate) const PRX_MAGIC: &[u8; 4] = b"GPRX";
pub(crate) const FDX_MAGIC: &[u8; 4] = b"GFDX";
pub(crate) const FDT_MAGIC: &[u8; 4] = b"GFDT";
pub(crate) const NRM_MAGIC: &[u8; 4] = b"GNRM";
pub(crate) const TVX_MAGIC: &[u8; 4] = b"GTVX";
pub(crate) const TVD_MAGIC: &[u8; 4] = b"GTVD";
pub(crate) const DEL_MAGIC: &[u8; 4] = b"GDEL";
pub(crate) const FORMAT_VERSION: u32 = 1;

pub(crate) const STORED_COMPRESSED: u8 = 1;
pub(crate) const TV_POSITIONS: u8 = 1;
pub(crate) const TV_OFFSETS: u8 = 2;

/// Layout parameters taken from the writer configuration.
#[derive(Debug, Clone, Copy)]
pub struct SegmentWriteOptions {
    pub index_interval: u32,
    pub skip_interval: u32,
    pub use_compound_file: bool,
    pub chunk_size: usize,
}

type Writer = StructWriter<Box<dyn StorageOutput>>;

fn create(storage: &dyn Storage, name: &str, ext: &str, magic: &[u8; 4]) -> Result<Writer> {
    let mut writer = StructWriter::new(storage.create_output(&format!("{name}.{ext}"))?);
    write_header(&mut writer, magic, FORMAT_VERSION)?;
    Ok(writer)
}

/// Byte length of the longest common prefix ending on a char boundary.
fn common_prefix(a: &str, b: &str) -> usize {
    let mut len = 0;
    for ((i, ca), cb) in a.char_indices().zip(b.chars()) {
        if ca != cb {
            return i;
        }
        len = i + ca.len_utf8();
    }
    len
}

/// Write `content` as segment `name`. On failure every file written so far
/// is removed again.
pub fn write_segment(
    storage: &dyn Storage,
    name: &str,
    content: &SegmentContent,
    field_infos: &FieldInfos,
    options: SegmentWriteOptions,
) -> Result<SegmentInfo> {
    let result = write_files(storage, name, content, field_infos, options).and_then(|()| {
        if options.use_compound_file {
            pack(storage, name, options.chunk_size)
        } else {
            Ok(())
        }
    });
    if let Err(e) = result {
        for ext in SEGMENT_EXTENSIONS.iter().chain(&["cfs"]) {
            let _ = storage.delete_file(&format!("{name}.{ext}"));
        }
        return Err(e);
    }
    log::debug!(
        "wrote segment {name}: {} docs, {} terms",
        content.doc_count,
        content.postings.len()
    );
    Ok(SegmentInfo::new(name, content.doc_count, options.use_compound_file))
}

fn pack(storage: &dyn Storage, name: &str, chunk_size: usize) -> Result<()> {
    let mut cfs = CompoundWriter::new(storage, format!("{name}.cfs"));
    for ext in SEGMENT_EXTENSIONS {
        cfs.add_file(format!("{name}.{ext}"))?;
    }
    cfs.close(chunk_size)?;
    for ext in SEGMENT_EXTENSIONS {
        storage.delete_file(&format!("{name}.{ext}"))?;
    }
    Ok(())
}

fn write_files(
    storage: &dyn Storage,
    name: &str,
    content: &SegmentContent,
    field_infos: &FieldInfos,
    options: SegmentWriteOptions,
) -> Result<()> {
    if options.index_interval == 0 || options.skip_interval == 0 {
        return Err(GlaiveError::configuration("index and skip intervals must be positive"));
    }
    write_postings(storage, name, content, field_infos, options)?;
    write_stored(storage, name, content, field_infos)?;
    write_norms(storage, name, content)?;
    write_vectors(storage, name, content, field_infos)
}

fn field_number(field_infos: &FieldInfos, field: &str) -> Result<u32> {
    field_infos
        .number(field)
        .map(|n| n as u32)
        .ok_or_else(|| GlaiveError::corrupt(format!("field {field} missing from schema")))
}

fn write_postings(
    storage: &dyn Storage,
    name: &str,
    content: &SegmentContent,
    field_infos: &FieldInfos,
    options: SegmentWriteOptions,
) -> Result<()> {
    let mut tis = create(storage, name, "tis", TIS_MAGIC)?;
    let mut frq = create(storage, name, "frq", FRQ_MAGIC)?;
    let mut prx = create(storage, name, "prx", PRX_MAGIC)?;

    tis.write_vint(options.index_interval)?;
    tis.write_vint(options.skip_interval)?;
    tis.write_vlong(content.postings.len() as u64)?;

    let mut index_entries = Vec::new();
    let mut previous: Option<(u32, &str)> = None;
    for (ordinal, (term, postings)) in content.postings.iter().enumerate() {
        let number = field_number(field_infos, &term.field)?;
        if ordinal % options.index_interval as usize == 0 {
            index_entries.push((number, term.text.as_str(), tis.position(), ordinal as u64));
            previous = None;
        }
        let prefix = match previous {
            Some((prev_number, prev_text)) if prev_number == number => common_prefix(prev_text, &term.text),
            _ => 0,
        };

        let frq_pointer = frq.position();
        let prx_pointer = prx.position();
        let mut skips = Vec::new();
        let mut last_doc = 0;
        for (k, posting) in postings.iter().enumerate() {
            if k > 0 && k % options.skip_interval as usize == 0 {
                skips.push((last_doc, frq.position(), prx.position()));
            }
            let delta = posting.doc - last_doc;
            if posting.freq() == 1 {
                frq.write_vint((delta << 1) | 1)?;
            } else {
                frq.write_vint(delta << 1)?;
                frq.write_vint(posting.freq())?;
            }
            let mut last_position = 0;
            for &position in &posting.positions {
                prx.write_vint(position - last_position)?;
                last_position = position;
            }
            last_doc = posting.doc;
        }

        let mut skip_offset = 0u64;
        if !skips.is_empty() {
            skip_offset = frq.position() - frq_pointer;
            frq.write_vint(skips.len() as u32)?;
            let (mut prev_doc, mut prev_frq, mut prev_prx) = (0, frq_pointer, prx_pointer);
            for (doc, frq_pos, prx_pos) in skips {
                frq.write_vint(doc - prev_doc)?;
                frq.write_vlong(frq_pos - prev_frq)?;
                frq.write_vlong(prx_pos - prev_prx)?;
                (prev_doc, prev_frq, prev_prx) = (doc, frq_pos, prx_pos);
            }
        }

        tis.write_vint(prefix as u32)?;
        tis.write_string(&term.text[prefix..])?;
        tis.write_vint(number)?;
        tis.write_vint(postings.len() as u32)?;
        tis.write_vlong(frq_pointer)?;
        tis.write_vlong(prx_pointer)?;
        tis.write_vlong(skip_offset)?;
        previous = Some((number, term.text.as_str()));
    }
    tis.close()?;
    frq.close()?;
    prx.close()?;

    let mut tii = create(storage, name, "tii", TII_MAGIC)?;
    tii.write_vlong(index_entries.len() as u64)?;
    for (number, text, offset, ordinal) in index_entries {
        tii.write_vint(number)?;
        tii.write_string(text)?;
        tii.write_vlong(offset)?;
        tii.write_vlong(ordinal)?;
    }
    tii.close()
}

fn write_stored(
    storage: &dyn Storage,
    name: &str,
    content: &SegmentContent,
    field_infos: &FieldInfos,
) -> Result<()> {
    let mut fdx = create(storage, name, "fdx", FDX_MAGIC)?;
    let mut fdt = create(storage, name, "fdt", FDT_MAGIC)?;
    fdx.write_vint(content.stored.len() as u32)?;
    for values in &content.stored {
        fdx.write_u64(fdt.position())?;
        fdt.write_vint(values.len() as u32)?;
        for stored in values {
            let compressed = field_infos
                .get_by_number(stored.field as isize)
                .is_some_and(|fi| fi.is_compressed());
            fdt.write_vint(stored.field as u32)?;
            if compressed {
                fdt.write_u8(STORED_COMPRESSED)?;
                fdt.write_bytes(&lz4_flex::compress_prepend_size(stored.value.as_bytes()))?;
            } else {
                fdt.write_u8(0)?;
                fdt.write_string(&stored.value)?;
            }
        }
    }
    fdx.close()?;
    fdt.close()
}

fn write_norms(storage: &dyn Storage, name: &str, content: &SegmentContent) -> Result<()> {
    let mut nrm = create(storage, name, "nrm", NRM_MAGIC)?;
    nrm.write_vint(content.doc_count)?;
    nrm.write_vint(content.norms.len() as u32)?;
    for (&field, column) in &content.norms {
        if column.len() != content.doc_count as usize {
            return Err(GlaiveError::corrupt(format!(
                "{name}: norms for field #{field} cover {} of {} documents",
                column.len(),
                content.doc_count
            )));
        }
        nrm.write_vint(field as u32)?;
        nrm.write_raw(column)?;
    }
    nrm.close()
}

fn write_vectors(
    storage: &dyn Storage,
    name: &str,
    content: &SegmentContent,
    field_infos: &FieldInfos,
) -> Result<()> {
    let mut tvx = create(storage, name, "tvx", TVX_MAGIC)?;
    let mut tvd = create(storage, name, "tvd", TVD_MAGIC)?;
    tvx.write_vint(content.vectors.len() as u32)?;
    for vectors in &content.vectors {
        tvx.write_u64(tvd.position())?;
        tvd.write_vint(vectors.len() as u32)?;
        for tv in vectors {
            let has_positions = tv.terms.iter().any(|t| !t.positions.is_empty());
            let has_offsets = tv.terms.iter().any(|t| !t.offsets.is_empty());
            let mut flags = 0;
            if has_positions {
                flags |= TV_POSITIONS;
            }
            if has_offsets {
                flags |= TV_OFFSETS;
            }
            tvd.write_vint(field_number(field_infos, &tv.field)?)?;
            tvd.write_u8(flags)?;
            tvd.write_vint(tv.terms.len() as u32)?;
            for term in &tv.terms {
                tvd.write_string(&term.text)?;
                tvd.write_vint(term.freq)?;
                if has_positions {
                    let mut last = 0;
                    for &p in &term.positions {
                        tvd.write_vint(p - last)?;
                        last = p;
                    }
                }
                if has_offsets {
                    let mut last_start = 0;
                    for offset in &term.offsets {
                        tvd.write_vlong((offset.start - last_start) as u64)?;
                        tvd.write_vlong((offset.end - offset.start) as u64)?;
                        last_start = offset.start;
                    }
                }
            }
        }
    }
    tvx.close()?;
    tvd.close()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_prefix() {
        assert_eq!(common_prefix("apple", "apply"), 4);
        assert_eq!(common_prefix("app", "apple"), 3);
        assert_eq!(common_prefix("", "x"), 0);
        assert_eq!(common_prefix("café", "cafés"), 5);
        assert_eq!(common_prefix("caé", "caè"), 2);
    }
}
