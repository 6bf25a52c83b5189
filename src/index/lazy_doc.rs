//! Stored documents whose values are decoded on first access.

use std::ops::Range;
use std::sync::{Arc, OnceLock};

use crate::error::{GlaiveError, Result};
use crate::index::document::{DocField, Document};
use crate::index::field_infos::FieldInfos;
use crate::index::segment_writer::STORED_COMPRESSED;
use crate::storage::structured::StructReader;

/// One stored value: a window onto the segment's stored-field data plus a
/// cache for the decoded text.
#[derive(Debug)]
struct LazyValue {
    data: Arc<[u8]>,
    range: Range<usize>,
    compressed: bool,
    decoded: OnceLock<String>,
}

impl LazyValue {
    fn get(&self) -> Result<&str> {
        if let Some(text) = self.decoded.get() {
            return Ok(text);
        }
        let raw = &self.data[self.range.clone()];
        let bytes = if self.compressed {
            lz4_flex::decompress_size_prepended(raw)
                .map_err(|e| GlaiveError::corrupt(format!("stored field does not decompress: {e}")))?
        } else {
            raw.to_vec()
        };
        let text = String::from_utf8(bytes)
            .map_err(|e| GlaiveError::corrupt(format!("stored field is not UTF-8: {e}")))?;
        Ok(self.decoded.get_or_init(|| text))
    }
}

/// The stored values of one field of a [`LazyDoc`].
#[derive(Debug)]
pub struct LazyDocField {
    name: String,
    values: Vec<LazyValue>,
}

impl LazyDocField {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value `index`, decoding it if this is the first access.
    pub fn value(&self, index: usize) -> Result<Option<&str>> {
        self.values.get(index).map(LazyValue::get).transpose()
    }

    pub fn first(&self) -> Result<Option<&str>> {
        self.value(0)
    }

    /// Every value, decoding as needed.
    pub fn values(&self) -> Result<Vec<&str>> {
        self.values.iter().map(LazyValue::get).collect()
    }

    /// Whether value `index` has already been decoded.
    pub fn is_loaded(&self, index: usize) -> bool {
        self.values
            .get(index)
            .is_some_and(|v| v.decoded.get().is_some())
    }
}

/// A stored document that knows where each of its values lives but only
/// decodes (and decompresses) a value when it is asked for.
#[derive(Debug)]
pub struct LazyDoc {
    doc: u32,
    fields: Vec<LazyDocField>,
}

impl LazyDoc {
    /// Parse the field directory of the document at `start` in `data`.
    pub(crate) fn parse(doc: u32, data: Arc<[u8]>, start: usize, field_infos: &FieldInfos) -> Result<Self> {
        let mut fields: Vec<LazyDocField> = Vec::new();
        {
            let mut reader = StructReader::new(&data);
            reader.seek(start)?;
            let count = reader.read_vint()?;
            for _ in 0..count {
                let number = reader.read_vint()? as usize;
                let flags = reader.read_u8()?;
                let len = reader.read_vlong()? as usize;
                let begin = reader.position();
                reader.read_raw(len)?;

                let name = field_infos.name(number).ok_or_else(|| {
                    GlaiveError::corrupt(format!("document {doc} refers to unknown field #{number}"))
                })?;
                let value = LazyValue {
                    data: Arc::clone(&data),
                    range: begin..begin + len,
                    compressed: flags & STORED_COMPRESSED != 0,
                    decoded: OnceLock::new(),
                };
                match fields.iter_mut().find(|f| f.name == name) {
                    Some(field) => field.values.push(value),
                    None => fields.push(LazyDocField {
                        name: name.to_string(),
                        values: vec![value],
                    }),
                }
            }
        }
        Ok(LazyDoc { doc, fields })
    }

    /// Global id of the document.
    pub fn doc(&self) -> u32 {
        self.doc
    }

    pub(crate) fn set_doc(&mut self, doc: u32) {
        self.doc = doc;
    }

    pub fn get(&self, name: &str) -> Option<&LazyDocField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// First value of `name`.
    pub fn get_value(&self, name: &str) -> Result<Option<&str>> {
        match self.get(name) {
            Some(field) => field.first(),
            None => Ok(None),
        }
    }

    pub fn fields(&self) -> &[LazyDocField] {
        &self.fields
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Decode everything into a plain [`Document`].
    pub fn load(&self) -> Result<Document> {
        let mut doc = Document::new();
        for field in &self.fields {
            let mut out = DocField::new(field.name.clone());
            for value in field.values()? {
                out.add_value(value);
            }
            doc = doc.with_field(out);
        }
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::structured::StructWriter;

    fn encode(values: &[(u32, bool, &str)]) -> Arc<[u8]> {
        let mut w = StructWriter::new(Vec::new());
        w.write_u8(0xAA).unwrap();
        w.write_vint(values.len() as u32).unwrap();
        for (field, compressed, text) in values {
            w.write_vint(*field).unwrap();
            if *compressed {
                w.write_u8(STORED_COMPRESSED).unwrap();
                w.write_bytes(&lz4_flex::compress_prepend_size(text.as_bytes())).unwrap();
            } else {
                w.write_u8(0).unwrap();
                w.write_string(text).unwrap();
            }
        }
        let mut bytes = w.finish().unwrap();
        bytes.truncate(bytes.len() - 4);
        Arc::from(bytes.into_boxed_slice())
    }

    #[test]
    fn test_lazy_decoding() {
        let mut fis = FieldInfos::default();
        fis.add_or_get("title");
        fis.add_or_get("body");
        let data = encode(&[(0, false, "Hi"), (1, true, "long long long text"), (0, false, "there")]);

        let doc = LazyDoc::parse(7, data, 1, &fis).unwrap();
        assert_eq!(doc.doc(), 7);
        assert_eq!(doc.field_names(), vec!["title", "body"]);

        let body = doc.get("body").unwrap();
        assert!(!body.is_loaded(0));
        assert_eq!(body.first().unwrap(), Some("long long long text"));
        assert!(body.is_loaded(0));
        assert!(!doc.get("title").unwrap().is_loaded(1));

        let loaded = doc.load().unwrap();
        assert_eq!(loaded.get("title").unwrap().values, vec!["Hi", "there"]);
        assert_eq!(doc.get_value("missing").unwrap(), None);
    }

    #[test]
    fn test_unknown_field_is_corruption() {
        let fis = FieldInfos::default();
        let data = encode(&[(3, false, "x")]);
        assert!(LazyDoc::parse(0, data, 1, &fis).is_err());
    }
}
