//! Segment-based inverted index: documents, schema, segment files and the
//! reader and writer built on them.

pub mod document;
pub mod field_infos;
pub mod lazy_doc;
pub mod merge_policy;
pub mod merger;
pub mod postings;
pub mod reader;
pub mod segment_infos;
pub mod segment_reader;
pub mod segment_writer;
pub mod term;
pub mod term_vector;
pub mod writer;

pub use document::{DocField, Document};
pub use field_infos::{FieldInfo, FieldInfos, IndexValue, StoreValue, TermVectorValue};
pub use lazy_doc::{LazyDoc, LazyDocField};
pub use reader::{IndexReader, TermDocEnum, TermEnum};
pub use term::Term;
pub use term_vector::{Offset, TVTerm, TermVector};
pub use writer::{IndexWriter, IndexWriterConfig, OpenMode};
