//! Shared utility modules used across glaive components.

pub mod levenshtein;
pub mod varint;
