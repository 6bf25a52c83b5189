//! Scoring, ranking and presentation of query results.
//!
//! A [`Searcher`] rewrites a [`Query`](crate::query::Query) against its
//! reader, turns it into a normalized [`Weight`] tree and walks the
//! resulting [`Scorer`]s document by document. Hits are ranked by score or
//! by a [`Sort`], optionally restricted by a [`Filter`].

pub mod boolean_scorer;
pub mod collector;
pub mod explanation;
pub mod filter;
pub mod highlight;
pub mod phrase_scorer;
pub mod scorer;
pub mod searcher;
pub mod similarity;
pub mod sort;
pub mod spans;
pub mod weight;

pub use collector::{Collector, DocIdCollector, Hit, TopDocs, TopDocsCollector};
pub use explanation::Explanation;
pub use filter::{Filter, FnFilter, QueryFilter, RangeFilter};
pub use highlight::HighlightOptions;
pub use scorer::Scorer;
pub use searcher::{SearchOptions, Searcher};
pub use similarity::{Similarity, decode_norm, encode_norm};
pub use sort::{FieldCache, FieldValues, Sort, SortField, SortType};
pub use weight::{Weight, create_weight};
