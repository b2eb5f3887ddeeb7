//! In-memory inverted index and ranking for a small Portuguese-language
//! search engine. The `indexer` binary builds an index from an HTML corpus
//! and the `query` binary answers free-text queries against it.

pub mod error;
pub mod index;
pub mod normalizer;
pub mod persist;
pub mod query;
pub mod ranking;
pub mod stats;

pub use index::{DocId, InvertedIndex, TermId, TermOccurrence};
