use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use crate::error::IndexError;

pub type TermId = u32;
pub type DocId = u32;

/// One term's occurrence in one document, or in a query when `doc_id` is
/// `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermOccurrence {
    pub doc_id: Option<DocId>,
    pub term_id: TermId,
    pub term_frequency: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub term_id: TermId,
    pub postings: Vec<TermOccurrence>,
    /// Always equals `postings.len()`: one posting per document containing
    /// the term.
    pub doc_count_with_term: u32,
}

/// Term -> postings mapping, built incrementally by the indexer and
/// read-only after `finalize`. Term ids are assigned sequentially in order
/// of first appearance.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct InvertedIndex {
    entries: HashMap<String, IndexEntry>,
    doc_ids: HashSet<DocId>,
    next_term_id: TermId,
    finalized: bool,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `frequency` occurrences of `term` in `doc_id`. Repeated
    /// inserts for the same (term, doc) pair accumulate into one posting.
    pub fn insert(&mut self, term: &str, doc_id: DocId, frequency: u32) -> Result<(), IndexError> {
        if self.finalized {
            return Err(IndexError::Finalized);
        }
        self.doc_ids.insert(doc_id);
        let entry = match self.entries.entry(term.to_string()) {
            Entry::Occupied(occupied) => occupied.into_mut(),
            Entry::Vacant(vacant) => {
                let term_id = self.next_term_id;
                self.next_term_id += 1;
                vacant.insert(IndexEntry {
                    term_id,
                    postings: Vec::new(),
                    doc_count_with_term: 0,
                })
            }
        };
        match entry.postings.iter_mut().find(|p| p.doc_id == Some(doc_id)) {
            Some(posting) => posting.term_frequency += frequency,
            None => {
                entry.postings.push(TermOccurrence {
                    doc_id: Some(doc_id),
                    term_id: entry.term_id,
                    term_frequency: frequency,
                });
                entry.doc_count_with_term += 1;
            }
        }
        Ok(())
    }

    /// Marks the index read-only. Calling it again is a no-op.
    pub fn finalize(&mut self) {
        self.finalized = true;
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Empty slice for terms never inserted.
    pub fn postings(&self, term: &str) -> &[TermOccurrence] {
        self.entries
            .get(term)
            .map(|e| e.postings.as_slice())
            .unwrap_or(&[])
    }

    pub fn term_id(&self, term: &str) -> Option<TermId> {
        self.entries.get(term).map(|e| e.term_id)
    }

    /// Total distinct document ids ever inserted.
    pub fn document_count(&self) -> u32 {
        self.doc_ids.len() as u32
    }

    pub fn term_count(&self) -> usize {
        self.entries.len()
    }

    pub fn has_document(&self, doc_id: DocId) -> bool {
        self.doc_ids.contains(&doc_id)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &IndexEntry)> {
        self.entries.iter().map(|(term, entry)| (term.as_str(), entry))
    }
}
