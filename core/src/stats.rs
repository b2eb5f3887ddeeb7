use std::collections::HashMap;

use crate::error::IndexError;
use crate::index::{DocId, InvertedIndex};
use crate::ranking;

/// Per-document TF-IDF vector norms plus the corpus document count, derived
/// once from a finalized index. This is the expensive part of query startup;
/// callers compute it once per index generation and reuse it.
#[derive(Debug, Clone)]
pub struct PrecomputedVals {
    pub doc_count: u32,
    pub document_norm: HashMap<DocId, f64>,
}

impl PrecomputedVals {
    /// norm(d) = sqrt(sum over terms t in d of tfidf(t, d)^2).
    ///
    /// Implemented as one pass over all postings, grouping the squared
    /// weights per document. Same result as scanning every term's postings
    /// once per document, without the quadratic blowup.
    pub fn compute(index: &InvertedIndex) -> Result<Self, IndexError> {
        if !index.is_finalized() {
            return Err(IndexError::NotFinalized);
        }
        let doc_count = index.document_count();
        let mut squared_sums: HashMap<DocId, f64> = HashMap::new();
        for (_term, entry) in index.entries() {
            for occurrence in &entry.postings {
                let Some(doc_id) = occurrence.doc_id else { continue };
                let w = ranking::tf_idf(
                    doc_count,
                    occurrence.term_frequency,
                    entry.doc_count_with_term,
                );
                *squared_sums.entry(doc_id).or_insert(0.0) += w * w;
            }
        }
        let document_norm: HashMap<DocId, f64> = squared_sums
            .into_iter()
            .map(|(doc_id, sum)| (doc_id, sum.sqrt()))
            .collect();
        tracing::debug!(doc_count, norms = document_norm.len(), "precomputed document norms");
        Ok(Self { doc_count, document_norm })
    }

    /// Zero for documents with no indexed terms.
    pub fn norm(&self, doc_id: DocId) -> f64 {
        self.document_norm.get(&doc_id).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_a_finalized_index() {
        let idx = InvertedIndex::new();
        assert!(matches!(
            PrecomputedVals::compute(&idx),
            Err(IndexError::NotFinalized)
        ));
    }

    #[test]
    fn norm_matches_hand_computed_weights() {
        // Two documents: "casa" in both, "carro" only in doc 1 (freq 2).
        let mut idx = InvertedIndex::new();
        idx.insert("casa", 1, 1).unwrap();
        idx.insert("casa", 2, 1).unwrap();
        idx.insert("carro", 1, 2).unwrap();
        idx.finalize();

        let stats = PrecomputedVals::compute(&idx).unwrap();
        assert_eq!(stats.doc_count, 2);

        // casa: idf = log2(2/2) = 0, so it contributes nothing.
        // carro in doc 1: tf = 1 + log2(2) = 2, idf = log2(2/1) = 1, w = 2.
        assert!((stats.norm(1) - 2.0).abs() < 1e-9);
        assert!(stats.norm(2).abs() < 1e-9);
    }

    #[test]
    fn norm_is_zero_for_unknown_documents() {
        let mut idx = InvertedIndex::new();
        idx.insert("casa", 1, 1).unwrap();
        idx.finalize();
        let stats = PrecomputedVals::compute(&idx).unwrap();
        assert_eq!(stats.norm(42), 0.0);
    }
}
