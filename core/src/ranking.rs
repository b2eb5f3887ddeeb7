use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use crate::index::{DocId, TermOccurrence};
use crate::stats::PrecomputedVals;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOperator {
    And,
    Or,
}

/// The closed set of ranking strategies. Boolean models need no corpus
/// statistics; the vector model borrows the precomputed norms.
pub enum RankingModel<'a> {
    Boolean(BooleanOperator),
    Vector(&'a PrecomputedVals),
}

/// Log-scaled term frequency, defined for frequency >= 1.
pub fn tf(frequency: u32) -> f64 {
    1.0 + f64::from(frequency).log2()
}

pub fn idf(doc_count: u32, docs_with_term: u32) -> f64 {
    (f64::from(doc_count) / f64::from(docs_with_term)).log2()
}

pub fn tf_idf(doc_count: u32, frequency: u32, docs_with_term: u32) -> f64 {
    tf(frequency) * idf(doc_count, docs_with_term)
}

impl RankingModel<'_> {
    /// Orders documents for one query. `query` maps each query term to its
    /// occurrence within the query text (doc_id `None`); `postings_per_term`
    /// maps every query term to its full postings list, empty for terms the
    /// index has never seen. Boolean models return no scores.
    pub fn get_ordered_docs(
        &self,
        query: &HashMap<String, TermOccurrence>,
        postings_per_term: &HashMap<String, Vec<TermOccurrence>>,
    ) -> (Vec<DocId>, Option<HashMap<DocId, f64>>) {
        match self {
            RankingModel::Boolean(op) => (boolean_docs(*op, postings_per_term), None),
            RankingModel::Vector(stats) => vector_docs(stats, query, postings_per_term),
        }
    }
}

/// Set algebra over the doc-id sets of each term's postings. An AND over any
/// term with an empty postings list yields the empty set. Output is doc_id
/// ascending, the deterministic rendering of a set.
fn boolean_docs(
    op: BooleanOperator,
    postings_per_term: &HashMap<String, Vec<TermOccurrence>>,
) -> Vec<DocId> {
    let mut result: Option<BTreeSet<DocId>> = None;
    for postings in postings_per_term.values() {
        let ids: BTreeSet<DocId> = postings.iter().filter_map(|p| p.doc_id).collect();
        result = Some(match (result, op) {
            (None, _) => ids,
            (Some(acc), BooleanOperator::And) => acc.intersection(&ids).copied().collect(),
            (Some(acc), BooleanOperator::Or) => acc.union(&ids).copied().collect(),
        });
    }
    result.unwrap_or_default().into_iter().collect()
}

/// Cosine-similarity scoring: each term shared between the query and a
/// document contributes (w_doc * w_query) / norm(doc). Terms absent from the
/// index have empty postings and contribute nothing. A zero norm only occurs
/// when every weight in the document is zero (idf 0), so the contribution is
/// an exact 0.0 rather than a division.
fn vector_docs(
    stats: &PrecomputedVals,
    query: &HashMap<String, TermOccurrence>,
    postings_per_term: &HashMap<String, Vec<TermOccurrence>>,
) -> (Vec<DocId>, Option<HashMap<DocId, f64>>) {
    let mut scores: HashMap<DocId, f64> = HashMap::new();
    for (term, postings) in postings_per_term {
        let Some(query_occurrence) = query.get(term) else { continue };
        if postings.is_empty() {
            continue;
        }
        let docs_with_term = postings.len() as u32;
        let w_query = tf_idf(stats.doc_count, query_occurrence.term_frequency, docs_with_term);
        for occurrence in postings {
            let Some(doc_id) = occurrence.doc_id else { continue };
            let w_doc = tf_idf(stats.doc_count, occurrence.term_frequency, docs_with_term);
            let norm = stats.norm(doc_id);
            let contribution = if norm > 0.0 {
                (w_doc * w_query) / norm
            } else {
                0.0
            };
            *scores.entry(doc_id).or_insert(0.0) += contribution;
        }
    }
    let ranked = rank_document_ids(&scores);
    (ranked, Some(scores))
}

/// Score descending; ties broken by doc_id ascending so rankings are
/// deterministic.
fn rank_document_ids(scores: &HashMap<DocId, f64>) -> Vec<DocId> {
    let mut doc_ids: Vec<DocId> = scores.keys().copied().collect();
    doc_ids.sort_by(|a, b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.cmp(b))
    });
    doc_ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::InvertedIndex;

    fn query_occurrence(term_id: u32, frequency: u32) -> TermOccurrence {
        TermOccurrence { doc_id: None, term_id, term_frequency: frequency }
    }

    fn postings_map(index: &InvertedIndex, terms: &[&str]) -> HashMap<String, Vec<TermOccurrence>> {
        terms
            .iter()
            .map(|t| (t.to_string(), index.postings(t).to_vec()))
            .collect()
    }

    fn small_index() -> InvertedIndex {
        let mut idx = InvertedIndex::new();
        idx.insert("casa", 1, 2).unwrap();
        idx.insert("casa", 2, 1).unwrap();
        idx.insert("carro", 2, 1).unwrap();
        idx.insert("carro", 3, 3).unwrap();
        idx.insert("rua", 3, 1).unwrap();
        idx.finalize();
        idx
    }

    #[test]
    fn boolean_and_intersects() {
        let idx = small_index();
        let postings = postings_map(&idx, &["casa", "carro"]);
        let model = RankingModel::Boolean(BooleanOperator::And);
        let (docs, scores) = model.get_ordered_docs(&HashMap::new(), &postings);
        assert_eq!(docs, vec![2]);
        assert!(scores.is_none());
    }

    #[test]
    fn boolean_or_unions() {
        let idx = small_index();
        let postings = postings_map(&idx, &["casa", "carro"]);
        let model = RankingModel::Boolean(BooleanOperator::Or);
        let (docs, _) = model.get_ordered_docs(&HashMap::new(), &postings);
        assert_eq!(docs, vec![1, 2, 3]);
    }

    #[test]
    fn boolean_and_with_unknown_term_is_empty() {
        let idx = small_index();
        let postings = postings_map(&idx, &["casa", "bicicleta"]);
        let model = RankingModel::Boolean(BooleanOperator::And);
        let (docs, _) = model.get_ordered_docs(&HashMap::new(), &postings);
        assert!(docs.is_empty());
    }

    #[test]
    fn boolean_or_ignores_unknown_terms() {
        let idx = small_index();
        let postings = postings_map(&idx, &["casa", "bicicleta"]);
        let model = RankingModel::Boolean(BooleanOperator::Or);
        let (docs, _) = model.get_ordered_docs(&HashMap::new(), &postings);
        assert_eq!(docs, vec![1, 2]);
    }

    #[test]
    fn tf_idf_values() {
        assert_eq!(tf(1), 1.0);
        assert_eq!(tf(2), 2.0);
        assert_eq!(idf(4, 1), 2.0);
        assert_eq!(idf(4, 4), 0.0);
        assert_eq!(tf_idf(4, 2, 1), 4.0);
    }

    #[test]
    fn vector_ranks_by_descending_score() {
        let idx = small_index();
        let stats = PrecomputedVals::compute(&idx).unwrap();
        let model = RankingModel::Vector(&stats);
        let mut query = HashMap::new();
        query.insert("carro".to_string(), query_occurrence(1, 1));
        let postings = postings_map(&idx, &["carro"]);
        let (docs, scores) = model.get_ordered_docs(&query, &postings);
        let scores = scores.unwrap();
        assert_eq!(docs.len(), 2);
        assert!(scores[&docs[0]] >= scores[&docs[1]]);
        // Only documents containing the term appear.
        assert!(!scores.contains_key(&1));
    }

    #[test]
    fn vector_score_is_order_independent() {
        let idx = small_index();
        let stats = PrecomputedVals::compute(&idx).unwrap();
        let model = RankingModel::Vector(&stats);

        let mut query = HashMap::new();
        query.insert("casa".to_string(), query_occurrence(0, 1));
        query.insert("carro".to_string(), query_occurrence(1, 2));
        let postings = postings_map(&idx, &["casa", "carro"]);
        let (_, scores_a) = model.get_ordered_docs(&query, &postings);

        // Same terms presented through a freshly built map: identical scores.
        let mut query_rev = HashMap::new();
        query_rev.insert("carro".to_string(), query_occurrence(1, 2));
        query_rev.insert("casa".to_string(), query_occurrence(0, 1));
        let (_, scores_b) = model.get_ordered_docs(&query_rev, &postings);

        let scores_a = scores_a.unwrap();
        let scores_b = scores_b.unwrap();
        assert_eq!(scores_a.len(), scores_b.len());
        for (doc_id, score) in &scores_a {
            assert!((score - scores_b[doc_id]).abs() < 1e-12);
        }
    }

    #[test]
    fn single_document_index_scores_exactly_zero() {
        // idf = log2(1/1) = 0, so the lone document's weight and norm are
        // both zero and no division can occur.
        let mut idx = InvertedIndex::new();
        idx.insert("casa", 1, 9).unwrap();
        idx.finalize();
        let stats = PrecomputedVals::compute(&idx).unwrap();
        let model = RankingModel::Vector(&stats);

        let mut query = HashMap::new();
        query.insert("casa".to_string(), query_occurrence(0, 1));
        let postings = postings_map(&idx, &["casa"]);
        let (docs, scores) = model.get_ordered_docs(&query, &postings);
        assert_eq!(docs, vec![1]);
        assert_eq!(scores.unwrap()[&1], 0.0);
    }

    #[test]
    fn vector_ties_break_by_doc_id_ascending() {
        // Two documents with identical postings score identically.
        let mut idx = InvertedIndex::new();
        idx.insert("casa", 5, 1).unwrap();
        idx.insert("casa", 2, 1).unwrap();
        idx.insert("carro", 9, 1).unwrap();
        idx.finalize();
        let stats = PrecomputedVals::compute(&idx).unwrap();
        let model = RankingModel::Vector(&stats);

        let mut query = HashMap::new();
        query.insert("casa".to_string(), query_occurrence(0, 1));
        let postings = postings_map(&idx, &["casa"]);
        let (docs, _) = model.get_ordered_docs(&query, &postings);
        assert_eq!(docs, vec![2, 5]);
    }
}
