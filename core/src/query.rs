use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use crate::error::IndexError;
use crate::index::{DocId, InvertedIndex, TermOccurrence};
use crate::normalizer::{fold_accents, TextNormalizer};
use crate::ranking::RankingModel;

/// Cutoffs reported by precision/recall evaluation.
pub const EVAL_CUTOFFS: [usize; 4] = [5, 10, 20, 50];

/// Precision and recall at one cutoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalPoint {
    pub cutoff: usize,
    pub precision: f64,
    pub recall: f64,
}

/// Orchestrates one query session: normalizes the query text with the same
/// normalizer the documents were indexed with, fetches postings, and
/// dispatches to the configured ranking model.
pub struct QueryRunner<'a> {
    index: &'a InvertedIndex,
    normalizer: &'a TextNormalizer,
    model: RankingModel<'a>,
}

impl<'a> QueryRunner<'a> {
    pub fn new(
        index: &'a InvertedIndex,
        normalizer: &'a TextNormalizer,
        model: RankingModel<'a>,
    ) -> Result<Self, IndexError> {
        if !index.is_finalized() {
            return Err(IndexError::NotFinalized);
        }
        Ok(Self { index, normalizer, model })
    }

    /// Maps each query term to its occurrence within the query (doc_id
    /// `None`, frequency = count in the query text). Terms the index has
    /// never seen are left out; they cannot contribute to any score.
    pub fn query_term_occurrences(&self, query: &str) -> HashMap<String, TermOccurrence> {
        let mut counts: HashMap<String, u32> = HashMap::new();
        for term in self.normalizer.normalize(query) {
            *counts.entry(term).or_insert(0) += 1;
        }
        counts
            .into_iter()
            .filter_map(|(term, frequency)| {
                self.index.term_id(&term).map(|term_id| {
                    let occurrence = TermOccurrence {
                        doc_id: None,
                        term_id,
                        term_frequency: frequency,
                    };
                    (term, occurrence)
                })
            })
            .collect()
    }

    /// Postings list per query term, empty for unknown terms. The empty
    /// lists matter: a boolean AND over an unknown term must return nothing.
    pub fn postings_per_term(&self, query: &str) -> HashMap<String, Vec<TermOccurrence>> {
        let mut map = HashMap::new();
        for term in self.normalizer.normalize(query) {
            if !map.contains_key(&term) {
                let postings = self.index.postings(&term).to_vec();
                map.insert(term, postings);
            }
        }
        map
    }

    pub fn answer(&self, query: &str) -> (Vec<DocId>, Option<HashMap<DocId, f64>>) {
        let occurrences = self.query_term_occurrences(query);
        let postings = self.postings_per_term(query);
        self.model.get_ordered_docs(&occurrences, &postings)
    }
}

/// precision@n = relevant-in-top-n / n, recall@n = relevant-in-top-n /
/// |relevant|, at each of `EVAL_CUTOFFS`.
pub fn evaluate(ranked: &[DocId], relevant: &HashSet<DocId>) -> Vec<EvalPoint> {
    EVAL_CUTOFFS
        .iter()
        .map(|&cutoff| {
            let hits = ranked
                .iter()
                .take(cutoff)
                .filter(|doc_id| relevant.contains(doc_id))
                .count();
            let recall = if relevant.is_empty() {
                0.0
            } else {
                hits as f64 / relevant.len() as f64
            };
            EvalPoint {
                cutoff,
                precision: hits as f64 / cutoff as f64,
                recall,
            }
        })
        .collect()
}

/// Canonical key for relevance-judgment lookup: lowercased, accent-folded,
/// non-alphanumeric runs collapsed to `_`. "São Paulo" and the file stem
/// `sao_paulo` both map to `sao_paulo`.
pub fn judgment_key(query: &str) -> String {
    fold_accents(&query.to_lowercase())
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Loads every `<name>.dat` file in `dir`: one line of comma-separated
/// relevant doc ids per named query. Malformed ids are fatal, matching the
/// startup policy for corpus files.
pub fn load_relevance_judgments(dir: &Path) -> Result<HashMap<String, HashSet<DocId>>> {
    let mut judgments = HashMap::new();
    for entry in fs::read_dir(dir).with_context(|| format!("reading judgment dir {}", dir.display()))? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("dat") {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else { continue };
        let line = fs::read_to_string(&path)
            .with_context(|| format!("reading judgment file {}", path.display()))?;
        let docs = line
            .trim()
            .split(',')
            .map(|id| {
                id.trim()
                    .parse::<DocId>()
                    .with_context(|| format!("bad doc id {id:?} in {}", path.display()))
            })
            .collect::<Result<HashSet<DocId>>>()?;
        judgments.insert(name.to_string(), docs);
    }
    tracing::debug!(queries = judgments.len(), "loaded relevance judgments");
    Ok(judgments)
}
