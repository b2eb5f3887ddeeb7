use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

lazy_static! {
    static ref WORD: Regex = Regex::new(r"(?u)\p{L}[\p{L}\p{N}_']*").expect("valid regex");
}

/// Which normalization steps run. Stored in the index meta file so the query
/// side always mirrors the configuration the documents were indexed with.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NormalizerConfig {
    pub stopword_removal: bool,
    pub accent_removal: bool,
    pub stemming: bool,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self { stopword_removal: true, accent_removal: true, stemming: true }
    }
}

/// Turns raw text into index terms: lowercase, accent folding via a fixed
/// substitution table, word tokenization, stop-word removal, Portuguese
/// Snowball stemming. Constructed once and passed by reference to the
/// indexer and the query runner.
pub struct TextNormalizer {
    config: NormalizerConfig,
    stop_words: HashSet<String>,
    stemmer: Stemmer,
}

/// Fixed single-character substitution table, not Unicode normalization.
pub fn fold_accents(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'á' | 'â' | 'ã' => 'a',
            'é' | 'ê' | 'ẽ' => 'e',
            'í' => 'i',
            'ó' | 'ô' | 'õ' => 'o',
            'ú' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

impl TextNormalizer {
    pub fn new(config: NormalizerConfig, stop_words: HashSet<String>) -> Self {
        Self {
            config,
            stop_words,
            stemmer: Stemmer::create(Algorithm::Portuguese),
        }
    }

    /// Loads the comma-separated UTF-8 stop-word file. A missing or
    /// unreadable file is fatal at startup.
    pub fn from_stop_words_file(config: NormalizerConfig, path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::StopWords {
            path: path.to_path_buf(),
            source,
        })?;
        let stop_words = contents
            .split(|c: char| c == ',' || c == '\n')
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect();
        Ok(Self::new(config, stop_words))
    }

    pub fn config(&self) -> NormalizerConfig {
        self.config
    }

    /// Normalizes raw text into terms, in original order, duplicates
    /// preserved. Counting happens downstream.
    pub fn normalize(&self, text: &str) -> Vec<String> {
        let mut lowered = text.to_lowercase();
        if self.config.accent_removal {
            lowered = fold_accents(&lowered);
        }
        let mut terms = Vec::new();
        for mat in WORD.find_iter(&lowered) {
            let token = mat.as_str();
            if self.config.stopword_removal && self.stop_words.contains(token) {
                continue;
            }
            let term = if self.config.stemming {
                self.stemmer.stem(token).to_string()
            } else {
                token.to_string()
            };
            if term.is_empty() {
                continue;
            }
            terms.push(term);
        }
        terms
    }
}
