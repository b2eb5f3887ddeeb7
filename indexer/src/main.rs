use anyhow::Result;
use buscador_core::error::ConfigError;
use buscador_core::normalizer::{NormalizerConfig, TextNormalizer};
use buscador_core::persist::{save_index, save_meta, IndexPaths, MetaFile};
use buscador_core::{DocId, InvertedIndex};
use clap::{Parser, Subcommand};
use scraper::Html;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build an inverted index from an HTML corpus", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index every HTML document under the corpus root
    Build {
        /// Corpus root: subdirectories of files named <doc_id>.<ext>
        #[arg(long)]
        corpus: PathBuf,
        /// Comma-separated UTF-8 stop-word file
        #[arg(long)]
        stopwords: PathBuf,
        /// Output index directory
        #[arg(long)]
        output: PathBuf,
        /// Keep stop words as index terms
        #[arg(long, default_value_t = false)]
        no_stopword_removal: bool,
        /// Keep accented characters as-is
        #[arg(long, default_value_t = false)]
        no_accent_removal: bool,
        /// Index surface forms instead of Portuguese stems
        #[arg(long, default_value_t = false)]
        no_stemming: bool,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            corpus,
            stopwords,
            output,
            no_stopword_removal,
            no_accent_removal,
            no_stemming,
        } => {
            let config = NormalizerConfig {
                stopword_removal: !no_stopword_removal,
                accent_removal: !no_accent_removal,
                stemming: !no_stemming,
            };
            build(&corpus, &stopwords, &output, config)
        }
    }
}

fn build(corpus: &Path, stopwords: &Path, output: &Path, config: NormalizerConfig) -> Result<()> {
    let normalizer = TextNormalizer::from_stop_words_file(config, stopwords)?;
    let mut index = InvertedIndex::new();

    let mut indexer = Indexer::new(&normalizer, &mut index);
    indexer.index_corpus(corpus)?;
    let (indexed, skipped) = (indexer.indexed, indexer.skipped);
    tracing::info!(
        indexed,
        skipped,
        num_docs = index.document_count(),
        num_terms = index.term_count(),
        "corpus indexed"
    );

    let paths = IndexPaths::new(output);
    save_index(&paths, &index)?;
    let meta = MetaFile {
        num_docs: index.document_count(),
        num_terms: index.term_count() as u64,
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "".into()),
        version: 1,
        normalizer: config,
    };
    save_meta(&paths, &meta)?;

    tracing::info!(output = %output.display(), "index build complete");
    Ok(())
}

/// Walks the corpus, extracts plain text from each HTML document, and feeds
/// per-document term counts into the index. Owns the only mutable handle on
/// the index until finalize.
struct Indexer<'a> {
    normalizer: &'a TextNormalizer,
    index: &'a mut InvertedIndex,
    indexed: usize,
    skipped: usize,
}

impl<'a> Indexer<'a> {
    fn new(normalizer: &'a TextNormalizer, index: &'a mut InvertedIndex) -> Self {
        Self { normalizer, index, indexed: 0, skipped: 0 }
    }

    /// One insert per distinct term in the document, carrying its in-document
    /// frequency.
    fn index_document(&mut self, doc_id: DocId, html: &str) -> Result<()> {
        let plain_text = html_to_plain_text(html);
        let mut counts: HashMap<String, u32> = HashMap::new();
        for term in self.normalizer.normalize(&plain_text) {
            *counts.entry(term).or_insert(0) += 1;
        }
        for (term, count) in counts {
            self.index.insert(&term, doc_id, count)?;
        }
        Ok(())
    }

    /// Indexes every file under `root` and finalizes the index exactly once.
    /// A file whose stem is not an integer doc id is a fatal corpus error;
    /// a file whose bytes are not valid UTF-8 is skipped with a warning.
    fn index_corpus(&mut self, root: &Path) -> Result<()> {
        if !root.is_dir() {
            return Err(ConfigError::BadCorpusRoot(root.to_path_buf()).into());
        }
        for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let doc_id = doc_id_from_path(path)?;
            let bytes = fs::read(path)?;
            match String::from_utf8(bytes) {
                Ok(html) => {
                    self.index_document(doc_id, &html)?;
                    self.indexed += 1;
                }
                Err(_) => {
                    tracing::warn!(path = %path.display(), doc_id, "skipping undecodable document");
                    self.skipped += 1;
                }
            }
        }
        self.index.finalize();
        Ok(())
    }
}

fn doc_id_from_path(path: &Path) -> Result<DocId, ConfigError> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(|stem| stem.parse().ok())
        .ok_or_else(|| ConfigError::BadDocumentName(path.to_path_buf()))
}

fn html_to_plain_text(html: &str) -> String {
    let document = Html::parse_document(html);
    document.root_element().text().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::tempdir;

    fn normalizer(config: NormalizerConfig) -> TextNormalizer {
        TextNormalizer::new(config, HashSet::new())
    }

    fn raw_config() -> NormalizerConfig {
        NormalizerConfig { stopword_removal: false, accent_removal: true, stemming: false }
    }

    #[test]
    fn parses_doc_id_from_file_stem() {
        assert_eq!(doc_id_from_path(Path::new("corpus/sub/105047.html")).unwrap(), 105047);
        assert!(doc_id_from_path(Path::new("corpus/sub/readme.html")).is_err());
    }

    #[test]
    fn extracts_plain_text_from_markup() {
        let text = html_to_plain_text("<html><body><h1>Casa</h1><p>carro e rua</p></body></html>");
        let terms = normalizer(raw_config()).normalize(&text);
        assert_eq!(terms, vec!["casa", "carro", "e", "rua"]);
    }

    #[test]
    fn counts_term_frequencies_within_one_document() {
        let n = normalizer(raw_config());
        let mut index = InvertedIndex::new();
        let mut indexer = Indexer::new(&n, &mut index);
        indexer
            .index_document(3, "<html><body>casa casa carro</body></html>")
            .unwrap();

        let casa = index.postings("casa");
        assert_eq!(casa.len(), 1);
        assert_eq!(casa[0].doc_id, Some(3));
        assert_eq!(casa[0].term_frequency, 2);
        let carro = index.postings("carro");
        assert_eq!(carro[0].term_frequency, 1);
    }

    #[test]
    fn indexes_a_corpus_directory_and_finalizes() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("0001");
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join("1.html"), "<html><body>casa carro</body></html>").unwrap();
        fs::write(sub.join("2.html"), "<html><body>casa rua</body></html>").unwrap();

        let n = normalizer(raw_config());
        let mut index = InvertedIndex::new();
        let mut indexer = Indexer::new(&n, &mut index);
        indexer.index_corpus(dir.path()).unwrap();

        assert_eq!(indexer.indexed, 2);
        assert!(index.is_finalized());
        assert_eq!(index.document_count(), 2);
        assert_eq!(index.postings("casa").len(), 2);
        assert_eq!(index.postings("carro").len(), 1);
    }

    #[test]
    fn skips_undecodable_documents() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("0001");
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join("1.html"), "<html><body>casa</body></html>").unwrap();
        fs::write(sub.join("2.html"), [0xff, 0xfe, 0x00, 0x9f]).unwrap();

        let n = normalizer(raw_config());
        let mut index = InvertedIndex::new();
        let mut indexer = Indexer::new(&n, &mut index);
        indexer.index_corpus(dir.path()).unwrap();

        assert_eq!(indexer.indexed, 1);
        assert_eq!(indexer.skipped, 1);
        assert_eq!(index.document_count(), 1);
    }

    #[test]
    fn non_integer_file_stem_is_fatal() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("0001");
        fs::create_dir_all(&sub).unwrap();
        fs::write(sub.join("notes.html"), "<html></html>").unwrap();

        let n = normalizer(raw_config());
        let mut index = InvertedIndex::new();
        let mut indexer = Indexer::new(&n, &mut index);
        assert!(indexer.index_corpus(dir.path()).is_err());
    }
}
