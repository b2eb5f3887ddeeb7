use anyhow::{bail, Context, Result};
use buscador_core::normalizer::TextNormalizer;
use buscador_core::persist::{load_index, load_meta, IndexPaths};
use buscador_core::query::{evaluate, judgment_key, load_relevance_judgments, QueryRunner};
use buscador_core::ranking::{BooleanOperator, RankingModel};
use buscador_core::stats::PrecomputedVals;
use clap::{Parser, ValueEnum};
use tracing_subscriber::{fmt, EnvFilter};

use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Model {
    Boolean,
    Vector,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Operator {
    And,
    Or,
}

#[derive(Parser)]
#[command(name = "query")]
#[command(about = "Answer a free-text query against a built index", long_about = None)]
struct Cli {
    /// Index directory written by the indexer
    #[arg(long, default_value = "./index")]
    index: PathBuf,
    /// Comma-separated UTF-8 stop-word file (same one used at index time)
    #[arg(long)]
    stopwords: PathBuf,
    /// Ranking model
    #[arg(long, value_enum, default_value_t = Model::Vector)]
    model: Model,
    /// Boolean operator between query terms (boolean model only)
    #[arg(long, value_enum, default_value_t = Operator::Or)]
    operator: Operator,
    /// Directory of <name>.dat relevance-judgment files
    #[arg(long)]
    judgments: Option<PathBuf>,
    /// Free-text query
    query: Vec<String>,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    let query_text = cli.query.join(" ");
    if query_text.trim().is_empty() {
        bail!("empty query");
    }

    let paths = IndexPaths::new(&cli.index);
    let index = load_index(&paths)
        .with_context(|| format!("loading index from {}", cli.index.display()))?;
    let meta = load_meta(&paths)?;
    // Query-side normalization mirrors the configuration the index was
    // built with, stored in the meta file.
    let normalizer = TextNormalizer::from_stop_words_file(meta.normalizer, &cli.stopwords)?;

    let stats;
    let model = match cli.model {
        Model::Vector => {
            // The expensive part of query startup, computed once per session.
            stats = PrecomputedVals::compute(&index)?;
            tracing::info!(num_docs = stats.doc_count, "precomputed document norms");
            RankingModel::Vector(&stats)
        }
        Model::Boolean => RankingModel::Boolean(match cli.operator {
            Operator::And => BooleanOperator::And,
            Operator::Or => BooleanOperator::Or,
        }),
    };

    let runner = QueryRunner::new(&index, &normalizer, model)?;
    let (ranked, scores) = runner.answer(&query_text);
    tracing::info!(query = %query_text, hits = ranked.len(), "query answered");

    println!("Top 10 answers:");
    for (rank, doc_id) in ranked.iter().take(10).enumerate() {
        match &scores {
            Some(scores) => println!("{:2}. doc {:>8}  score {:.4}", rank + 1, doc_id, scores[doc_id]),
            None => println!("{:2}. doc {:>8}", rank + 1, doc_id),
        }
    }

    if let Some(dir) = &cli.judgments {
        let judgments = load_relevance_judgments(dir)?;
        if let Some(relevant) = judgments.get(&judgment_key(&query_text)) {
            for point in evaluate(&ranked, relevant) {
                println!(
                    "precision@{:<2} {:.3}  recall@{:<2} {:.3}",
                    point.cutoff, point.precision, point.cutoff, point.recall
                );
            }
        }
    }

    Ok(())
}
