use std::path::PathBuf;
use thiserror::Error;

/// Index lifecycle violations. These are programming errors on the caller's
/// side and should surface loudly rather than be absorbed.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("insert rejected: index is already finalized")]
    Finalized,
    #[error("index must be finalized before query-time use")]
    NotFinalized,
}

/// Startup configuration problems. All of these are fatal before any
/// indexing or querying begins.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read stop-word file {path}")]
    StopWords {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corpus root {0} is not a directory")]
    BadCorpusRoot(PathBuf),
    #[error("corpus file {0} does not have an integer document id as its stem")]
    BadDocumentName(PathBuf),
}
