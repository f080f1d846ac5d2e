//! Crate-level error type and store error classification.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LoadError>;

/// Fatal errors that abort a load run.
///
/// Per-record problems (unmappable rows, constraint violations) never
/// surface here; they are aggregated into the run report instead.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The source file could not be opened or its header row read.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    /// Store failure outside any chunk (connect, ping, session setup).
    #[error("store error: {0}")]
    Store(#[from] neo4rs::Error),
    /// A uniqueness constraint could not be ensured for a reason other
    /// than it already existing. Ingesting without the constraint risks
    /// silent duplication, so this aborts startup.
    #[error("constraint setup failed for {constraint}: {source}")]
    Setup {
        /// Constraint name that failed to apply.
        constraint: String,
        /// Underlying store error.
        #[source]
        source: neo4rs::Error,
    },
    /// A chunk transaction could not be started or committed. Previously
    /// committed chunks remain persisted; the run stops here.
    #[error("chunk {chunk} transaction failed: {source}")]
    ChunkCommit {
        /// Zero-based index of the failing chunk.
        chunk: usize,
        /// Underlying store error.
        #[source]
        source: neo4rs::Error,
    },
    /// A parallel chunk worker panicked or was cancelled.
    #[error("chunk worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
    /// Invalid configuration or command-line input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// True when the store reported a client-side failure (bad data,
/// constraint violation). These are per-record conditions: the offending
/// record is skipped and the run continues. Anything else (connection
/// loss, protocol errors) is fatal.
pub fn is_client_error(err: &neo4rs::Error) -> bool {
    matches!(err, neo4rs::Error::Neo4j(_))
}

/// True when constraint creation failed only because an equivalent
/// constraint already exists. Reported, not fatal.
pub fn is_already_exists(err: &neo4rs::Error) -> bool {
    match err {
        neo4rs::Error::Neo4j(e) => e.code().ends_with("AlreadyExists"),
        _ => false,
    }
}
