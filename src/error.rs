use std::path::PathBuf;

use thiserror::Error;

/// Error kinds per the failure semantics of the build/merge/query
/// pipeline. Local recovery is confined to query-time absent-term
/// lookups, which are not represented here (they return an empty
/// posting list rather than an error).
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("corrupt input at {path}: {reason}")]
    CorruptInput { path: PathBuf, reason: String },

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("resource precondition failed: {0}")]
    ResourcePrecondition(String),

    #[error("missing index artifact: {0}")]
    MissingArtifact(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
