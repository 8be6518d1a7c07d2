//! Error type shared by every stage of a run.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building, resolving or persisting control mappings.
///
/// Malformed range notation and empty cells never surface here: both
/// are recovered from locally and never reach the caller.
#[derive(Debug, Error)]
pub enum CrossmapError {
    /// A standard name that is not part of the relationship set.
    #[error("unknown standard: '{0}'")]
    InvalidStandard(String),

    /// A standard paired with itself.
    #[error("cannot pair standard '{0}' with itself")]
    InvalidPairing(String),

    /// A `Pattern` cell format whose expression does not compile.
    #[error("invalid pattern for column '{column}': {source}")]
    InvalidPattern {
        column: String,
        #[source]
        source: regex::Error,
    },

    /// A tabular file whose header cannot describe a standard pair.
    #[error("invalid header in {}: {reason}", path.display())]
    InvalidHeader { path: PathBuf, reason: String },

    /// Input rows that cannot be read as rows at all.
    #[error("invalid input in {}: {reason}", path.display())]
    InvalidInput { path: PathBuf, reason: String },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl CrossmapError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = CrossmapError> = std::result::Result<T, E>;
