use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a run.
///
/// Per-citation lookup failures are not in here: they are logged and the
/// citation is recorded without a DOI (see [`LookupError`]).
#[derive(Debug, Error)]
pub enum CiteError {
    #[error("Report file not found: {}", .0.display())]
    ReportNotFound(PathBuf),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse report {}: {source}", .path.display())]
    ReportParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] LookupError),
}

/// Outcome of a single failed lookup request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// HTTP 429; the only failure that is retried.
    #[error("rate limited")]
    RateLimited,

    #[error("HTTP {0} error")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to decode response: {0}")]
    Decode(String),
}

pub type Result<T, E = CiteError> = std::result::Result<T, E>;
