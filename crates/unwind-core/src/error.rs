use std::path::PathBuf;

use thiserror::Error;

/// Canonical result for unwind crates.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Growing the entry list failed. There is no cleanup path for a failure
    /// inside the cleanup mechanism, so only `try_reserve` reports it.
    #[error("cannot reserve {additional} more entries ({tracked} already tracked)")]
    Reserve { additional: usize, tracked: usize },

    #[error("cannot open trace file '{}': {source}", path.display())]
    TraceOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("trace encoding error: {0}")]
    Encode(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Encode(e.to_string())
    }
}
