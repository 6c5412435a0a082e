//! Error types for upstream fetches and snapshot storage.
//!
//! Fetch errors never abort a run: the resolver treats them as a failed
//! strategy and moves on. Store errors are fatal to the driver.

use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single upstream call.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("transport error for {url}: {message}")]
    Transport {
        url: String,
        message: String,
        timed_out: bool,
    },

    #[error("unexpected response from {url}: {detail}")]
    Malformed { url: String, detail: String },
}

impl FetchError {
    /// Whether repeating the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Status { status, .. } => {
                matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
            }
            FetchError::Transport { timed_out, .. } => *timed_out,
            FetchError::Malformed { .. } => false,
        }
    }
}

/// Failure to read or write a snapshot or chart file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("snapshot {} exists but holds no records", .0.display())]
    EmptySnapshot(PathBuf),

    #[error("snapshot {} does not exist", .0.display())]
    MissingSnapshot(PathBuf),

    #[error("invalid value in {}: {detail}", path.display())]
    InvalidRow { path: PathBuf, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_statuses() {
        let status = |status| FetchError::Status {
            status,
            url: "https://api.genius.com/search".to_string(),
        };
        assert!(status(429).is_transient());
        assert!(status(503).is_transient());
        assert!(!status(404).is_transient());
        assert!(!status(401).is_transient());
    }

    #[test]
    fn test_transport_timeout_is_transient() {
        let err = FetchError::Transport {
            url: "u".to_string(),
            message: "timed out reading response".to_string(),
            timed_out: true,
        };
        assert!(err.is_transient());
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_malformed_is_not_transient() {
        let err = FetchError::Malformed {
            url: "u".to_string(),
            detail: "missing field `hits`".to_string(),
        };
        assert!(!err.is_transient());
    }
}
