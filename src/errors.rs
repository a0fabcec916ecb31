//! Error taxonomy for the transfer engine.
//!
//! Tasks never propagate these past their own boundary: each one is caught,
//! translated into a [`crate::printer::PrintTask`], and — where it would leave
//! a peer waiting forever — used to cancel the file's [`crate::part_context::PartContext`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{actual} bytes read, but total bytes expected is {expected}")]
    IncompleteRead { actual: u64, expected: u64 },

    #[error("checksum mismatch for {0}")]
    Md5Mismatch(String),

    #[error("maximum number of attempts exceeded: {0}")]
    RetriesExceeded(u32),

    #[error("download has been cancelled")]
    Cancelled,

    #[error("{0}")]
    Fatal(String),
}

impl EngineError {
    /// Transient failures are worth retrying; everything else is terminal for
    /// the task that observed it.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Network(e) => e.is_connect() || e.is_timeout(),
            EngineError::IncompleteRead { .. } => true,
            EngineError::Md5Mismatch(_) => true,
            _ => false,
        }
    }
}
