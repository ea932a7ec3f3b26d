//! Index error types.

use thiserror::Error;

/// Errors surfaced by index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// No index data could be produced from any source: every tier failed
    /// and neither memory nor disk holds a usable snapshot.
    #[error("index unavailable: {reason}")]
    Unavailable { reason: String },

    /// Snapshot persistence failed (lock, serialize, or write).
    #[error("snapshot persistence failed: {0}")]
    Persistence(String),

    /// Snapshot file exists but cannot be decoded.
    #[error("snapshot corrupt: {0}")]
    Corrupt(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
