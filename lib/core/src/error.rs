use std::path::PathBuf;
use thiserror::Error;

use crate::ranking::ScoreOrder;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Index file not found: {}", .0.display())]
    IndexNotFound(PathBuf),

    #[error("Index mismatch: {embeddings} embedding rows but {ids} item ids")]
    IndexMismatch { embeddings: usize, ids: usize },

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Item already exists: {0}")]
    DuplicateItem(String),

    #[error("Score order mismatch: expected {expected:?} ranking, got {actual:?}")]
    ScoreOrderMismatch { expected: ScoreOrder, actual: ScoreOrder },

    #[error("Scene too large: {candidates} candidate scenes exceeds limit of {limit}")]
    SceneTooLarge { candidates: u128, limit: usize },

    /// The collaborator asked us to back off; the request may be retried later.
    #[error("Rate limited by collaborator: {0}")]
    RateLimited(String),

    #[error("Collaborator error: {0}")]
    Collaborator(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Whether the request layer should back off and retry.
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::RateLimited(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_rate_limit_is_retryable() {
        assert!(Error::RateLimited("slow down".into()).is_retryable());
        assert!(!Error::Collaborator("boom".into()).is_retryable());
        assert!(!Error::ItemNotFound("x".into()).is_retryable());
    }

    #[test]
    fn test_index_not_found_names_file() {
        let err = Error::IndexNotFound(PathBuf::from("/tmp/terms.json"));
        assert!(err.to_string().contains("terms.json"));
    }
}
