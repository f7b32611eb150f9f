//! Collection error types

use thiserror::Error;

use crate::data::cloudwatch::CloudWatchError;

use super::values::QueryIdError;

/// Errors signalled while collecting one scrape
///
/// None of these abort a scrape on their own: the orchestrator turns each one
/// into an error sample and keeps going where it can.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollectError {
    /// Catalog listing failed; nothing was collected
    #[error("Listing metrics {namespace}/{name} failed: {source}")]
    Catalog {
        namespace: String,
        name: String,
        #[source]
        source: CloudWatchError,
    },

    /// Value retrieval for one batch failed
    #[error("Fetching values for batch {batch} failed: {source}")]
    Batch {
        batch: usize,
        #[source]
        source: CloudWatchError,
    },

    #[error("Value batch is empty")]
    EmptyBatch,

    #[error("Value batch of {size} exceeds the limit of {max}")]
    BatchTooLarge { size: usize, max: usize },

    /// Upstream returned a different number of results than queries sent
    #[error("Expected {expected} results, got {actual}")]
    ResultCountMismatch { expected: usize, actual: usize },

    #[error("Invalid query id: {0}")]
    InvalidQueryId(#[from] QueryIdError),

    #[error("Query id n{0} returned more than once")]
    DuplicateQueryId(usize),

    /// A batch task panicked or was aborted
    #[error("Batch {batch} task failed: {message}")]
    TaskFailed { batch: usize, message: String },
}

impl CollectError {
    pub fn catalog(namespace: &str, name: &str, source: CloudWatchError) -> Self {
        Self::Catalog {
            namespace: namespace.to_string(),
            name: name.to_string(),
            source,
        }
    }

    /// Whether this error means the upstream broke its result contract
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::ResultCountMismatch { .. } | Self::InvalidQueryId(_) | Self::DuplicateQueryId(_)
        )
    }
}
