use thiserror::Error;

use crate::ot::OperationError;
use crate::storage::StoreError;

#[derive(Error, Debug)]
pub enum SequencerError {
    #[error("Invalid operation: {0}")]
    Invalid(#[from] OperationError),

    #[error("Pending queue is full, retry later")]
    QueueFull,

    #[error("Persistence failed after {attempts} attempts: {source}")]
    Persistence {
        attempts: u32,
        #[source]
        source: StoreError,
    },

    #[error("Sequencer has shut down")]
    Closed,
}

impl SequencerError {
    /// Whether resubmitting the same operation later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SequencerError::QueueFull | SequencerError::Persistence { .. }
        )
    }
}
