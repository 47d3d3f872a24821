use thiserror::Error;

use super::clock::AuthorId;
use super::operation::{OpId, Version};

/// Rejections of client input. The document is never touched when one of
/// these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    #[error("Insert must carry non-empty text")]
    EmptyInsert,

    #[error("Delete length must be positive")]
    EmptyDelete,

    #[error("Range {index}..{end} is outside a document of length {len}")]
    OutOfRange { index: usize, end: usize, len: usize },

    #[error("Base version {base} is ahead of document version {current}")]
    FutureBase { base: Version, current: Version },

    #[error("Operation id {id} from {author} is not newer than {last}")]
    StaleId { author: AuthorId, id: OpId, last: OpId },

    #[error("No operation ids left for {author}")]
    IdExhausted { author: AuthorId },
}
