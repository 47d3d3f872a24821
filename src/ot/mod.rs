//! Operational transformation engine
//!
//! Plain data and pure functions: operations, the document they build,
//! the pairwise transform rules and the applier. Nothing in here does I/O
//! or locking; the sequencer owns ordering.

pub mod apply;
mod clock;
mod document;
mod error;
mod operation;
pub mod transform;

pub use apply::{apply_to_text, commit};
pub use clock::{AuthorClock, AuthorId};
pub use document::{Document, DocumentId, DEFAULT_DOCUMENT_ID};
pub use error::OperationError;
pub use operation::{CommittedOp, Edit, OpId, Operation, Submission, Version};
pub use transform::{transform, transform_seq, Transformed};
