//! The shared document
//!
//! A Document keeps two views of its committed operations:
//!
//! - `ops`: the surviving insert spans, sorted by index and expressed in
//!   current document coordinates. Replaying them in order from an empty
//!   text reproduces the content.
//! - `history`: every committed operation in commit order. Incoming
//!   operations are transformed against the part of the history their
//!   author had not seen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::clock::AuthorClock;
use super::operation::{CommittedOp, Edit, OpId, Operation, Version};

/// Identifier under which a document is persisted
pub type DocumentId = String;

/// Identifier of the single document served by a deployment
pub const DEFAULT_DOCUMENT_ID: &str = "shared";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub(super) id: DocumentId,
    pub(super) ops: Vec<Operation>,
    pub(super) version: Version,
    pub(super) history: Vec<CommittedOp>,
    pub(super) authors: AuthorClock,
    pub(super) updated_at: DateTime<Utc>,
}

impl Document {
    /// Create an empty document
    pub fn new(id: impl Into<DocumentId>) -> Self {
        Self {
            id: id.into(),
            ops: Vec::new(),
            version: 0,
            history: Vec::new(),
            authors: AuthorClock::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Surviving insert spans in document order
    pub fn ops(&self) -> &[Operation] {
        &self.ops
    }

    pub fn history(&self) -> &[CommittedOp] {
        &self.history
    }

    pub fn authors(&self) -> &AuthorClock {
        &self.authors
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Operations committed after `version`, in commit order
    pub fn since(&self, version: Version) -> &[CommittedOp] {
        let start = (version as usize).min(self.history.len());
        &self.history[start..]
    }

    /// Current content length in characters
    pub fn len(&self) -> usize {
        self.ops.iter().map(Operation::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Content length as it was at `version`, or `None` for a version the
    /// document has not reached yet.
    pub fn length_at(&self, version: Version) -> Option<usize> {
        if version > self.version {
            return None;
        }
        let undone: isize = self.since(version).iter().map(|c| c.op.delta()).sum();
        Some((self.len() as isize - undone) as usize)
    }

    /// Record an operation id that produced no commit, so the author's ids
    /// stay monotonic. Unlike commits this is not in the history, and is
    /// lost unless the document is saved afterwards.
    pub fn observe_author(&mut self, author: &str, id: OpId) {
        self.authors.observe(author, id);
    }

    /// The text content
    pub fn text(&self) -> String {
        let mut text = String::new();
        for span in &self.ops {
            if let Edit::Insert { text: piece } = &span.edit {
                text.push_str(piece);
            }
        }
        text
    }
}
