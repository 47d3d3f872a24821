//! Insert and delete operations on a shared text

use serde::{Deserialize, Serialize};

use super::clock::AuthorId;
use super::error::OperationError;

/// Per-author operation identifier
pub type OpId = u64;

/// Number of operations committed to a document
pub type Version = u64;

/// What an operation does at its index
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Edit {
    /// Insert `text` before the character at `index`
    Insert { text: String },

    /// Remove `length` characters starting at `index`
    Delete { length: usize },
}

/// One edit to the document, positioned in document coordinates.
///
/// Indices and lengths count Unicode scalar values, not bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: OpId,
    pub author_id: AuthorId,
    pub index: usize,
    #[serde(flatten)]
    pub edit: Edit,
}

impl Operation {
    pub fn insert(
        author_id: impl Into<AuthorId>,
        id: OpId,
        index: usize,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id,
            author_id: author_id.into(),
            index,
            edit: Edit::Insert { text: text.into() },
        }
    }

    pub fn delete(author_id: impl Into<AuthorId>, id: OpId, index: usize, length: usize) -> Self {
        Self {
            id,
            author_id: author_id.into(),
            index,
            edit: Edit::Delete { length },
        }
    }

    pub fn is_insert(&self) -> bool {
        matches!(self.edit, Edit::Insert { .. })
    }

    /// Number of characters inserted or removed
    pub fn len(&self) -> usize {
        match &self.edit {
            Edit::Insert { text } => text.chars().count(),
            Edit::Delete { length } => *length,
        }
    }

    /// One past the last position this operation touches in the state it
    /// applies to. Inserts touch no existing characters.
    ///
    /// Saturates for ranges that do not fit a `usize`; such operations
    /// never pass [`Operation::validate`].
    pub fn end(&self) -> usize {
        self.checked_end().unwrap_or(usize::MAX)
    }

    fn checked_end(&self) -> Option<usize> {
        match &self.edit {
            Edit::Insert { .. } => Some(self.index),
            Edit::Delete { length } => self.index.checked_add(*length),
        }
    }

    /// Change in document length when this operation is applied
    pub fn delta(&self) -> isize {
        match &self.edit {
            Edit::Insert { .. } => self.len() as isize,
            Edit::Delete { length } => -(*length as isize),
        }
    }

    /// Deterministic tie-break key for concurrent inserts at one position
    pub fn tie_key(&self) -> (&str, OpId) {
        (self.author_id.as_str(), self.id)
    }

    /// Same operation moved to another index
    pub fn at(&self, index: usize) -> Self {
        Self {
            index,
            ..self.clone()
        }
    }

    /// Check the operation is well formed and fits a document of `len`
    /// characters.
    pub fn validate(&self, len: usize) -> Result<(), OperationError> {
        match &self.edit {
            Edit::Insert { text } if text.is_empty() => Err(OperationError::EmptyInsert),
            Edit::Delete { length: 0 } => Err(OperationError::EmptyDelete),
            _ => match self.checked_end() {
                Some(end) if end <= len && self.index <= len => Ok(()),
                _ => Err(OperationError::OutOfRange {
                    index: self.index,
                    end: self.end(),
                    len,
                }),
            },
        }
    }
}

/// An operation as submitted by an editor, before the sequencer has
/// assigned its id and transformed it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submission {
    pub author_id: AuthorId,
    /// Explicit id, or `None` to take the author's next one
    pub id: Option<OpId>,
    /// Document version the author had seen when issuing the edit
    pub base_version: Version,
    pub index: usize,
    pub edit: Edit,
}

impl Submission {
    pub fn insert(author_id: impl Into<AuthorId>, index: usize, text: impl Into<String>) -> Self {
        Self {
            author_id: author_id.into(),
            id: None,
            base_version: 0,
            index,
            edit: Edit::Insert { text: text.into() },
        }
    }

    pub fn delete(author_id: impl Into<AuthorId>, index: usize, length: usize) -> Self {
        Self {
            author_id: author_id.into(),
            id: None,
            base_version: 0,
            index,
            edit: Edit::Delete { length },
        }
    }

    pub fn with_id(mut self, id: OpId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn based_on(mut self, version: Version) -> Self {
        self.base_version = version;
        self
    }

    pub fn into_operation(self, id: OpId) -> Operation {
        Operation {
            id,
            author_id: self.author_id,
            index: self.index,
            edit: self.edit,
        }
    }
}

/// An operation together with the document version it produced
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedOp {
    pub version: Version,
    pub op: Operation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lengths_count_chars() {
        let op = Operation::insert("a", 1, 0, "héllo");
        assert_eq!(op.len(), 5);
        assert_eq!(op.delta(), 5);
        assert_eq!(op.end(), 0);

        let op = Operation::delete("a", 2, 3, 4);
        assert_eq!(op.len(), 4);
        assert_eq!(op.delta(), -4);
        assert_eq!(op.end(), 7);
    }

    #[test]
    fn test_validate() {
        assert_eq!(
            Operation::insert("a", 1, 0, "").validate(3),
            Err(OperationError::EmptyInsert)
        );
        assert_eq!(
            Operation::delete("a", 1, 0, 0).validate(3),
            Err(OperationError::EmptyDelete)
        );
        assert!(Operation::insert("a", 1, 3, "x").validate(3).is_ok());
        assert_eq!(
            Operation::insert("a", 1, 4, "x").validate(3),
            Err(OperationError::OutOfRange { index: 4, end: 4, len: 3 })
        );
        assert!(Operation::delete("a", 1, 1, 2).validate(3).is_ok());
        assert_eq!(
            Operation::delete("a", 1, 2, 2).validate(3),
            Err(OperationError::OutOfRange { index: 2, end: 4, len: 3 })
        );
    }

    #[test]
    fn test_validate_rejects_overflowing_range() {
        let op = Operation::delete("a", 1, 1, usize::MAX);
        assert_eq!(op.end(), usize::MAX);
        assert_eq!(
            op.validate(5),
            Err(OperationError::OutOfRange {
                index: 1,
                end: usize::MAX,
                len: 5
            })
        );
        assert!(Operation::delete("a", 1, usize::MAX, 1).validate(usize::MAX).is_err());
    }

    #[test]
    fn test_wire_shape() {
        let op = Operation::insert("alice", 7, 2, "hi");
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 7,
                "authorId": "alice",
                "index": 2,
                "kind": "insert",
                "text": "hi"
            })
        );

        let back: Operation = serde_json::from_value(serde_json::json!({
            "id": 1,
            "authorId": "bob",
            "index": 0,
            "kind": "delete",
            "length": 3
        }))
        .unwrap();
        assert_eq!(back, Operation::delete("bob", 1, 0, 3));
    }

    #[test]
    fn test_submission_into_operation() {
        let sub = Submission::delete("bob", 4, 2).with_id(3).based_on(9);
        assert_eq!(sub.id, Some(3));
        assert_eq!(sub.base_version, 9);
        assert_eq!(sub.into_operation(3), Operation::delete("bob", 3, 4, 2));
    }
}
