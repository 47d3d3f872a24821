//! Per-author operation id tracking
//!
//! The AuthorClock records the highest operation id seen from each author.
//! Together with the author id it forms the durable `(author, id)` key used
//! to break ties between concurrent inserts at the same position.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error::OperationError;
use super::operation::OpId;

/// Durable identifier of an editor
pub type AuthorId = String;

/// Highest operation id observed per author
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorClock {
    seen: BTreeMap<AuthorId, OpId>,
}

impl AuthorClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest id seen from an author (0 if never seen)
    pub fn get(&self, author: &str) -> OpId {
        self.seen.get(author).copied().unwrap_or(0)
    }

    /// Record having seen an operation id from an author
    pub fn observe(&mut self, author: &str, id: OpId) {
        match self.seen.get_mut(author) {
            Some(current) if *current >= id => {}
            Some(current) => *current = id,
            None => {
                self.seen.insert(author.to_string(), id);
            }
        }
    }

    /// Resolve the id for a new operation from `author`.
    ///
    /// Without an explicit id the next one in the author's stream is used.
    /// An explicit id must be strictly newer than anything already seen.
    pub fn next_id(&self, author: &str, requested: Option<OpId>) -> Result<OpId, OperationError> {
        let last = self.get(author);
        match requested {
            None => last.checked_add(1).ok_or_else(|| OperationError::IdExhausted {
                author: author.to_string(),
            }),
            Some(id) if id > last => Ok(id),
            Some(id) => Err(OperationError::StaleId {
                author: author.to_string(),
                id,
                last,
            }),
        }
    }

    pub fn authors(&self) -> impl Iterator<Item = &AuthorId> {
        self.seen.keys()
    }
}
