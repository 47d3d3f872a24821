//! JSON messages exchanged with editor sessions

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ot::{AuthorId, Document, Edit, OpId, Operation, Submission, Version};
use crate::sequencer::{Outcome, SequencerError};

#[derive(Error, Debug)]
pub enum WireError {
    #[error("Malformed message: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{kind} operation requires '{field}'")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    Insert,
    Delete,
}

/// An operation as sent by an editor
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientOperation {
    pub author_id: AuthorId,
    pub kind: OpKind,
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<OpId>,
    /// Last document version the editor had applied
    #[serde(default)]
    pub base_version: Version,
}

impl ClientOperation {
    /// Parse a text frame into a submission
    pub fn parse(frame: &str) -> Result<Submission, WireError> {
        let op: ClientOperation = serde_json::from_str(frame)?;
        op.try_into()
    }
}

impl TryFrom<ClientOperation> for Submission {
    type Error = WireError;

    fn try_from(op: ClientOperation) -> Result<Self, Self::Error> {
        let edit = match op.kind {
            OpKind::Insert => Edit::Insert {
                text: op.text.ok_or(WireError::MissingField {
                    kind: "insert",
                    field: "text",
                })?,
            },
            OpKind::Delete => Edit::Delete {
                length: op.length.ok_or(WireError::MissingField {
                    kind: "delete",
                    field: "length",
                })?,
            },
        };
        Ok(Submission {
            author_id: op.author_id,
            id: op.id,
            base_version: op.base_version,
            index: op.index,
            edit,
        })
    }
}

/// Messages sent to editors
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Full document state, sent once on connect and after a resync
    Document {
        version: Version,
        text: String,
        ops: Vec<Operation>,
    },

    /// An operation committed by another editor
    Operation {
        version: Version,
        operation: Operation,
    },

    /// The sender's operation was committed as these versions
    Ack { id: OpId, versions: Vec<Version> },

    /// The sender's operation was absorbed by concurrent deletes
    Noop { id: OpId },

    Rejected {
        error: String,
        #[serde(rename = "retryLater")]
        retry_later: bool,
    },
}

impl ServerMessage {
    pub fn document(doc: &Document) -> Self {
        ServerMessage::Document {
            version: doc.version(),
            text: doc.text(),
            ops: doc.ops().to_vec(),
        }
    }

    pub fn outcome(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Committed { id, ops } => ServerMessage::Ack {
                id,
                versions: ops.iter().map(|c| c.version).collect(),
            },
            Outcome::Noop { id } => ServerMessage::Noop { id },
        }
    }

    pub fn sequencer_error(error: &SequencerError) -> Self {
        ServerMessage::Rejected {
            error: error.to_string(),
            retry_later: error.is_retryable(),
        }
    }

    pub fn wire_error(error: &WireError) -> Self {
        ServerMessage::Rejected {
            error: error.to_string(),
            retry_later: false,
        }
    }
}
