// coedit - Shared text document with operational transformation

//! Concurrent editing of one shared plain-text document.
//!
//! - [`ot`] holds the pure engine: operations, the inclusion transform and
//!   the document model.
//! - [`sequencer`] serializes submissions through a single actor that
//!   transforms, commits, persists and broadcasts them.
//! - [`storage`] persists the document.
//! - [`network`] exposes sessions over WebSocket.

pub mod network;
pub mod ot;
pub mod sequencer;
pub mod storage;

pub use ot::{Document, Operation, Submission};
pub use sequencer::{SequencerConfig, SequencerHandle};
