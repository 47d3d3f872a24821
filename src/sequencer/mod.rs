//! The single writer of the shared document
//!
//! Operations arrive concurrently from any number of sessions. The
//! sequencer serializes them through a bounded FIFO channel into one actor
//! task that owns the document. For each operation the actor:
//!
//! 1. validates it and assigns its id,
//! 2. transforms it against every committed operation its author had not
//!    seen, in commit order,
//! 3. commits the result, enters `Persisting` and saves the document,
//! 4. broadcasts the transformed operation(s) and returns to `Idle`.
//!
//! Operations submitted while a save is in flight wait in the channel and
//! are taken one at a time once the actor is idle again, so each is
//! transformed against the complete, up-to-date history.

mod actor;
mod error;

pub use error::SequencerError;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use uuid::Uuid;

use crate::ot::{CommittedOp, Document, OpId, Submission};
use crate::storage::{DocumentStore, StoreError};
use actor::{Command, Sequencer};

/// Ephemeral identifier of a connected session, used only for routing
pub type SessionId = Uuid;

/// Configuration for the sequencer actor.
#[derive(Clone, Debug)]
pub struct SequencerConfig {
    /// Operations that may wait while a save is in flight
    pub queue_capacity: usize,
    /// Committed operations buffered per subscriber
    pub broadcast_capacity: usize,
    /// Extra save attempts after the first failure
    pub persist_retries: u32,
    /// Delay between save attempts
    pub retry_backoff: Duration,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            broadcast_capacity: 1024,
            persist_retries: 3,
            retry_backoff: Duration::from_millis(100),
        }
    }
}

/// Whether the actor is waiting for work or for the store
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequencerState {
    Idle,
    Persisting,
}

/// A committed operation announced to every session
#[derive(Clone, Debug)]
pub struct Broadcast {
    /// Session that submitted the operation, if any
    pub origin: Option<SessionId>,
    pub committed: CommittedOp,
}

/// What happened to a submitted operation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Committed as one or more operations, in version order
    Committed { id: OpId, ops: Vec<CommittedOp> },
    /// Transformed away by concurrent deletes; nothing committed.
    ///
    /// Nothing is saved either, so the id is only remembered until the
    /// sequencer restarts. Afterwards the author may be issued it again.
    Noop { id: OpId },
}

impl Outcome {
    /// The version the document reached through this operation
    pub fn last_version(&self) -> Option<u64> {
        match self {
            Outcome::Committed { ops, .. } => ops.last().map(|c| c.version),
            Outcome::Noop { .. } => None,
        }
    }
}

/// Cloneable entry point to a running sequencer.
///
/// The actor stops once every handle has been dropped.
#[derive(Clone)]
pub struct SequencerHandle {
    commands: mpsc::Sender<Command>,
    broadcast: broadcast::Sender<Broadcast>,
    state: watch::Receiver<SequencerState>,
}

impl SequencerHandle {
    /// Load the document from `store` and spawn the sequencer actor.
    pub async fn start(
        store: Arc<dyn DocumentStore>,
        config: SequencerConfig,
    ) -> Result<Self, StoreError> {
        let document = store.load().await?;
        log::info!(
            "Loaded document '{}' at version {}",
            document.id(),
            document.version()
        );

        let (commands, rx) = mpsc::channel(config.queue_capacity.max(1));
        let (broadcast, _) = broadcast::channel(config.broadcast_capacity.max(1));
        let (state_tx, state) = watch::channel(SequencerState::Idle);

        let sequencer = Sequencer::new(document, store, config, broadcast.clone(), state_tx);
        tokio::spawn(sequencer.run(rx));

        Ok(Self {
            commands,
            broadcast,
            state,
        })
    }

    /// Submit an operation and wait for its outcome.
    ///
    /// Fails fast with [`SequencerError::QueueFull`] when the pending queue
    /// is at capacity.
    pub async fn submit(
        &self,
        submission: Submission,
        origin: Option<SessionId>,
    ) -> Result<Outcome, SequencerError> {
        let (reply, outcome) = oneshot::channel();
        self.commands
            .try_send(Command::Submit {
                submission,
                origin,
                reply,
            })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => SequencerError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => SequencerError::Closed,
            })?;
        outcome.await.map_err(|_| SequencerError::Closed)?
    }

    /// Current document, consistent with commit order
    pub async fn snapshot(&self) -> Result<Document, SequencerError> {
        let (reply, document) = oneshot::channel();
        self.commands
            .send(Command::Snapshot { reply })
            .await
            .map_err(|_| SequencerError::Closed)?;
        document.await.map_err(|_| SequencerError::Closed)
    }

    /// Receive every operation committed from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Broadcast> {
        self.broadcast.subscribe()
    }

    pub fn state(&self) -> SequencerState {
        *self.state.borrow()
    }

    /// Watch state transitions
    pub fn watch_state(&self) -> watch::Receiver<SequencerState> {
        self.state.clone()
    }
}
