use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, watch};

use super::{Broadcast, Outcome, SequencerConfig, SequencerError, SequencerState, SessionId};
use crate::ot::{commit, transform_seq, Document, OpId, Operation, OperationError, Submission};
use crate::storage::DocumentStore;

pub(super) enum Command {
    Submit {
        submission: Submission,
        origin: Option<SessionId>,
        reply: oneshot::Sender<Result<Outcome, SequencerError>>,
    },
    Snapshot {
        reply: oneshot::Sender<Document>,
    },
}

/// The actor that exclusively owns the document
pub(super) struct Sequencer {
    document: Document,
    store: Arc<dyn DocumentStore>,
    config: SequencerConfig,
    broadcast: broadcast::Sender<Broadcast>,
    state: watch::Sender<SequencerState>,
}

impl Sequencer {
    pub(super) fn new(
        document: Document,
        store: Arc<dyn DocumentStore>,
        config: SequencerConfig,
        broadcast: broadcast::Sender<Broadcast>,
        state: watch::Sender<SequencerState>,
    ) -> Self {
        Self {
            document,
            store,
            config,
            broadcast,
            state,
        }
    }

    /// Take commands in arrival order until every handle is gone
    pub(super) async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        while let Some(command) = commands.recv().await {
            match command {
                Command::Submit {
                    submission,
                    origin,
                    reply,
                } => {
                    let result = self.process(submission, origin).await;
                    let _ = reply.send(result);
                }
                Command::Snapshot { reply } => {
                    let _ = reply.send(self.document.clone());
                }
            }
        }
        log::debug!("Sequencer for '{}' stopped", self.document.id());
    }

    /// Transform, commit, persist and broadcast one submission
    async fn process(
        &mut self,
        submission: Submission,
        origin: Option<SessionId>,
    ) -> Result<Outcome, SequencerError> {
        let author = submission.author_id.clone();
        let (id, transformed) = self.prepare(submission).map_err(|e| {
            log::warn!("Rejected operation from {}: {}", author, e);
            SequencerError::Invalid(e)
        })?;

        if transformed.is_empty() {
            log::debug!("Operation {}:{} transformed to a no-op", author, id);
            self.document.observe_author(&author, id);
            return Ok(Outcome::Noop { id });
        }

        let before = self.document.clone();
        let mut committed = Vec::with_capacity(transformed.len());
        for op in transformed {
            match commit(&mut self.document, op) {
                Ok(c) => committed.push(c),
                Err(e) => {
                    self.document = before;
                    return Err(e.into());
                }
            }
        }

        self.set_state(SequencerState::Persisting);
        let saved = self.persist().await;
        self.set_state(SequencerState::Idle);

        if let Err(e) = saved {
            log::warn!(
                "Rolling back operation {}:{} to version {}: {}",
                author,
                id,
                before.version(),
                e
            );
            self.document = before;
            return Err(e);
        }

        for c in &committed {
            log::debug!("Committed version {} from {}", c.version, author);
            // no receivers is fine: nobody is connected
            let _ = self.broadcast.send(Broadcast {
                origin,
                committed: c.clone(),
            });
        }

        Ok(Outcome::Committed { id, ops: committed })
    }

    /// Validate a submission and transform it against the history its
    /// author had not seen. Does not touch the document.
    fn prepare(&self, submission: Submission) -> Result<(OpId, Vec<Operation>), OperationError> {
        let base = submission.base_version;
        let base_len = self
            .document
            .length_at(base)
            .ok_or(OperationError::FutureBase {
                base,
                current: self.document.version(),
            })?;

        let id = self
            .document
            .authors()
            .next_id(&submission.author_id, submission.id)?;
        let op = submission.into_operation(id);
        op.validate(base_len)?;

        let unseen: Vec<Operation> = self
            .document
            .since(base)
            .iter()
            .map(|c| c.op.clone())
            .collect();
        let (transformed, _) = transform_seq(&[op], &unseen);
        Ok((id, transformed))
    }

    /// Save the document, retrying with a fixed backoff
    async fn persist(&self) -> Result<(), SequencerError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.store.save(&self.document).await {
                Ok(()) => return Ok(()),
                Err(source) if attempts > self.config.persist_retries => {
                    return Err(SequencerError::Persistence { attempts, source });
                }
                Err(e) => {
                    log::warn!(
                        "Saving version {} failed (attempt {}): {}",
                        self.document.version(),
                        attempts,
                        e
                    );
                    tokio::time::sleep(self.config.retry_backoff).await;
                }
            }
        }
    }

    fn set_state(&self, state: SequencerState) {
        log::debug!("Sequencer {:?}", state);
        let _ = self.state.send(state);
    }
}
