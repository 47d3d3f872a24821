//! One WebSocket editor session

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;
use warp::ws::{Message, WebSocket};

use super::messages::{ClientOperation, ServerMessage};
use crate::ot::Version;
use crate::sequencer::{Broadcast, SequencerError, SequencerHandle, SessionId};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("WebSocket error: {0}")]
    Transport(#[from] warp::Error),

    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Sequencer(#[from] SequencerError),
}

/// Drive a connected editor until it goes away
pub async fn run_session(socket: WebSocket, handle: SequencerHandle) {
    let id = Uuid::new_v4();
    log::info!("Session {} connected", id);

    let (sink, mut stream) = socket.split();
    // subscribe before the snapshot so nothing committed in between is missed
    let mut session = Session {
        id,
        committed: handle.subscribe(),
        handle,
        sink,
        seen: 0,
    };

    let result = async {
        session.resync().await?;
        loop {
            tokio::select! {
                frame = stream.next() => match frame {
                    Some(Ok(msg)) if msg.is_close() => break,
                    Some(Ok(msg)) => {
                        if let Ok(text) = msg.to_str() {
                            session.on_text(text).await?;
                        }
                    }
                    Some(Err(e)) => return Err(e.into()),
                    None => break,
                },
                received = session.committed.recv() => match received {
                    Ok(b) => session.forward(b).await?,
                    Err(RecvError::Lagged(skipped)) => session.recover(skipped).await?,
                    Err(RecvError::Closed) => break,
                },
            }
        }
        Ok::<(), SessionError>(())
    }
    .await;

    match result {
        Ok(()) => log::info!("Session {} disconnected", id),
        Err(e) => log::info!("Session {} closed: {}", id, e),
    }
}

struct Session {
    id: SessionId,
    handle: SequencerHandle,
    committed: broadcast::Receiver<Broadcast>,
    sink: SplitSink<WebSocket, Message>,
    /// Highest version this editor has been sent
    seen: Version,
}

impl Session {
    async fn send(&mut self, message: &ServerMessage) -> Result<(), SessionError> {
        let text = serde_json::to_string(message)?;
        self.sink.send(Message::text(text)).await?;
        Ok(())
    }

    /// Send the full document and restart tracking from its version
    async fn resync(&mut self) -> Result<(), SessionError> {
        let doc = self.handle.snapshot().await?;
        self.seen = doc.version();
        self.send(&ServerMessage::document(&doc)).await
    }

    /// The receiver dropped `skipped` operations; the editor can only
    /// continue from a fresh document.
    async fn recover(&mut self, skipped: u64) -> Result<(), SessionError> {
        log::warn!(
            "Session {} lagged by {} operations, resyncing",
            self.id,
            skipped
        );
        self.resync().await
    }

    async fn forward(&mut self, b: Broadcast) -> Result<(), SessionError> {
        let version = b.committed.version;
        if version <= self.seen {
            return Ok(());
        }
        self.seen = version;
        if b.origin == Some(self.id) {
            return Ok(());
        }
        self.send(&ServerMessage::Operation {
            version,
            operation: b.committed.op,
        })
        .await
    }

    /// Forward everything committed up to `version`, so an ack never
    /// overtakes an earlier operation from another editor.
    async fn catch_up(&mut self, version: Version) -> Result<(), SessionError> {
        while self.seen < version {
            match self.committed.recv().await {
                Ok(b) => self.forward(b).await?,
                Err(RecvError::Lagged(skipped)) => self.recover(skipped).await?,
                Err(RecvError::Closed) => break,
            }
        }
        Ok(())
    }

    async fn on_text(&mut self, text: &str) -> Result<(), SessionError> {
        let submission = match ClientOperation::parse(text) {
            Ok(submission) => submission,
            Err(e) => {
                log::warn!("Session {} sent a malformed operation: {}", self.id, e);
                return self.send(&ServerMessage::wire_error(&e)).await;
            }
        };

        let reply = match self.handle.submit(submission, Some(self.id)).await {
            Ok(outcome) => {
                if let Some(version) = outcome.last_version() {
                    self.catch_up(version).await?;
                }
                ServerMessage::outcome(outcome)
            }
            Err(e) => ServerMessage::sequencer_error(&e),
        };
        self.send(&reply).await
    }
}
