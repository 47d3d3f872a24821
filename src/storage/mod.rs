//! Document persistence
//!
//! The sequencer saves the whole document after every commit through a
//! `DocumentStore`. Stores are keyed by a single well-known document id.

mod local_file;
mod memory;

pub use local_file::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::ot::Document;

/// Error types for storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence backend for the shared document
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Id of the document this store holds
    fn document_id(&self) -> &str;

    /// Read the stored document, if one has been saved
    async fn fetch(&self) -> Result<Option<Document>, StoreError>;

    /// Replace the stored document
    async fn save(&self, document: &Document) -> Result<(), StoreError>;

    /// Read the stored document, creating and saving an empty one the
    /// first time.
    async fn load(&self) -> Result<Document, StoreError> {
        if let Some(document) = self.fetch().await? {
            return Ok(document);
        }
        let document = Document::new(self.document_id());
        self.save(&document).await?;
        log::info!("Created empty document '{}'", self.document_id());
        Ok(document)
    }
}
