use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{DocumentStore, StoreError};
use crate::ot::{Document, DocumentId};

/// In-memory document store.
///
/// Holds the serialized document so saves behave like a real backend.
/// Failures can be scripted with [`MemoryStore::fail_next`].
pub struct MemoryStore {
    document_id: DocumentId,
    data: Mutex<Option<Vec<u8>>>,
    saves: AtomicUsize,
    failures: AtomicUsize,
}

impl MemoryStore {
    pub fn new(document_id: impl Into<DocumentId>) -> Self {
        Self {
            document_id: document_id.into(),
            data: Mutex::new(None),
            saves: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
        }
    }

    /// Make the next `count` saves fail
    pub fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    /// Number of successful saves so far
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// The last successfully saved document
    pub fn stored(&self) -> Option<Document> {
        let data = self.data.lock().ok()?;
        data.as_ref()
            .and_then(|bytes| serde_json::from_slice(bytes).ok())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn document_id(&self) -> &str {
        &self.document_id
    }

    async fn fetch(&self) -> Result<Option<Document>, StoreError> {
        let data = self
            .data
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?;
        match data.as_ref() {
            Some(bytes) => Ok(Some(serde_json::from_slice(bytes)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, document: &Document) -> Result<(), StoreError> {
        let pending_failure = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if pending_failure {
            return Err(StoreError::Unavailable("scripted failure".to_string()));
        }

        let bytes = serde_json::to_vec(document)?;
        let mut data = self
            .data
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?;
        *data = Some(bytes);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_failures() {
        let store = MemoryStore::new("shared");
        let doc = store.load().await.unwrap();
        assert_eq!(store.saves(), 1);

        store.fail_next(2);
        assert!(store.save(&doc).await.is_err());
        assert!(store.save(&doc).await.is_err());
        assert!(store.save(&doc).await.is_ok());
        assert_eq!(store.saves(), 2);
        assert_eq!(store.stored().map(|d| d.version()), Some(0));
    }

    #[tokio::test]
    async fn test_load_returns_existing() {
        let store = MemoryStore::new("shared");
        let mut doc = Document::new("shared");
        crate::ot::commit(&mut doc, crate::ot::Operation::insert("a", 1, 0, "hi")).unwrap();
        store.save(&doc).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.text(), "hi");
        assert_eq!(store.saves(), 1);
    }
}
