use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{DocumentStore, StoreError};
use crate::ot::{Document, DocumentId};

/// A document store that keeps `<id>.json` in a local directory
pub struct JsonFileStore {
    /// Base directory for document files
    base_dir: PathBuf,
    document_id: DocumentId,
}

impl JsonFileStore {
    /// Create a store in `base_dir`, creating the directory if needed
    pub fn new<P: AsRef<Path>>(
        base_dir: P,
        document_id: impl Into<DocumentId>,
    ) -> Result<Self, StoreError> {
        let path = PathBuf::from(base_dir.as_ref());

        if !path.exists() {
            std::fs::create_dir_all(&path)?;
        }

        Ok(Self {
            base_dir: path,
            document_id: document_id.into(),
        })
    }

    /// Path of the document file
    pub fn file_path(&self) -> PathBuf {
        self.base_dir.join(format!("{}.json", self.document_id))
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    fn document_id(&self) -> &str {
        &self.document_id
    }

    async fn fetch(&self) -> Result<Option<Document>, StoreError> {
        let data = match tokio::fs::read(self.file_path()).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&data)?))
    }

    async fn save(&self, document: &Document) -> Result<(), StoreError> {
        let data = serde_json::to_vec(document)?;
        let target = self.file_path();
        let partial = target.with_extension("json.tmp");

        // readers only ever see a complete file
        tokio::fs::write(&partial, &data).await?;
        tokio::fs::rename(&partial, &target).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ot::{commit, Operation};

    #[tokio::test]
    async fn test_load_creates_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested"), "shared").unwrap();

        assert!(store.fetch().await.unwrap().is_none());
        let doc = store.load().await.unwrap();
        assert_eq!(doc.id(), "shared");
        assert_eq!(doc.version(), 0);
        assert!(store.file_path().exists());
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path(), "notes").unwrap();

        let mut doc = store.load().await.unwrap();
        commit(&mut doc, Operation::insert("a", 1, 0, "persisted")).unwrap();
        store.save(&doc).await.unwrap();

        let reopened = JsonFileStore::new(dir.path(), "notes").unwrap();
        let loaded = reopened.load().await.unwrap();
        assert_eq!(loaded.text(), "persisted");
        assert_eq!(loaded.version(), 1);
        assert!(!reopened.file_path().with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path(), "broken").unwrap();
        std::fs::write(store.file_path(), b"{not json").unwrap();

        assert!(matches!(
            store.load().await,
            Err(StoreError::SerializationError(_))
        ));
    }
}
