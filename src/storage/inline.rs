use async_trait::async_trait;

use crate::db::models::AttachmentRef;
use crate::errors::{AppError, Result};
use crate::storage::AttachmentStore;

/// Storage strategy keeping payload bytes inside the catalog row.
///
/// The reference *is* the payload, so `remove` is a no-op: deleting the
/// row discards the bytes. Upload buffering in memory ahead of the
/// insert degenerates to this strategy as well.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineStore;

impl InlineStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AttachmentStore for InlineStore {
    async fn persist(&self, bytes: &[u8], _original_name: &str) -> Result<AttachmentRef> {
        Ok(AttachmentRef::Inline(bytes.to_vec()))
    }

    async fn resolve(&self, reference: &AttachmentRef) -> Result<Vec<u8>> {
        match reference {
            AttachmentRef::Inline(bytes) => Ok(bytes.clone()),
            AttachmentRef::File(name) => Err(AppError::Internal(anyhow::anyhow!(
                "row references file {name:?} but the filesystem strategy is not active"
            ))),
        }
    }

    async fn remove(&self, _reference: &AttachmentRef) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn persist_resolve_round_trip() {
        let store = InlineStore::new();
        let reference = store.persist(b"%PDF-1.7", "book.pdf").await.unwrap();
        assert_eq!(reference, AttachmentRef::Inline(b"%PDF-1.7".to_vec()));
        assert_eq!(store.resolve(&reference).await.unwrap(), b"%PDF-1.7");
    }

    #[tokio::test]
    async fn remove_is_a_no_op() {
        let store = InlineStore::new();
        let reference = store.persist(b"bytes", "book.pdf").await.unwrap();
        store.remove(&reference).await.unwrap();
        // Bytes stay reachable through the reference; only row deletion
        // discards them.
        assert_eq!(store.resolve(&reference).await.unwrap(), b"bytes");
    }

    #[tokio::test]
    async fn file_references_cannot_be_resolved() {
        let store = InlineStore::new();
        let err = store
            .resolve(&AttachmentRef::File("123-abc-book.pdf".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
