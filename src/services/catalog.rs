use std::sync::Arc;

use crate::db::models::{AttachmentRef, Book, BookFields, BookQuery, BookSummary, StoredAttachment};
use crate::db::CatalogRepository;
use crate::errors::{AppError, Result};
use crate::storage::AttachmentStore;

pub const PDF_MIME: &str = "application/pdf";

/// A validated upload handed over by the HTTP boundary.
#[derive(Debug, Clone)]
pub struct AttachmentUpload {
    pub filename: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Catalog business logic: validation, storage-strategy orchestration
/// and the write-ordering invariant (a replaced file is removed only
/// after the new state is durably recorded).
pub struct CatalogService {
    repo: Arc<dyn CatalogRepository>,
    store: Arc<dyn AttachmentStore>,
}

impl CatalogService {
    pub fn new(repo: Arc<dyn CatalogRepository>, store: Arc<dyn AttachmentStore>) -> Self {
        Self { repo, store }
    }

    pub async fn list(&self, query: &BookQuery) -> Result<(Vec<BookSummary>, i64)> {
        self.repo.list(query).await
    }

    pub async fn get(&self, id: i64) -> Result<Book> {
        self.repo
            .get(id)
            .await?
            .ok_or_else(|| AppError::not_found("book", id))
    }

    pub async fn create(
        &self,
        fields: BookFields,
        upload: Option<AttachmentUpload>,
    ) -> Result<i64> {
        validate_fields(&fields)?;
        let attachment = match upload {
            Some(upload) => Some(self.persist_upload(upload).await?),
            None => None,
        };
        let id = self.repo.insert(&fields, attachment.as_ref()).await?;
        metrics::counter!("bookvault_books_created_total").increment(1);
        tracing::info!(book_id = id, "book created");
        Ok(id)
    }

    pub async fn update(
        &self,
        id: i64,
        fields: BookFields,
        upload: Option<AttachmentUpload>,
    ) -> Result<u64> {
        validate_fields(&fields)?;
        let Some(upload) = upload else {
            // No new bytes: the stored attachment stays untouched.
            let changed = self.repo.update(id, &fields, None).await?;
            if changed > 0 {
                metrics::counter!("bookvault_books_updated_total").increment(1);
            }
            return Ok(changed);
        };

        ensure_pdf(&upload.mime)?;
        // Nothing is persisted for an id that does not exist; callers read
        // the zero count, they do not get an error.
        if self.repo.get(id).await?.is_none() {
            return Ok(0);
        }

        let previous_file = self.repo.attachment_path(id).await?;
        let attachment = self.persist_upload(upload).await?;
        let changed = self.repo.update(id, &fields, Some(&attachment)).await?;
        if changed > 0 {
            // Old payload goes away only after the row points at the new one.
            if let Some(path) = previous_file {
                self.discard_file(path).await;
            }
            metrics::counter!("bookvault_books_updated_total").increment(1);
        }
        Ok(changed)
    }

    pub async fn delete(&self, id: i64) -> Result<u64> {
        let previous_file = self.repo.attachment_path(id).await?;
        let deleted = self.repo.delete(id).await?;
        if deleted > 0 {
            if let Some(path) = previous_file {
                self.discard_file(path).await;
            }
            metrics::counter!("bookvault_books_deleted_total").increment(1);
        }
        Ok(deleted)
    }

    /// Resolve the attachment of a book to `(bytes, filename, mime)`.
    pub async fn fetch_attachment(&self, id: i64) -> Result<(Vec<u8>, String, String)> {
        let stored = self
            .repo
            .fetch_attachment(id)
            .await?
            .ok_or_else(|| AppError::not_found("attachment for book", id))?;
        let bytes = self.store.resolve(&stored.payload).await?;
        metrics::counter!("bookvault_attachment_fetches_total").increment(1);
        Ok((bytes, stored.filename, stored.mime))
    }

    pub async fn ping(&self) -> Result<()> {
        self.repo.ping().await
    }

    async fn persist_upload(&self, upload: AttachmentUpload) -> Result<StoredAttachment> {
        ensure_pdf(&upload.mime)?;
        let payload = self.store.persist(&upload.bytes, &upload.filename).await?;
        Ok(StoredAttachment {
            filename: upload.filename,
            mime: upload.mime,
            payload,
        })
    }

    /// Best-effort cleanup of a replaced or orphaned attachment file.
    /// Failure is logged, never propagated.
    async fn discard_file(&self, path: String) {
        let reference = AttachmentRef::File(path.clone());
        if let Err(err) = self.store.remove(&reference).await {
            tracing::warn!(file = %path, error = %err, "failed to remove stale attachment file");
        }
    }
}

fn validate_fields(fields: &BookFields) -> Result<()> {
    if fields.title.trim().is_empty() {
        return Err(AppError::MissingField("title"));
    }
    if fields.author.trim().is_empty() {
        return Err(AppError::MissingField("author"));
    }
    Ok(())
}

fn ensure_pdf(mime: &str) -> Result<()> {
    if mime != PDF_MIME {
        return Err(AppError::UnsupportedAttachment(mime.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryCatalog;
    use crate::storage::{FilesystemStore, InlineStore};

    fn inline_service() -> CatalogService {
        CatalogService::new(Arc::new(MemoryCatalog::new()), Arc::new(InlineStore::new()))
    }

    fn fs_service() -> (tempfile::TempDir, CatalogService) {
        let dir = tempfile::tempdir().unwrap();
        let service = CatalogService::new(
            Arc::new(MemoryCatalog::new()),
            Arc::new(FilesystemStore::new(dir.path())),
        );
        (dir, service)
    }

    fn fields(title: &str, author: &str) -> BookFields {
        BookFields {
            title: title.to_string(),
            author: author.to_string(),
            ..Default::default()
        }
    }

    fn upload(filename: &str, mime: &str, bytes: &[u8]) -> AttachmentUpload {
        AttachmentUpload {
            filename: filename.to_string(),
            mime: mime.to_string(),
            bytes: bytes.to_vec(),
        }
    }

    #[tokio::test]
    async fn create_requires_title_and_author() {
        let service = inline_service();
        let err = service
            .create(fields("", "Somebody"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MissingField("title")));

        let err = service
            .create(fields("Something", "   "), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MissingField("author")));
    }

    #[tokio::test]
    async fn create_rejects_non_pdf_uploads_without_inserting() {
        let service = inline_service();
        let err = service
            .create(
                fields("Title", "Author"),
                Some(upload("cover.png", "image/png", b"PNG")),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedAttachment(_)));

        let (items, total) = service.list(&BookQuery::default()).await.unwrap();
        assert_eq!(total, 0);
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn create_then_fetch_attachment_round_trips_bytes() {
        let service = inline_service();
        let id = service
            .create(
                fields("Title", "Author"),
                Some(upload("book.pdf", PDF_MIME, b"%PDF-1.7")),
            )
            .await
            .unwrap();

        let (bytes, filename, mime) = service.fetch_attachment(id).await.unwrap();
        assert_eq!(bytes, b"%PDF-1.7");
        assert_eq!(filename, "book.pdf");
        assert_eq!(mime, PDF_MIME);
    }

    #[tokio::test]
    async fn fetch_attachment_is_not_found_without_file_or_row() {
        let service = inline_service();
        let id = service.create(fields("Bare", "Author"), None).await.unwrap();

        assert!(matches!(
            service.fetch_attachment(id).await.unwrap_err(),
            AppError::NotFound { .. }
        ));
        assert!(matches!(
            service.fetch_attachment(id + 1).await.unwrap_err(),
            AppError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn update_without_upload_preserves_attachment() {
        let service = inline_service();
        let id = service
            .create(
                fields("Title", "Author"),
                Some(upload("keep.pdf", PDF_MIME, b"original")),
            )
            .await
            .unwrap();

        let changed = service
            .update(id, fields("Retitled", "Author"), None)
            .await
            .unwrap();
        assert_eq!(changed, 1);

        let (bytes, filename, mime) = service.fetch_attachment(id).await.unwrap();
        assert_eq!(bytes, b"original");
        assert_eq!(filename, "keep.pdf");
        assert_eq!(mime, PDF_MIME);
    }

    #[test]
    fn scalar_updates_count_toward_the_update_metric() {
        use metrics_util::debugging::{DebugValue, DebuggingRecorder};

        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let service = inline_service();
                let id = service.create(fields("Title", "Author"), None).await.unwrap();
                let changed = service
                    .update(id, fields("Retitled", "Author"), None)
                    .await
                    .unwrap();
                assert_eq!(changed, 1);

                // An update that matches no row must not count.
                let changed = service
                    .update(id + 1, fields("Ghost", "Writer"), None)
                    .await
                    .unwrap();
                assert_eq!(changed, 0);
            });
        });

        let updated: Vec<_> = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .filter(|(key, _, _, _)| key.key().name() == "bookvault_books_updated_total")
            .collect();
        assert_eq!(updated.len(), 1);
        assert!(matches!(updated[0].3, DebugValue::Counter(1)));
    }

    #[tokio::test]
    async fn update_with_upload_on_missing_id_persists_nothing() {
        let (dir, service) = fs_service();
        let changed = service
            .update(
                404,
                fields("Ghost", "Writer"),
                Some(upload("ghost.pdf", PDF_MIME, b"ghost")),
            )
            .await
            .unwrap();
        assert_eq!(changed, 0);

        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 0, "no orphan file may be written");
    }

    #[tokio::test]
    async fn replacing_an_attachment_removes_the_old_file_afterwards() {
        let (dir, service) = fs_service();
        let id = service
            .create(
                fields("Title", "Author"),
                Some(upload("v1.pdf", PDF_MIME, b"version one")),
            )
            .await
            .unwrap();

        let entries = |path: &std::path::Path| -> Vec<String> {
            let mut names: Vec<String> = std::fs::read_dir(path)
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect();
            names.sort();
            names
        };
        let before = entries(dir.path());
        assert_eq!(before.len(), 1);

        service
            .update(
                id,
                fields("Title", "Author"),
                Some(upload("v2.pdf", PDF_MIME, b"version two")),
            )
            .await
            .unwrap();

        let after = entries(dir.path());
        assert_eq!(after.len(), 1, "old file must be gone after replacement");
        assert_ne!(before, after);

        let (bytes, filename, _) = service.fetch_attachment(id).await.unwrap();
        assert_eq!(bytes, b"version two");
        assert_eq!(filename, "v2.pdf");
    }

    #[tokio::test]
    async fn delete_removes_row_and_backing_file() {
        let (dir, service) = fs_service();
        let id = service
            .create(
                fields("Title", "Author"),
                Some(upload("doomed.pdf", PDF_MIME, b"bytes")),
            )
            .await
            .unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        assert_eq!(service.delete(id).await.unwrap(), 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert!(matches!(
            service.get(id).await.unwrap_err(),
            AppError::NotFound { .. }
        ));

        // Idempotent count contract
        assert_eq!(service.delete(id).await.unwrap(), 0);
    }
}
