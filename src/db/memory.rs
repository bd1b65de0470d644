//! In-process catalog, used for development mode (`database.url = "memory"`)
//! and as the backing store for service/route tests. Semantics mirror the
//! Postgres implementation: insertion order, case-insensitive substring
//! search OR'd across title/author/genre/language, zero-count update and
//! delete on a missing id.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::db::models::{
    AttachmentInfo, AttachmentRef, Book, BookFields, BookQuery, BookSummary, StoredAttachment,
};
use crate::db::CatalogRepository;
use crate::errors::Result;

#[derive(Debug, Clone)]
struct StoredBook {
    fields: BookFields,
    attachment: Option<StoredAttachment>,
}

impl StoredBook {
    fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        let field_matches =
            |value: &str| -> bool { value.to_lowercase().contains(&term) };
        field_matches(&self.fields.title)
            || field_matches(&self.fields.author)
            || self.fields.genre.as_deref().is_some_and(field_matches)
            || self.fields.language.as_deref().is_some_and(field_matches)
    }
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    // BTreeMap keeps iteration in id (insertion) order
    books: BTreeMap<i64, StoredBook>,
}

/// Catalog repository holding every row in process memory.
#[derive(Default)]
pub struct MemoryCatalog {
    inner: RwLock<Inner>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogRepository for MemoryCatalog {
    async fn list(&self, query: &BookQuery) -> Result<(Vec<BookSummary>, i64)> {
        let inner = self.inner.read().await;
        let matching: Vec<(&i64, &StoredBook)> = inner
            .books
            .iter()
            .filter(|(_, book)| match query.search() {
                Some(term) => book.matches(term),
                None => true,
            })
            .collect();

        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(query.offset() as usize)
            .take(query.limit() as usize)
            .map(|(id, book)| BookSummary {
                id: *id,
                title: book.fields.title.clone(),
                author: book.fields.author.clone(),
                year: book.fields.year,
                genre: book.fields.genre.clone(),
                language: book.fields.language.clone(),
                pdf_filename: book
                    .attachment
                    .as_ref()
                    .map(|stored| stored.filename.clone()),
            })
            .collect();

        Ok((items, total))
    }

    async fn get(&self, id: i64) -> Result<Option<Book>> {
        let inner = self.inner.read().await;
        Ok(inner.books.get(&id).map(|book| Book {
            id,
            title: book.fields.title.clone(),
            author: book.fields.author.clone(),
            year: book.fields.year,
            genre: book.fields.genre.clone(),
            language: book.fields.language.clone(),
            attachment: book.attachment.as_ref().map(|stored| AttachmentInfo {
                filename: stored.filename.clone(),
                mime: stored.mime.clone(),
            }),
        }))
    }

    async fn insert(
        &self,
        fields: &BookFields,
        attachment: Option<&StoredAttachment>,
    ) -> Result<i64> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let id = inner.next_id;
        inner.books.insert(
            id,
            StoredBook {
                fields: fields.clone(),
                attachment: attachment.cloned(),
            },
        );
        Ok(id)
    }

    async fn update(
        &self,
        id: i64,
        fields: &BookFields,
        attachment: Option<&StoredAttachment>,
    ) -> Result<u64> {
        let mut inner = self.inner.write().await;
        match inner.books.get_mut(&id) {
            Some(book) => {
                book.fields = fields.clone();
                if let Some(stored) = attachment {
                    book.attachment = Some(stored.clone());
                }
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete(&self, id: i64) -> Result<u64> {
        let mut inner = self.inner.write().await;
        Ok(inner.books.remove(&id).map_or(0, |_| 1))
    }

    async fn fetch_attachment(&self, id: i64) -> Result<Option<StoredAttachment>> {
        let inner = self.inner.read().await;
        Ok(inner
            .books
            .get(&id)
            .and_then(|book| book.attachment.clone()))
    }

    async fn attachment_path(&self, id: i64) -> Result<Option<String>> {
        let inner = self.inner.read().await;
        Ok(inner.books.get(&id).and_then(|book| {
            match &book.attachment {
                Some(StoredAttachment {
                    payload: AttachmentRef::File(path),
                    ..
                }) => Some(path.clone()),
                _ => None,
            }
        }))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
