use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::db::models::{
    AttachmentInfo, AttachmentRef, Book, BookFields, BookQuery, BookSummary, StoredAttachment,
};
use crate::errors::Result;

/// Data-access contract for the book catalog.
///
/// Injected as `Arc<dyn CatalogRepository>` so the service layer never
/// depends on which datastore is active.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// One page of summaries in insertion order, plus the total count of
    /// matching rows before pagination.
    async fn list(&self, query: &BookQuery) -> Result<(Vec<BookSummary>, i64)>;

    /// Full record including attachment metadata, `None` when no row matches.
    async fn get(&self, id: i64) -> Result<Option<Book>>;

    /// Inserts a row and returns the newly assigned identifier.
    async fn insert(
        &self,
        fields: &BookFields,
        attachment: Option<&StoredAttachment>,
    ) -> Result<i64>;

    /// Updates scalar fields; attachment columns are only touched when a
    /// replacement is supplied. Returns rows affected (0 for a missing id).
    async fn update(
        &self,
        id: i64,
        fields: &BookFields,
        attachment: Option<&StoredAttachment>,
    ) -> Result<u64>;

    /// Deletes the row. Returns rows affected (0 for a missing id).
    async fn delete(&self, id: i64) -> Result<u64>;

    /// The stored attachment (metadata + payload reference), `None` when
    /// the row is missing or carries no attachment.
    async fn fetch_attachment(&self, id: i64) -> Result<Option<StoredAttachment>>;

    /// The on-disk reference of the stored payload, if it is file-backed.
    /// Used for cleanup after a replacing write has been recorded.
    async fn attachment_path(&self, id: i64) -> Result<Option<String>>;

    /// Connectivity probe for the readiness endpoint.
    async fn ping(&self) -> Result<()>;
}

/// Escape LIKE metacharacters and wrap the term in wildcards, so a
/// literal `%` or `_` in a search term matches itself.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Postgres-backed catalog repository.
#[derive(Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout))
            .connect(&config.url)
            .await?;
        Ok(Self { pool })
    }

    /// Create the `books` relation if it does not exist yet. The schema is
    /// never migrated beyond this.
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS books (
                id BIGSERIAL PRIMARY KEY,
                title TEXT NOT NULL,
                author TEXT NOT NULL,
                year INTEGER,
                genre TEXT,
                language TEXT,
                pdf_filename TEXT,
                pdf_mime TEXT,
                pdf_data BYTEA,
                pdf_path TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        tracing::info!("books relation initialized");
        Ok(())
    }
}

fn summary_from_row(row: &PgRow) -> BookSummary {
    BookSummary {
        id: row.get("id"),
        title: row.get("title"),
        author: row.get("author"),
        year: row.get("year"),
        genre: row.get("genre"),
        language: row.get("language"),
        pdf_filename: row.get("pdf_filename"),
    }
}

fn book_from_row(row: &PgRow) -> Book {
    let pdf_filename: Option<String> = row.get("pdf_filename");
    let pdf_mime: Option<String> = row.get("pdf_mime");
    Book {
        id: row.get("id"),
        title: row.get("title"),
        author: row.get("author"),
        year: row.get("year"),
        genre: row.get("genre"),
        language: row.get("language"),
        attachment: pdf_filename.map(|filename| AttachmentInfo {
            filename,
            mime: pdf_mime.unwrap_or_else(|| "application/pdf".to_string()),
        }),
    }
}

/// Attachment column values for a write, split by payload variant.
fn attachment_columns(
    attachment: Option<&StoredAttachment>,
) -> (
    Option<&str>,
    Option<&str>,
    Option<&[u8]>,
    Option<&str>,
) {
    match attachment {
        Some(stored) => {
            let (data, path) = match &stored.payload {
                AttachmentRef::Inline(bytes) => (Some(bytes.as_slice()), None),
                AttachmentRef::File(name) => (None, Some(name.as_str())),
            };
            (
                Some(stored.filename.as_str()),
                Some(stored.mime.as_str()),
                data,
                path,
            )
        }
        None => (None, None, None, None),
    }
}

#[async_trait]
impl CatalogRepository for PostgresCatalog {
    async fn list(&self, query: &BookQuery) -> Result<(Vec<BookSummary>, i64)> {
        let (total, rows) = match query.search() {
            Some(term) => {
                let pattern = like_pattern(term);
                let total: i64 = sqlx::query_scalar(
                    r#"
                    SELECT COUNT(*) FROM books
                    WHERE title ILIKE $1 OR author ILIKE $1
                       OR genre ILIKE $1 OR language ILIKE $1
                    "#,
                )
                .bind(&pattern)
                .fetch_one(&self.pool)
                .await?;

                let rows = sqlx::query(
                    r#"
                    SELECT id, title, author, year, genre, language, pdf_filename
                    FROM books
                    WHERE title ILIKE $1 OR author ILIKE $1
                       OR genre ILIKE $1 OR language ILIKE $1
                    ORDER BY id
                    LIMIT $2 OFFSET $3
                    "#,
                )
                .bind(&pattern)
                .bind(query.limit())
                .bind(query.offset())
                .fetch_all(&self.pool)
                .await?;

                (total, rows)
            }
            None => {
                let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
                    .fetch_one(&self.pool)
                    .await?;

                let rows = sqlx::query(
                    r#"
                    SELECT id, title, author, year, genre, language, pdf_filename
                    FROM books
                    ORDER BY id
                    LIMIT $1 OFFSET $2
                    "#,
                )
                .bind(query.limit())
                .bind(query.offset())
                .fetch_all(&self.pool)
                .await?;

                (total, rows)
            }
        };

        let items = rows.iter().map(summary_from_row).collect();
        Ok((items, total))
    }

    async fn get(&self, id: i64) -> Result<Option<Book>> {
        let row = sqlx::query(
            r#"
            SELECT id, title, author, year, genre, language, pdf_filename, pdf_mime
            FROM books WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| book_from_row(&row)))
    }

    async fn insert(
        &self,
        fields: &BookFields,
        attachment: Option<&StoredAttachment>,
    ) -> Result<i64> {
        let (filename, mime, data, path) = attachment_columns(attachment);
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO books
                (title, author, year, genre, language,
                 pdf_filename, pdf_mime, pdf_data, pdf_path)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(&fields.title)
        .bind(&fields.author)
        .bind(fields.year)
        .bind(&fields.genre)
        .bind(&fields.language)
        .bind(filename)
        .bind(mime)
        .bind(data)
        .bind(path)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn update(
        &self,
        id: i64,
        fields: &BookFields,
        attachment: Option<&StoredAttachment>,
    ) -> Result<u64> {
        let result = match attachment {
            Some(stored) => {
                let (filename, mime, data, path) = attachment_columns(Some(stored));
                sqlx::query(
                    r#"
                    UPDATE books
                    SET title = $1, author = $2, year = $3, genre = $4, language = $5,
                        pdf_filename = $6, pdf_mime = $7, pdf_data = $8, pdf_path = $9
                    WHERE id = $10
                    "#,
                )
                .bind(&fields.title)
                .bind(&fields.author)
                .bind(fields.year)
                .bind(&fields.genre)
                .bind(&fields.language)
                .bind(filename)
                .bind(mime)
                .bind(data)
                .bind(path)
                .bind(id)
                .execute(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    UPDATE books
                    SET title = $1, author = $2, year = $3, genre = $4, language = $5
                    WHERE id = $6
                    "#,
                )
                .bind(&fields.title)
                .bind(&fields.author)
                .bind(fields.year)
                .bind(&fields.genre)
                .bind(&fields.language)
                .bind(id)
                .execute(&self.pool)
                .await?
            }
        };

        Ok(result.rows_affected())
    }

    async fn delete(&self, id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn fetch_attachment(&self, id: i64) -> Result<Option<StoredAttachment>> {
        let row = sqlx::query(
            r#"
            SELECT pdf_filename, pdf_mime, pdf_data, pdf_path
            FROM books WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else { return Ok(None) };

        let filename: Option<String> = row.get("pdf_filename");
        let Some(filename) = filename else {
            return Ok(None);
        };

        let path: Option<String> = row.get("pdf_path");
        let data: Option<Vec<u8>> = row.get("pdf_data");
        let payload = match (path, data) {
            (Some(path), _) => AttachmentRef::File(path),
            (None, Some(bytes)) => AttachmentRef::Inline(bytes),
            // Metadata without payload: treat as no attachment.
            (None, None) => return Ok(None),
        };

        let mime: Option<String> = row.get("pdf_mime");
        Ok(Some(StoredAttachment {
            filename,
            mime: mime.unwrap_or_else(|| "application/pdf".to_string()),
            payload,
        }))
    }

    async fn attachment_path(&self, id: i64) -> Result<Option<String>> {
        let path: Option<Option<String>> =
            sqlx::query_scalar("SELECT pdf_path FROM books WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(path.flatten())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_wraps_in_wildcards() {
        assert_eq!(like_pattern("gabo"), "%gabo%");
    }

    #[test]
    fn like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("back\\slash"), "%back\\\\slash%");
    }
}
