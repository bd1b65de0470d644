use serde::Serialize;

/// Default page size when the client does not supply one.
const DEFAULT_LIMIT: i64 = 10;

/// A full catalog record, as returned by `get`.
///
/// Attachment payload bytes are never part of this type; `attachment`
/// carries metadata only.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub year: Option<i32>,
    pub genre: Option<String>,
    pub language: Option<String>,
    pub attachment: Option<AttachmentInfo>,
}

/// Attachment metadata attached to a [`Book`].
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentInfo {
    pub filename: String,
    pub mime: String,
}

/// One row of a paginated listing (attachment presence is conveyed by
/// `pdf_filename`).
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookSummary {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub year: Option<i32>,
    pub genre: Option<String>,
    pub language: Option<String>,
    pub pdf_filename: Option<String>,
}

/// The mutable scalar fields of a book.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookFields {
    pub title: String,
    pub author: String,
    pub year: Option<i32>,
    pub genre: Option<String>,
    pub language: Option<String>,
}

/// Reference to a persisted attachment payload. Which variant a row
/// carries depends on the storage strategy that was active when the
/// bytes were written.
#[derive(Debug, Clone, PartialEq)]
pub enum AttachmentRef {
    /// Payload bytes stored directly in the row.
    Inline(Vec<u8>),
    /// Generated filename under the managed upload directory.
    File(String),
}

/// A persisted attachment: metadata plus payload reference.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredAttachment {
    pub filename: String,
    pub mime: String,
    pub payload: AttachmentRef,
}

/// Immutable pagination/search parameters for one `list` call.
///
/// Built once per request from untrusted client input; construction
/// normalizes `page >= 1` and `limit >= 1`. There is deliberately no
/// upper bound on `limit`.
#[derive(Debug, Clone, PartialEq)]
pub struct BookQuery {
    page: i64,
    limit: i64,
    search: Option<String>,
}

impl BookQuery {
    pub fn new(page: Option<i64>, limit: Option<i64>, search: Option<String>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_LIMIT).max(1),
            // Empty string means "no filter"
            search: search.filter(|term| !term.is_empty()),
        }
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    /// Saturating: a page number far past the data yields a huge offset
    /// (and an empty page), never an overflow.
    pub fn offset(&self) -> i64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }

    /// Total page count for a pre-pagination match count:
    /// `ceil(total / limit)`, 0 when nothing matched.
    pub fn total_pages(&self, total: i64) -> i64 {
        if total == 0 {
            0
        } else {
            total.saturating_add(self.limit - 1) / self.limit
        }
    }
}

impl Default for BookQuery {
    fn default() -> Self {
        Self::new(None, None, None)
    }
}
