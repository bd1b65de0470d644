use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::db::models::{Book, BookFields, BookQuery, BookSummary};
use crate::errors::{AppError, Result};
use crate::services::catalog::{AttachmentUpload, PDF_MIME};
use crate::services::AppState;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub items: Vec<BookSummary>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

#[derive(Serialize)]
pub struct CreateResponse {
    pub id: i64,
}

#[derive(Serialize)]
pub struct UpdateResponse {
    pub changed: u64,
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub deleted: u64,
}

#[instrument(skip(state))]
pub async fn list_books(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>> {
    let query = BookQuery::new(params.page, params.limit, params.search);
    let (items, total) = state.catalog.list(&query).await?;

    Ok(Json(ListResponse {
        items,
        total,
        page: query.page(),
        limit: query.limit(),
        total_pages: query.total_pages(total),
    }))
}

#[instrument(skip(state))]
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Book>> {
    let book = state.catalog.get(id).await?;
    Ok(Json(book))
}

#[instrument(skip(state, multipart))]
pub async fn create_book(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<CreateResponse>)> {
    let (fields, upload) = read_book_form(multipart, state.upload_max_bytes).await?;
    let id = state.catalog.create(fields, upload).await?;
    Ok((StatusCode::CREATED, Json(CreateResponse { id })))
}

#[instrument(skip(state, multipart))]
pub async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<UpdateResponse>> {
    let (fields, upload) = read_book_form(multipart, state.upload_max_bytes).await?;
    let changed = state.catalog.update(id, fields, upload).await?;
    Ok(Json(UpdateResponse { changed }))
}

#[instrument(skip(state))]
pub async fn delete_book(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteResponse>> {
    let deleted = state.catalog.delete(id).await?;
    Ok(Json(DeleteResponse { deleted }))
}

fn bad_multipart(err: axum::extract::multipart::MultipartError) -> AppError {
    AppError::BadMultipart(err.to_string())
}

/// Parse the book form: scalar fields `title`, `author`, `year`, `genre`,
/// `language` plus the optional `pdf` file field. The declared MIME type
/// and the size cap are enforced here, before anything reaches the store.
async fn read_book_form(
    mut multipart: Multipart,
    max_bytes: usize,
) -> Result<(BookFields, Option<AttachmentUpload>)> {
    let mut fields = BookFields::default();
    let mut upload = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        match name.as_str() {
            "pdf" => {
                let filename = field
                    .file_name()
                    .map(str::to_owned)
                    .filter(|n| !n.is_empty());
                let mime = field.content_type().map(str::to_owned);
                let bytes = field.bytes().await.map_err(bad_multipart)?;

                // Browsers send an empty part when no file was chosen
                if bytes.is_empty() && filename.is_none() {
                    continue;
                }

                let mime = mime.unwrap_or_default();
                if mime != PDF_MIME {
                    return Err(AppError::UnsupportedAttachment(mime));
                }
                if bytes.len() > max_bytes {
                    return Err(AppError::AttachmentTooLarge {
                        size: bytes.len(),
                        limit: max_bytes,
                    });
                }

                upload = Some(AttachmentUpload {
                    filename: filename.unwrap_or_else(|| "document.pdf".to_string()),
                    mime,
                    bytes: bytes.to_vec(),
                });
            }
            "title" => fields.title = field.text().await.map_err(bad_multipart)?,
            "author" => fields.author = field.text().await.map_err(bad_multipart)?,
            "year" => {
                let raw = field.text().await.map_err(bad_multipart)?;
                fields.year = if raw.is_empty() {
                    None
                } else {
                    Some(raw.parse().map_err(|_| AppError::InvalidField {
                        field: "year",
                        message: format!("{raw:?} is not an integer"),
                    })?)
                };
            }
            "genre" => {
                fields.genre = Some(field.text().await.map_err(bad_multipart)?)
                    .filter(|v| !v.is_empty());
            }
            "language" => {
                fields.language = Some(field.text().await.map_err(bad_multipart)?)
                    .filter(|v| !v.is_empty());
            }
            // Unknown fields are ignored
            _ => {}
        }
    }

    Ok((fields, upload))
}
