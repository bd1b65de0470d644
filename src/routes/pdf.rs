//! Attachment streaming routes.
//!
//! - `/view-pdf/{id}` - `Content-Disposition: inline` (render in browser)
//! - `/download-pdf/{id}` - `Content-Disposition: attachment`

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use tracing::instrument;

use crate::errors::{AppError, Result};
use crate::services::AppState;

#[instrument(skip(state))]
pub async fn view_pdf(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response> {
    serve_attachment(&state, id, "inline").await
}

#[instrument(skip(state))]
pub async fn download_pdf(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response> {
    serve_attachment(&state, id, "attachment").await
}

async fn serve_attachment(state: &AppState, id: i64, disposition: &str) -> Result<Response> {
    let (bytes, filename, mime) = state.catalog.fetch_attachment(id).await?;

    let mime = if mime.is_empty() {
        "application/pdf".to_string()
    } else {
        mime
    };
    let filename = safe_header_filename(&filename);

    let content_type = HeaderValue::from_str(&mime)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid stored MIME type: {e}")))?;
    let content_disposition =
        HeaderValue::from_str(&format!("{disposition}; filename=\"{filename}\""))
            .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid stored filename: {e}")))?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, content_disposition),
        ],
        bytes,
    )
        .into_response())
}

/// Keep the filename printable ASCII without quotes so it is a valid
/// quoted-string header parameter.
fn safe_header_filename(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .filter(|c| *c != '"' && *c != '\\')
        .collect();
    if cleaned.is_empty() {
        "document.pdf".to_string()
    } else {
        cleaned
    }
}
