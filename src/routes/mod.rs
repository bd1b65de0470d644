pub mod books;
pub mod health;
pub mod pdf;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::middleware as app_middleware;
use crate::services::AppState;

/// Headroom on top of the upload cap for multipart framing and the
/// scalar form fields.
const BODY_LIMIT_SLACK: usize = 64 * 1024;

pub fn create_router(state: AppState) -> Router {
    let body_limit = state.upload_max_bytes + BODY_LIMIT_SLACK;

    Router::new()
        .route(
            "/api/books",
            get(books::list_books).post(books::create_book),
        )
        .route(
            "/api/books/{id}",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        .route("/view-pdf/{id}", get(pdf::view_pdf))
        .route("/download-pdf/{id}", get(pdf::download_pdf))
        .route("/health", get(health::health_check))
        .route("/readiness", get(health::readiness_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum::middleware::from_fn(app_middleware::request_id))
}
