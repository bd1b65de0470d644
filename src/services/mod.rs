use std::sync::Arc;

use crate::db::CatalogRepository;
use crate::services::catalog::CatalogService;
use crate::storage::AttachmentStore;

pub mod catalog;

// A container for everything the routes need
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogService>,
    /// Largest accepted PDF upload, enforced at the multipart boundary.
    pub upload_max_bytes: usize,
}

impl AppState {
    pub fn new(
        repo: Arc<dyn CatalogRepository>,
        store: Arc<dyn AttachmentStore>,
        upload_max_bytes: usize,
    ) -> Self {
        Self {
            catalog: Arc::new(CatalogService::new(repo, store)),
            upload_max_bytes,
        }
    }
}
