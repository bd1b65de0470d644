//! Attachment storage strategies.
//!
//! Every strategy implements the same capability set
//! {persist, resolve, remove} over an opaque [`AttachmentRef`]; the
//! catalog never branches on which strategy is active.

mod filesystem;
mod inline;

pub use filesystem::FilesystemStore;
pub use inline::InlineStore;

use async_trait::async_trait;

use crate::db::models::AttachmentRef;
use crate::errors::Result;

/// Pluggable persistence for attachment payload bytes.
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Persist payload bytes and return the reference to record in the row.
    async fn persist(&self, bytes: &[u8], original_name: &str) -> Result<AttachmentRef>;

    /// Resolve a stored reference back to payload bytes.
    async fn resolve(&self, reference: &AttachmentRef) -> Result<Vec<u8>>;

    /// Discard the payload behind a reference. Tolerates an already
    /// missing payload; row deletion is handled by the caller.
    async fn remove(&self, reference: &AttachmentRef) -> Result<()>;
}
