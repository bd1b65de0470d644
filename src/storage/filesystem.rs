use async_trait::async_trait;
use rand::{distributions::Alphanumeric, Rng};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::db::models::AttachmentRef;
use crate::errors::Result;
use crate::storage::AttachmentStore;

/// Storage strategy writing each payload as a file under a managed
/// directory. The recorded reference is the generated filename.
pub struct FilesystemStore {
    root: PathBuf,
}

impl FilesystemStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Round-trip a write, read and delete under the managed directory so
    /// filesystem problems (permissions, missing mount) surface at startup.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| format!("create_dir_all({:?}): {e}", self.root))?;

        let probe = self.root.join(".health-check");
        let data = b"storage-health-check";
        fs::write(&probe, data)
            .await
            .map_err(|e| format!("write({probe:?}): {e}"))?;
        let read_back = fs::read(&probe)
            .await
            .map_err(|e| format!("read({probe:?}): {e}"))?;
        if read_back != data {
            return Err("read-back mismatch".to_string());
        }
        fs::remove_file(&probe)
            .await
            .map_err(|e| format!("remove_file({probe:?}): {e}"))?;

        Ok(())
    }

    fn full_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Collision-resistant filename: millisecond timestamp, random
    /// suffix, then the sanitized original name.
    fn generate_name(original: &str) -> String {
        let stamp = chrono::Utc::now().timestamp_millis();
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();
        format!("{stamp}-{suffix}-{}", sanitize_file_name(original))
    }
}

/// Reduce a client-supplied filename to a safe single path segment.
fn sanitize_file_name(original: &str) -> String {
    let base = Path::new(original)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches(['.', '_']).is_empty() {
        "document.pdf".to_string()
    } else {
        cleaned
    }
}

#[async_trait]
impl AttachmentStore for FilesystemStore {
    async fn persist(&self, bytes: &[u8], original_name: &str) -> Result<AttachmentRef> {
        let name = Self::generate_name(original_name);
        let full_path = self.full_path(&name);
        debug!(file = %name, size = bytes.len(), "persisting attachment file");

        // Atomic write: temp file + rename
        let temp_path = full_path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&temp_path, &full_path).await?;

        Ok(AttachmentRef::File(name))
    }

    async fn resolve(&self, reference: &AttachmentRef) -> Result<Vec<u8>> {
        match reference {
            // Rows written while the inline strategy was active stay readable.
            AttachmentRef::Inline(bytes) => Ok(bytes.clone()),
            AttachmentRef::File(name) => Ok(fs::read(self.full_path(name)).await?),
        }
    }

    async fn remove(&self, reference: &AttachmentRef) -> Result<()> {
        let AttachmentRef::File(name) = reference else {
            return Ok(());
        };
        let full_path = self.full_path(name);
        if fs::try_exists(&full_path).await? {
            fs::remove_file(&full_path).await?;
        } else {
            debug!(file = %name, "attachment file already gone");
        }
        Ok(())
    }
}
