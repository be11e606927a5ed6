use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::fs;
use tracing::{debug, info};

use colis_shared::crypto::digest;
use colis_shared::Digest;

use crate::error::ServerError;

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Content-addressed storage for opaque ciphertext.
///
/// Each blob is a file named by the lowercase hex BLAKE3 digest of its bytes.
/// Names are always 64 hex chars, so no caller input ever reaches the path.
#[derive(Debug, Clone)]
pub struct BlobStore {
    base_path: PathBuf,
    max_size: usize,
}

impl BlobStore {
    pub async fn new(base_path: PathBuf, max_size: usize) -> Result<Self, ServerError> {
        fs::create_dir_all(&base_path).await.map_err(|e| {
            ServerError::BlobStorage(format!(
                "Failed to create blob directory '{}': {}",
                base_path.display(),
                e
            ))
        })?;

        info!(path = %base_path.display(), "Blob store initialized");

        Ok(Self {
            base_path,
            max_size,
        })
    }

    /// Store `data` under its digest. Re-uploading identical bytes is a no-op.
    pub async fn store_blob(&self, data: &[u8]) -> Result<Digest, ServerError> {
        if data.is_empty() {
            return Err(ServerError::BadRequest("Empty blob".to_string()));
        }
        if data.len() > self.max_size {
            return Err(ServerError::BlobTooLarge {
                size: data.len(),
                max: self.max_size,
            });
        }

        let id = digest(data);
        let path = self.blob_path(&id);

        if fs::try_exists(&path).await.unwrap_or(false) {
            debug!(digest = %id.short(), "Blob already stored");
            return Ok(id);
        }

        // Write then rename so readers never see a partial blob. Each writer
        // gets its own temp file; identical uploads may race to the rename.
        let tmp = self.temp_path(&id);
        if let Err(e) = fs::write(&tmp, data).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(ServerError::BlobStorage(format!(
                "Failed to write blob {}: {}",
                id, e
            )));
        }
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            if fs::try_exists(&path).await.unwrap_or(false) {
                debug!(digest = %id.short(), "Blob committed by a concurrent upload");
                return Ok(id);
            }
            return Err(ServerError::BlobStorage(format!(
                "Failed to commit blob {}: {}",
                id, e
            )));
        }

        debug!(digest = %id.short(), size = data.len(), "Stored blob");
        Ok(id)
    }

    pub async fn get_blob(&self, id: &Digest) -> Result<Vec<u8>, ServerError> {
        let path = self.blob_path(id);

        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ServerError::BlobNotFound(*id));
            }
            Err(e) => {
                return Err(ServerError::BlobStorage(format!(
                    "Failed to read blob {}: {}",
                    id, e
                )));
            }
        };

        debug!(digest = %id.short(), size = data.len(), "Retrieved blob");
        Ok(data)
    }

    pub async fn delete_blob(&self, id: &Digest) -> Result<(), ServerError> {
        let path = self.blob_path(id);

        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ServerError::BlobNotFound(*id));
            }
            Err(e) => {
                return Err(ServerError::BlobStorage(format!(
                    "Failed to delete blob {}: {}",
                    id, e
                )));
            }
        }

        debug!(digest = %id.short(), "Deleted blob");
        Ok(())
    }

    pub async fn list_blobs(&self) -> Result<Vec<Digest>, ServerError> {
        let mut ids = Vec::new();
        let mut entries = fs::read_dir(&self.base_path)
            .await
            .map_err(|e| ServerError::BlobStorage(format!("Failed to list blobs: {}", e)))?;

        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            ServerError::BlobStorage(format!("Failed to read directory entry: {}", e))
        })? {
            if let Some(name) = entry.file_name().to_str() {
                if let Ok(id) = Digest::from_hex(name) {
                    ids.push(id);
                }
            }
        }

        Ok(ids)
    }

    fn blob_path(&self, id: &Digest) -> PathBuf {
        self.base_path.join(id.to_hex())
    }

    fn temp_path(&self, id: &Digest) -> PathBuf {
        let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
        self.base_path
            .join(format!("{}.{}.{}.tmp", id.to_hex(), std::process::id(), seq))
    }
}
