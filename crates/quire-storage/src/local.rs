use crate::keys::{encode_object_name, generate_object_name, object_name_from_base};
use crate::outcome::StoredAsset;
use crate::traits::{AssetStorage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation
///
/// Serves development setups without object storage credentials. Objects use
/// the same names as in B2; URLs are `{base_url}/{object_name}`.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file storage (e.g., "/var/lib/quire/media")
    /// * `base_url` - Base URL for serving files (e.g., "http://localhost:4000/media")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::Config(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Convert an object name to a filesystem path under the storage root.
    fn key_to_path(&self, object_name: &str) -> StorageResult<PathBuf> {
        if object_name.contains("..") || object_name.starts_with('/') || object_name.contains('\\')
        {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }

        let path = self.base_path.join(object_name);

        let base_canonical = self.base_path.canonicalize().map_err(|e| {
            StorageError::Config(format!("Failed to canonicalize base path: {}", e))
        })?;

        // Symlinks inside the root may point elsewhere; resolve the deepest
        // existing ancestor and require it to stay under the root.
        let resolved = match path.ancestors().find(|p| p.exists()) {
            Some(existing) => existing.canonicalize()?,
            None => base_canonical.clone(),
        };
        if !resolved.starts_with(&base_canonical) {
            return Err(StorageError::InvalidKey(
                "Storage key resolves outside storage directory".to_string(),
            ));
        }

        Ok(path)
    }

    fn generate_url(&self, object_name: &str) -> String {
        format!("{}/{}", self.base_url, encode_object_name(object_name))
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl AssetStorage for LocalStorage {
    async fn try_upload(
        &self,
        data: Bytes,
        original_name: &str,
        _content_type: &str,
        folder: Option<&str>,
    ) -> StorageResult<StoredAsset> {
        let object_name = generate_object_name(folder, original_name);
        let path = self.key_to_path(&object_name)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::File::create(&path).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;

        let url = self.generate_url(&object_name);

        tracing::info!(
            path = %path.display(),
            object_name = %object_name,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(StoredAsset {
            url,
            object_name,
            file_id: None,
        })
    }

    async fn try_delete(&self, public_url: &str) -> StorageResult<()> {
        let object_name = object_name_from_base(public_url, &self.base_url)
            .ok_or_else(|| StorageError::ForeignUrl(public_url.to_string()))?;
        let path = self.key_to_path(&object_name)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(object_name));
        }

        fs::remove_file(&path).await?;

        tracing::info!(
            path = %path.display(),
            object_name = %object_name,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
