#[cfg(feature = "storage-b2")]
use crate::B2Storage;
#[cfg(feature = "storage-local")]
use crate::LocalStorage;
use crate::{AssetStorage, StorageBackend, StorageError, StorageResult};
use quire_core::Config;
use std::sync::Arc;

/// Create a storage backend based on configuration
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn AssetStorage>> {
    match config.storage_backend() {
        #[cfg(feature = "storage-b2")]
        StorageBackend::B2 => {
            if config.b2_bucket_name().is_none() {
                tracing::warn!(
                    "B2_BUCKET_NAME not configured, uploads will return placeholders"
                );
            }
            let storage = B2Storage::from_config(config.storage())?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-b2"))]
        StorageBackend::B2 => Err(StorageError::Config(
            "B2 storage backend not available (storage-b2 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let base_path = config.local_storage_path().ok_or_else(|| {
                StorageError::Config("LOCAL_STORAGE_PATH not configured".to_string())
            })?;
            let base_url = config
                .local_storage_base_url()
                .map(String::from)
                .ok_or_else(|| {
                    StorageError::Config("LOCAL_STORAGE_BASE_URL not configured".to_string())
                })?;

            let storage = LocalStorage::new(base_path, base_url).await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::Config(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, String)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
    }

    #[cfg(feature = "storage-b2")]
    #[tokio::test]
    async fn test_b2_backend_builds_without_credentials() {
        let storage = create_storage(&config_from(&[])).await.unwrap();
        assert_eq!(storage.backend_type(), StorageBackend::B2);
    }

    #[cfg(feature = "storage-local")]
    #[tokio::test]
    async fn test_local_backend() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_from(&[
            ("STORAGE_BACKEND", "local".to_string()),
            ("LOCAL_STORAGE_PATH", dir.path().display().to_string()),
            (
                "LOCAL_STORAGE_BASE_URL",
                "http://localhost:4000/media".to_string(),
            ),
        ]);

        let storage = create_storage(&config).await.unwrap();
        assert_eq!(storage.backend_type(), StorageBackend::Local);
    }

    #[cfg(feature = "storage-local")]
    #[tokio::test]
    async fn test_local_backend_requires_path() {
        let config = config_from(&[("STORAGE_BACKEND", "local".to_string())]);
        assert!(matches!(
            create_storage(&config).await,
            Err(StorageError::Config(_))
        ));
    }
}
