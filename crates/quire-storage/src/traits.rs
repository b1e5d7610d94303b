//! Storage abstraction trait
//!
//! This module defines the AssetStorage trait that all storage backends must implement.

use crate::outcome::{placeholder_for_folder, StoredAsset, UploadOutcome};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Account credentials or bucket name are not configured.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Account authorization or bucket lookup was rejected upstream.
    #[error("Authorization failed during {stage}: {status} - {body}")]
    Auth {
        stage: &'static str,
        status: u16,
        body: String,
    },

    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    /// Getting an upload URL or sending the bytes failed.
    #[error("Upload failed during {stage}: {status} - {body}")]
    UploadProtocol {
        stage: &'static str,
        status: u16,
        body: String,
    },

    /// Listing or deleting the file version failed.
    #[error("Delete failed during {stage}: {status} - {body}")]
    DeletionProtocol {
        stage: &'static str,
        status: u16,
        body: String,
    },

    #[error("File not found: {0}")]
    NotFound(String),

    /// The URL was not issued by this backend (wrong bucket or host).
    #[error("URL does not belong to this storage: {0}")]
    ForeignUrl(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// The request never produced a response (DNS, TLS, timeout, reset).
    #[error("Transport error during {stage}: {message}")]
    Transport {
        stage: &'static str,
        message: String,
    },

    #[error("Failed to decode {stage} response: {message}")]
    Decode {
        stage: &'static str,
        message: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl StorageError {
    /// Upstream answered 401: the cached token is expired or revoked.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            StorageError::Auth { status: 401, .. }
                | StorageError::UploadProtocol { status: 401, .. }
                | StorageError::DeletionProtocol { status: 401, .. }
        )
    }

    /// Errors raised while establishing the account session.
    pub fn is_auth_related(&self) -> bool {
        matches!(
            self,
            StorageError::Config(_) | StorageError::Auth { .. } | StorageError::BucketNotFound(_)
        )
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction trait
///
/// Backends implement the fallible `try_upload` and `try_delete`. Callers use
/// `upload` and `delete`, which never fail: a failed upload degrades to a
/// placeholder URL and a failed delete reports `false`.
#[async_trait]
pub trait AssetStorage: Send + Sync {
    /// Store `data` under a fresh object name and return where it lives.
    ///
    /// `folder` of `None` or `Some("")` stores at the bucket root. Input is
    /// assumed to be validated (size, MIME type) by the HTTP intake layer.
    async fn try_upload(
        &self,
        data: Bytes,
        original_name: &str,
        content_type: &str,
        folder: Option<&str>,
    ) -> StorageResult<StoredAsset>;

    /// Delete the object a previously returned public URL points to.
    async fn try_delete(&self, public_url: &str) -> StorageResult<()>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;

    /// Upload and degrade to a placeholder on any failure.
    async fn upload(
        &self,
        data: Bytes,
        original_name: &str,
        content_type: &str,
        folder: Option<&str>,
    ) -> UploadOutcome {
        let size = data.len();
        match self
            .try_upload(data, original_name, content_type, folder)
            .await
        {
            Ok(asset) => UploadOutcome::Stored(asset),
            Err(e) => {
                let placeholder_url = placeholder_for_folder(folder);
                if e.is_auth_related() {
                    tracing::error!(
                        error = %e,
                        backend = %self.backend_type(),
                        original_name = %original_name,
                        folder = folder.unwrap_or(""),
                        size_bytes = size,
                        placeholder_url = %placeholder_url,
                        "Storage session unavailable, returning placeholder"
                    );
                } else {
                    tracing::warn!(
                        error = %e,
                        backend = %self.backend_type(),
                        original_name = %original_name,
                        folder = folder.unwrap_or(""),
                        size_bytes = size,
                        placeholder_url = %placeholder_url,
                        "Upload failed, returning placeholder"
                    );
                }
                UploadOutcome::Degraded {
                    placeholder_url: placeholder_url.to_string(),
                    error: e,
                }
            }
        }
    }

    /// Delete by public URL. Returns `false` on any inability to delete.
    async fn delete(&self, public_url: &str) -> bool {
        match self.try_delete(public_url).await {
            Ok(()) => true,
            Err(StorageError::NotFound(name)) => {
                tracing::debug!(
                    object_name = %name,
                    backend = %self.backend_type(),
                    "Nothing to delete, object already gone"
                );
                false
            }
            Err(StorageError::ForeignUrl(url)) => {
                tracing::debug!(url = %url, "Refusing to delete URL from another bucket");
                false
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    url = %public_url,
                    backend = %self.backend_type(),
                    "Delete failed"
                );
                false
            }
        }
    }
}
