//! Backblaze B2 storage backend
//!
//! Talks to the native B2 REST API. Public URLs have the form
//! `{downloadUrl}/file/{bucketName}/{objectName}` and are the only handle
//! callers keep; deletion maps them back to an object name and resolves the
//! file id with a prefix listing.

pub mod api;
pub mod session;

use crate::keys::{generate_object_name, object_name_from_url, public_url};
use crate::outcome::StoredAsset;
use crate::traits::{AssetStorage, StorageError, StorageResult};
use crate::StorageBackend;
use api::{B2Api, UploadFile};
use async_trait::async_trait;
use bytes::Bytes;
use quire_core::constants::UPLOAD_CACHE_CONTROL_HINT;
use quire_core::StorageConfig;
use session::{AuthSession, B2Credentials, SessionCache};
use sha1::{Digest, Sha1};
use std::sync::Arc;
use std::time::Duration;

/// B2 storage implementation
pub struct B2Storage {
    api: B2Api,
    sessions: SessionCache,
    attribution: String,
}

impl B2Storage {
    /// Create a new B2Storage instance
    ///
    /// Credentials are not checked here; a missing key or bucket surfaces as
    /// `StorageError::Config` on the first upload or delete.
    ///
    /// # Arguments
    /// * `api_url` - Base URL for account authorization (e.g. "https://api.backblazeb2.com")
    /// * `credentials` - Key id, application key and bucket name
    /// * `session_ttl` - How long an authorized session is reused
    /// * `request_timeout` - Per-request timeout for every B2 call
    pub fn new(
        api_url: &str,
        credentials: B2Credentials,
        session_ttl: Duration,
        request_timeout: Duration,
        attribution: impl Into<String>,
    ) -> StorageResult<Self> {
        let api = B2Api::new(api_url, request_timeout)?;
        let sessions = SessionCache::new(api.clone(), credentials, session_ttl);

        Ok(Self {
            api,
            sessions,
            attribution: attribution.into(),
        })
    }

    pub fn from_config(config: &StorageConfig) -> StorageResult<Self> {
        Self::new(
            &config.b2_api_url,
            B2Credentials {
                key_id: config.b2_key_id.clone(),
                application_key: config.b2_application_key.clone(),
                bucket_name: config.b2_bucket_name.clone(),
            },
            config.b2_session_ttl,
            config.b2_request_timeout,
            config.upload_attribution.clone(),
        )
    }

    /// Authorized session, refreshed when expired.
    pub async fn session(&self) -> StorageResult<Arc<AuthSession>> {
        self.sessions.get_session().await
    }

    fn bucket_name(&self) -> StorageResult<&str> {
        self.sessions
            .bucket_name()
            .ok_or_else(|| StorageError::Config("B2_BUCKET_NAME not configured".to_string()))
    }

    /// A 401 means the token was revoked early; drop it so the next call
    /// re-authorizes. The failing call is not retried.
    async fn note_failure(&self, error: &StorageError, session: &Arc<AuthSession>) {
        if error.is_unauthorized() {
            self.sessions.invalidate(session).await;
        }
    }

    async fn upload_inner(
        &self,
        session: &AuthSession,
        bucket_name: &str,
        data: Bytes,
        original_name: &str,
        content_type: &str,
        folder: Option<&str>,
    ) -> StorageResult<StoredAsset> {
        let target = self
            .api
            .get_upload_url(&session.api_url, &session.auth_token, &session.bucket_id)
            .await?;

        let sha1_hex = hex::encode(Sha1::digest(&data));
        let object_name = generate_object_name(folder, original_name);

        let uploaded = self
            .api
            .upload_file(
                &target,
                UploadFile {
                    file_name: &object_name,
                    content_type,
                    sha1_hex: &sha1_hex,
                    author: &self.attribution,
                    cache_control: UPLOAD_CACHE_CONTROL_HINT,
                    data,
                },
            )
            .await?;

        Ok(StoredAsset {
            url: public_url(&session.download_url, bucket_name, &object_name),
            object_name,
            file_id: Some(uploaded.file_id),
        })
    }

    async fn delete_inner(&self, session: &AuthSession, object_name: &str) -> StorageResult<()> {
        let listing = self
            .api
            .list_file_names(
                &session.api_url,
                &session.auth_token,
                &session.bucket_id,
                object_name,
                1,
            )
            .await?;

        // Names are unique, so the only acceptable match is the exact name.
        let file = listing
            .files
            .into_iter()
            .next()
            .filter(|f| f.file_name == object_name)
            .ok_or_else(|| StorageError::NotFound(object_name.to_string()))?;

        self.api
            .delete_file_version(
                &session.api_url,
                &session.auth_token,
                &file.file_name,
                &file.file_id,
            )
            .await?;

        Ok(())
    }
}

#[async_trait]
impl AssetStorage for B2Storage {
    async fn try_upload(
        &self,
        data: Bytes,
        original_name: &str,
        content_type: &str,
        folder: Option<&str>,
    ) -> StorageResult<StoredAsset> {
        let size = data.len();
        let start = std::time::Instant::now();

        let session = self.session().await?;
        let bucket_name = self.bucket_name()?;

        let result = self
            .upload_inner(
                &session,
                bucket_name,
                data,
                original_name,
                content_type,
                folder,
            )
            .await;

        match result {
            Ok(asset) => {
                tracing::info!(
                    bucket = %bucket_name,
                    object_name = %asset.object_name,
                    content_type = %content_type,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "B2 upload successful"
                );
                Ok(asset)
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %bucket_name,
                    original_name = %original_name,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "B2 upload failed"
                );
                self.note_failure(&e, &session).await;
                Err(e)
            }
        }
    }

    async fn try_delete(&self, public_url: &str) -> StorageResult<()> {
        let bucket_name = self.bucket_name()?;
        let object_name = object_name_from_url(public_url, bucket_name)
            .ok_or_else(|| StorageError::ForeignUrl(public_url.to_string()))?;

        let start = std::time::Instant::now();
        let session = self.session().await?;

        match self.delete_inner(&session, &object_name).await {
            Ok(()) => {
                tracing::info!(
                    bucket = %bucket_name,
                    object_name = %object_name,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "B2 delete successful"
                );
                Ok(())
            }
            Err(e) => {
                if !matches!(e, StorageError::NotFound(_)) {
                    tracing::error!(
                        error = %e,
                        bucket = %bucket_name,
                        object_name = %object_name,
                        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                        "B2 delete failed"
                    );
                }
                self.note_failure(&e, &session).await;
                Err(e)
            }
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::B2
    }
}
