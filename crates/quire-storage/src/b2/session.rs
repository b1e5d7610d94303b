//! Account session cache for the B2 backend.
//!
//! Authorizing the account is rate sensitive and the token stays valid for a
//! fixed window, so one session is shared by every upload and delete of a
//! `B2Storage` instance and only refreshed once it is past `expires_at`.
//! Concurrent callers that find the session expired wait on a single refresh.

use super::api::B2Api;
use crate::traits::{StorageError, StorageResult};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

/// Account key pair and the bucket every call targets.
#[derive(Clone)]
pub struct B2Credentials {
    pub key_id: Option<String>,
    pub application_key: Option<String>,
    pub bucket_name: Option<String>,
}

impl std::fmt::Debug for B2Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("B2Credentials")
            .field("key_id", &self.key_id)
            .field("bucket_name", &self.bucket_name)
            .finish_non_exhaustive()
    }
}

/// Authorized account session
#[derive(Clone)]
pub struct AuthSession {
    pub auth_token: String,
    pub api_url: String,
    pub download_url: String,
    pub account_id: String,
    pub bucket_id: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthSession {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("auth_token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("download_url", &self.download_url)
            .field("account_id", &self.account_id)
            .field("bucket_id", &self.bucket_id)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Lazily refreshed, single-flight session cache
pub struct SessionCache {
    api: B2Api,
    credentials: B2Credentials,
    ttl: Duration,
    session: RwLock<Option<Arc<AuthSession>>>,
    /// Held for the whole refresh so only one authorize round trip runs.
    refresh_lock: Mutex<()>,
}

impl SessionCache {
    pub fn new(api: B2Api, credentials: B2Credentials, ttl: Duration) -> Self {
        Self {
            api,
            credentials,
            ttl,
            session: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn bucket_name(&self) -> Option<&str> {
        self.credentials.bucket_name.as_deref()
    }

    /// Return the cached session, refreshing it first when absent or expired.
    pub async fn get_session(&self) -> StorageResult<Arc<AuthSession>> {
        if let Some(session) = self.current().await {
            return Ok(session);
        }

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited for the lock.
        if let Some(session) = self.current().await {
            return Ok(session);
        }

        let session = Arc::new(self.authorize().await?);
        *self.session.write().await = Some(session.clone());

        tracing::info!(
            api_url = %session.api_url,
            bucket_id = %session.bucket_id,
            expires_at = %session.expires_at,
            "B2 session refreshed"
        );

        Ok(session)
    }

    /// Drop `used` from the cache so the next call authorizes again.
    ///
    /// A session that was already replaced by a concurrent refresh is left
    /// alone.
    pub async fn invalidate(&self, used: &Arc<AuthSession>) {
        let mut cached = self.session.write().await;
        if cached.as_ref().is_some_and(|current| Arc::ptr_eq(current, used)) {
            *cached = None;
            tracing::info!("B2 session invalidated");
        }
    }

    async fn current(&self) -> Option<Arc<AuthSession>> {
        let now = Utc::now();
        self.session
            .read()
            .await
            .as_ref()
            .filter(|session| session.is_valid_at(now))
            .cloned()
    }

    async fn authorize(&self) -> StorageResult<AuthSession> {
        let key_id = self
            .credentials
            .key_id
            .as_deref()
            .ok_or_else(|| StorageError::Config("B2_KEY_ID not configured".to_string()))?;
        let application_key = self
            .credentials
            .application_key
            .as_deref()
            .ok_or_else(|| {
                StorageError::Config("B2_APPLICATION_KEY not configured".to_string())
            })?;
        let bucket_name = self
            .credentials
            .bucket_name
            .as_deref()
            .ok_or_else(|| StorageError::Config("B2_BUCKET_NAME not configured".to_string()))?;

        let start = std::time::Instant::now();

        let account = self
            .api
            .authorize_account(key_id, application_key)
            .await
            .inspect_err(|e| {
                tracing::error!(error = %e, key_id = %key_id, "B2 account authorization failed");
            })?;

        let buckets = self
            .api
            .list_buckets(
                &account.api_url,
                &account.authorization_token,
                &account.account_id,
            )
            .await
            .inspect_err(|e| {
                tracing::error!(error = %e, bucket = %bucket_name, "B2 bucket lookup failed");
            })?;

        let bucket = buckets
            .buckets
            .into_iter()
            .find(|b| b.bucket_name == bucket_name)
            .ok_or_else(|| {
                tracing::error!(bucket = %bucket_name, "Configured bucket not found in account");
                StorageError::BucketNotFound(bucket_name.to_string())
            })?;

        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|e| StorageError::Config(format!("Invalid session TTL: {}", e)))?;

        tracing::debug!(
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "B2 authorization round trip complete"
        );

        Ok(AuthSession {
            auth_token: account.authorization_token,
            api_url: account.api_url,
            download_url: account.download_url,
            account_id: account.account_id,
            bucket_id: bucket.bucket_id,
            expires_at: Utc::now() + ttl,
        })
    }
}
