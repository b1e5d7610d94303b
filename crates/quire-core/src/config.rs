//! Configuration module
//!
//! This module provides the configuration for the storage core: which backend
//! to use, object store credentials, request timeouts and the default-asset
//! bootstrap settings.
//!
//! Missing B2 credentials are not a load-time error. The storage client
//! reports them on first use so a process can boot (and serve fallbacks)
//! without object storage configured.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    B2_DEFAULT_API_URL, B2_REQUEST_TIMEOUT_SECS, B2_SESSION_TTL_HOURS, DEFAULTS_BOOTSTRAP_DELAY_SECS,
    DEFAULT_AVATAR_CANDIDATES, DEFAULT_AVATAR_FALLBACK, DEFAULT_BANNER_CANDIDATES,
    DEFAULT_BANNER_FALLBACK, UPLOAD_ATTRIBUTION,
};
use crate::storage_types::StorageBackend;

/// Object storage configuration
#[derive(Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub b2_key_id: Option<String>,
    pub b2_application_key: Option<String>,
    pub b2_bucket_name: Option<String>,
    /// Base URL used for `b2_authorize_account`; later calls use the
    /// `apiUrl` returned by the authorization.
    pub b2_api_url: String,
    pub b2_session_ttl: Duration,
    pub b2_request_timeout: Duration,
    pub upload_attribution: String,
    pub local_storage_path: Option<PathBuf>,
    pub local_storage_base_url: Option<String>,
}

// Credentials stay out of logs.
impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("backend", &self.backend)
            .field("b2_key_id", &self.b2_key_id)
            .field(
                "b2_application_key",
                &self.b2_application_key.as_ref().map(|_| "<redacted>"),
            )
            .field("b2_bucket_name", &self.b2_bucket_name)
            .field("b2_api_url", &self.b2_api_url)
            .field("b2_session_ttl", &self.b2_session_ttl)
            .field("b2_request_timeout", &self.b2_request_timeout)
            .field("upload_attribution", &self.upload_attribution)
            .field("local_storage_path", &self.local_storage_path)
            .field("local_storage_base_url", &self.local_storage_base_url)
            .finish()
    }
}

/// Default-asset bootstrap configuration
#[derive(Clone, Debug)]
pub struct DefaultsConfig {
    pub bootstrap_enabled: bool,
    pub bootstrap_delay: Duration,
    pub banner_candidates: Vec<PathBuf>,
    pub avatar_candidates: Vec<PathBuf>,
    pub banner_fallback: String,
    pub avatar_fallback: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            bootstrap_enabled: true,
            bootstrap_delay: Duration::from_secs(DEFAULTS_BOOTSTRAP_DELAY_SECS),
            banner_candidates: DEFAULT_BANNER_CANDIDATES.iter().map(PathBuf::from).collect(),
            avatar_candidates: DEFAULT_AVATAR_CANDIDATES.iter().map(PathBuf::from).collect(),
            banner_fallback: DEFAULT_BANNER_FALLBACK.to_string(),
            avatar_fallback: DEFAULT_AVATAR_FALLBACK.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub environment: String,
    pub log_format: String,
    pub storage: StorageConfig,
    pub defaults: DefaultsConfig,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<AppConfig>);

impl Config {
    fn as_app(&self) -> &AppConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let environment = self.as_app().environment.to_lowercase();
        environment == "production" || environment == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = AppConfig::from_lookup(lookup)?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_app().validate()
    }

    pub fn environment(&self) -> &str {
        &self.as_app().environment
    }

    pub fn log_format(&self) -> &str {
        &self.as_app().log_format
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.as_app().storage
    }

    pub fn defaults(&self) -> &DefaultsConfig {
        &self.as_app().defaults
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.as_app().storage.backend
    }

    pub fn b2_bucket_name(&self) -> Option<&str> {
        self.as_app().storage.b2_bucket_name.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&std::path::Path> {
        self.as_app().storage.local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.as_app().storage.local_storage_base_url.as_deref()
    }
}

impl AppConfig {
    fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = non_empty("ENVIRONMENT")
            .or_else(|| non_empty("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let backend = match non_empty("STORAGE_BACKEND") {
            Some(value) => value.parse::<StorageBackend>()?,
            None => StorageBackend::B2,
        };

        let session_ttl_hours = match non_empty("B2_SESSION_TTL_HOURS") {
            Some(value) => value
                .parse::<u64>()
                .map_err(|_| anyhow::anyhow!("B2_SESSION_TTL_HOURS must be a valid number"))?,
            None => B2_SESSION_TTL_HOURS,
        };

        let request_timeout_secs = match non_empty("B2_REQUEST_TIMEOUT_SECS") {
            Some(value) => value
                .parse::<u64>()
                .map_err(|_| anyhow::anyhow!("B2_REQUEST_TIMEOUT_SECS must be a valid number"))?,
            None => B2_REQUEST_TIMEOUT_SECS,
        };

        let storage = StorageConfig {
            backend,
            b2_key_id: non_empty("B2_KEY_ID"),
            b2_application_key: non_empty("B2_APPLICATION_KEY"),
            b2_bucket_name: non_empty("B2_BUCKET_NAME"),
            b2_api_url: non_empty("B2_API_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|| B2_DEFAULT_API_URL.to_string()),
            b2_session_ttl: Duration::from_secs(session_ttl_hours.saturating_mul(3600)),
            b2_request_timeout: Duration::from_secs(request_timeout_secs),
            upload_attribution: non_empty("UPLOAD_ATTRIBUTION")
                .unwrap_or_else(|| UPLOAD_ATTRIBUTION.to_string()),
            local_storage_path: non_empty("LOCAL_STORAGE_PATH").map(PathBuf::from),
            local_storage_base_url: non_empty("LOCAL_STORAGE_BASE_URL"),
        };

        let fallback = DefaultsConfig::default();
        let defaults = DefaultsConfig {
            bootstrap_enabled: non_empty("DEFAULTS_BOOTSTRAP_ENABLED")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(true),
            bootstrap_delay: non_empty("DEFAULTS_BOOTSTRAP_DELAY_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(fallback.bootstrap_delay),
            banner_candidates: non_empty("DEFAULT_BANNER_PATHS")
                .map(|v| parse_path_list(&v))
                .unwrap_or(fallback.banner_candidates),
            avatar_candidates: non_empty("DEFAULT_AVATAR_PATHS")
                .map(|v| parse_path_list(&v))
                .unwrap_or(fallback.avatar_candidates),
            banner_fallback: non_empty("DEFAULT_BANNER_FALLBACK")
                .unwrap_or(fallback.banner_fallback),
            avatar_fallback: non_empty("DEFAULT_AVATAR_FALLBACK")
                .unwrap_or(fallback.avatar_fallback),
        };

        Ok(AppConfig {
            environment,
            log_format: non_empty("LOG_FORMAT")
                .map(|v| v.to_lowercase())
                .unwrap_or_else(|| "pretty".to_string()),
            storage,
            defaults,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.storage.b2_session_ttl.is_zero() {
            return Err(anyhow::anyhow!(
                "B2_SESSION_TTL_HOURS must be greater than zero"
            ));
        }

        if self.storage.b2_session_ttl > Duration::from_secs(24 * 3600) {
            return Err(anyhow::anyhow!(
                "B2_SESSION_TTL_HOURS cannot exceed the 24h token lifetime"
            ));
        }

        if self.storage.b2_request_timeout.is_zero() {
            return Err(anyhow::anyhow!(
                "B2_REQUEST_TIMEOUT_SECS must be greater than zero"
            ));
        }

        match self.storage.backend {
            StorageBackend::B2 => {
                // Credentials are checked lazily by the storage client.
            }
            StorageBackend::Local => {
                if self.storage.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.storage.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }
}

fn parse_path_list(value: &str) -> Vec<PathBuf> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}
