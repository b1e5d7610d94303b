//! Upload results as seen by callers.

use crate::traits::StorageError;
use quire_core::constants::{
    PLACEHOLDER_BANNER_URL, PLACEHOLDER_IMAGE_URL, PLACEHOLDER_PROFILE_URL,
};
use quire_core::AssetFolder;

/// An object that was actually written to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    /// Public URL handed back to callers.
    pub url: String,
    /// Key of the object inside the bucket.
    pub object_name: String,
    /// Backend-specific version id, when the backend has one.
    pub file_id: Option<String>,
}

/// Result of [`AssetStorage::upload`](crate::AssetStorage::upload).
///
/// Both variants carry a displayable URL; `Degraded` also keeps the error so
/// callers can decide between retrying and accepting the placeholder.
#[derive(Debug)]
pub enum UploadOutcome {
    Stored(StoredAsset),
    Degraded {
        placeholder_url: String,
        error: StorageError,
    },
}

impl UploadOutcome {
    pub fn url(&self) -> &str {
        match self {
            UploadOutcome::Stored(asset) => &asset.url,
            UploadOutcome::Degraded {
                placeholder_url, ..
            } => placeholder_url,
        }
    }

    pub fn into_url(self) -> String {
        match self {
            UploadOutcome::Stored(asset) => asset.url,
            UploadOutcome::Degraded {
                placeholder_url, ..
            } => placeholder_url,
        }
    }

    pub fn is_stored(&self) -> bool {
        matches!(self, UploadOutcome::Stored(_))
    }

    pub fn stored(&self) -> Option<&StoredAsset> {
        match self {
            UploadOutcome::Stored(asset) => Some(asset),
            UploadOutcome::Degraded { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&StorageError> {
        match self {
            UploadOutcome::Stored(_) => None,
            UploadOutcome::Degraded { error, .. } => Some(error),
        }
    }
}

/// Placeholder returned when an upload into `folder` fails.
pub fn placeholder_for_folder(folder: Option<&str>) -> &'static str {
    match folder.and_then(|f| f.parse::<AssetFolder>().ok()) {
        Some(AssetFolder::Profiles) => PLACEHOLDER_PROFILE_URL,
        Some(AssetFolder::Banners) => PLACEHOLDER_BANNER_URL,
        _ => PLACEHOLDER_IMAGE_URL,
    }
}

/// True when `url` is one of the fixed placeholder URLs.
pub fn is_placeholder_url(url: &str) -> bool {
    [
        PLACEHOLDER_PROFILE_URL,
        PLACEHOLDER_BANNER_URL,
        PLACEHOLDER_IMAGE_URL,
    ]
    .contains(&url)
}
