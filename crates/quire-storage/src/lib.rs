//! Quire Storage Library
//!
//! Object storage for profile photos, banners, article images and the
//! built-in default images. The B2 backend speaks the native B2 REST API; a
//! local filesystem backend covers development setups.
//!
//! # Caller contract
//!
//! - [`AssetStorage::upload`] always yields a displayable URL: the stored
//!   object's public URL, or a fixed placeholder when storage failed.
//! - [`AssetStorage::delete`] takes such a URL and reports `true` only when an
//!   object was actually removed.
//! - [`DefaultAssets::default_image_url`] resolves default banner/avatar URLs
//!   synchronously.
//!
//! # Object name format
//!
//! `{folder}/{uuid}{ext}` or `{uuid}{ext}` at the bucket root. Name generation
//! is centralized in the `keys` module so all backends stay consistent.

#[cfg(feature = "storage-b2")]
pub mod b2;
pub mod defaults;
pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod outcome;
pub mod traits;

// Re-export commonly used types
#[cfg(feature = "storage-b2")]
pub use b2::session::{AuthSession, B2Credentials};
#[cfg(feature = "storage-b2")]
pub use b2::B2Storage;
pub use defaults::{BootstrapState, DefaultAssets, DefaultImageRegistry};
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use outcome::{is_placeholder_url, placeholder_for_folder, StoredAsset, UploadOutcome};
pub use quire_core::{DefaultImageKind, StorageBackend};
pub use traits::{AssetStorage, StorageError, StorageResult};
