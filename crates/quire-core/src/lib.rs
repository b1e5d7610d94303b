//! Quire Core Library
//!
//! This crate provides configuration, constants and the small set of shared
//! types used by the Quire storage core and its command-line front end.

pub mod config;
pub mod constants;
pub mod storage_types;

// Re-export commonly used types
pub use config::{Config, DefaultsConfig, StorageConfig};
pub use storage_types::{AssetFolder, DefaultImageKind, StorageBackend};
