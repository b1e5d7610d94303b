use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Storage backend types
///
/// Defined in core because configuration selects the backend before the
/// storage crate is involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    B2,
    Local,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "b2" | "backblaze" => Ok(StorageBackend::B2),
            "local" => Ok(StorageBackend::Local),
            _ => Err(anyhow::anyhow!("Invalid storage backend: {}", s)),
        }
    }
}

impl Display for StorageBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StorageBackend::B2 => write!(f, "b2"),
            StorageBackend::Local => write!(f, "local"),
        }
    }
}

/// Logical folders callers upload into.
///
/// The folder decides the first path segment of the stored object name and
/// which placeholder is returned when an upload degrades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetFolder {
    Profiles,
    Banners,
    Articles,
    Defaults,
}

impl AssetFolder {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetFolder::Profiles => "profiles",
            AssetFolder::Banners => "banners",
            AssetFolder::Articles => "articles",
            AssetFolder::Defaults => "defaults",
        }
    }
}

impl FromStr for AssetFolder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_matches('/').to_lowercase().as_str() {
            "profiles" => Ok(AssetFolder::Profiles),
            "banners" => Ok(AssetFolder::Banners),
            "articles" => Ok(AssetFolder::Articles),
            "defaults" => Ok(AssetFolder::Defaults),
            _ => Err(anyhow::anyhow!("Unknown asset folder: {}", s)),
        }
    }
}

impl Display for AssetFolder {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Kinds of built-in default image a caller can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultImageKind {
    /// Article and profile banner.
    Banner,
    /// Profile picture as rendered by the UI. Always empty: the UI draws initials.
    Profile,
    /// The uploaded default avatar image itself.
    Avatar,
}

impl FromStr for DefaultImageKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "banner" => Ok(DefaultImageKind::Banner),
            "profile" => Ok(DefaultImageKind::Profile),
            "avatar" => Ok(DefaultImageKind::Avatar),
            _ => Err(anyhow::anyhow!("Unknown default image kind: {}", s)),
        }
    }
}
