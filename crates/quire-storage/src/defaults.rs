//! Built-in default images (banner and avatar).
//!
//! Shortly after startup the bootstrap looks for the default images on local
//! disk, uploads whichever it finds into the `defaults` folder and records the
//! durable URLs. Until then, or if it fails, lookups return the static local
//! fallback paths. Bootstrap runs at most once per [`DefaultAssets`]; a restart
//! is needed to run it again.

use crate::outcome::UploadOutcome;
use crate::traits::AssetStorage;
use bytes::Bytes;
use quire_core::{AssetFolder, DefaultImageKind, DefaultsConfig};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Current URLs of the default images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultImageRegistry {
    pub banner_primary: String,
    pub profile_avatar: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapState {
    Pending,
    Running,
    Completed {
        banner_uploaded: bool,
        avatar_uploaded: bool,
    },
    /// Bootstrap is turned off in configuration; fallbacks are final.
    Disabled,
}

impl BootstrapState {
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            BootstrapState::Completed { .. } | BootstrapState::Disabled
        )
    }
}

#[derive(Debug, Clone)]
struct Snapshot {
    registry: DefaultImageRegistry,
    state: BootstrapState,
}

/// Default image registry with a one-shot upload bootstrap
pub struct DefaultAssets {
    config: DefaultsConfig,
    snapshot: watch::Sender<Snapshot>,
    started: AtomicBool,
}

impl DefaultAssets {
    pub fn new(config: DefaultsConfig) -> Self {
        let state = if config.bootstrap_enabled {
            BootstrapState::Pending
        } else {
            BootstrapState::Disabled
        };
        let (snapshot, _) = watch::channel(Snapshot {
            registry: DefaultImageRegistry {
                banner_primary: config.banner_fallback.clone(),
                profile_avatar: config.avatar_fallback.clone(),
            },
            state,
        });

        Self {
            config,
            snapshot,
            started: AtomicBool::new(false),
        }
    }

    /// Run the bootstrap in the background after the configured delay.
    pub fn spawn_bootstrap(self: &Arc<Self>, storage: Arc<dyn AssetStorage>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        let delay = self.config.bootstrap_delay;

        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            this.bootstrap(storage.as_ref()).await;
        })
    }

    /// Locate and upload the default images now.
    ///
    /// Only the first call does any work; later calls return the current state.
    pub async fn bootstrap(&self, storage: &dyn AssetStorage) -> BootstrapState {
        if !self.config.bootstrap_enabled {
            return BootstrapState::Disabled;
        }
        if self.started.swap(true, Ordering::SeqCst) {
            return self.state();
        }

        self.snapshot
            .send_modify(|s| s.state = BootstrapState::Running);
        tracing::info!("Bootstrapping default images");

        let banner = self
            .upload_first_found(storage, "banner", &self.config.banner_candidates)
            .await;
        let avatar = self
            .upload_first_found(storage, "avatar", &self.config.avatar_candidates)
            .await;

        let state = BootstrapState::Completed {
            banner_uploaded: banner.is_some(),
            avatar_uploaded: avatar.is_some(),
        };

        self.snapshot.send_modify(|s| {
            if let Some(url) = banner {
                s.registry.banner_primary = url;
            }
            if let Some(url) = avatar {
                s.registry.profile_avatar = url;
            }
            s.state = state;
        });

        tracing::info!(?state, "Default image bootstrap finished");
        state
    }

    /// Upload the first existing candidate; `None` leaves the fallback in place.
    async fn upload_first_found(
        &self,
        storage: &dyn AssetStorage,
        asset: &'static str,
        candidates: &[PathBuf],
    ) -> Option<String> {
        let Some(path) = first_existing(candidates).await else {
            tracing::warn!(
                asset,
                candidates = ?candidates,
                "No default image found on disk, keeping local fallback"
            );
            return None;
        };

        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(error = %e, asset, path = %path.display(), "Failed to read default image");
                return None;
            }
        };

        let original_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(asset)
            .to_string();

        let outcome = storage
            .upload(
                Bytes::from(data),
                &original_name,
                content_type_for(&path),
                Some(AssetFolder::Defaults.as_str()),
            )
            .await;

        match outcome {
            UploadOutcome::Stored(stored) => {
                tracing::info!(asset, url = %stored.url, "Default image uploaded");
                Some(stored.url)
            }
            UploadOutcome::Degraded { error, .. } => {
                tracing::warn!(error = %error, asset, "Default image upload degraded, keeping local fallback");
                None
            }
        }
    }

    /// URL to use for a default image right now. Never blocks.
    ///
    /// `Profile` is always empty: the UI renders an initials placeholder.
    pub fn default_image_url(&self, kind: DefaultImageKind) -> String {
        match kind {
            DefaultImageKind::Profile => String::new(),
            DefaultImageKind::Banner => self.snapshot.borrow().registry.banner_primary.clone(),
            DefaultImageKind::Avatar => self.snapshot.borrow().registry.profile_avatar.clone(),
        }
    }

    /// Like [`default_image_url`](Self::default_image_url), but first waits up
    /// to `timeout` for the bootstrap to finish.
    pub async fn default_image_url_within(
        &self,
        kind: DefaultImageKind,
        timeout: Duration,
    ) -> String {
        if kind != DefaultImageKind::Profile {
            self.wait_until_finished(timeout).await;
        }
        self.default_image_url(kind)
    }

    /// Wait for the bootstrap to finish. Returns `false` on timeout.
    pub async fn wait_until_finished(&self, timeout: Duration) -> bool {
        let mut rx = self.snapshot.subscribe();
        let finished = matches!(
            tokio::time::timeout(timeout, rx.wait_for(|s| s.state.is_finished())).await,
            Ok(Ok(_))
        );
        finished
    }

    pub fn state(&self) -> BootstrapState {
        self.snapshot.borrow().state
    }

    pub fn registry(&self) -> DefaultImageRegistry {
        self.snapshot.borrow().registry.clone()
    }
}

async fn first_existing(candidates: &[PathBuf]) -> Option<PathBuf> {
    for candidate in candidates {
        if tokio::fs::try_exists(candidate).await.unwrap_or(false) {
            return Some(candidate.clone());
        }
    }
    None
}

fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
