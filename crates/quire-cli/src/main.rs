//! Quire CLI: manual access to the object storage client.
//!
//! Reads the same environment as the server (STORAGE_BACKEND, B2_KEY_ID,
//! B2_APPLICATION_KEY, B2_BUCKET_NAME, ...). A `.env` file is honoured.

use anyhow::Context;
use clap::{Parser, Subcommand};
use quire_cli::{init_tracing, print_json, resolve_content_type, UploadReport};
use quire_core::{Config, DefaultImageKind, StorageBackend};
use quire_storage::{create_storage, B2Storage, DefaultAssets};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "quire", about = "Quire object storage CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload an image and print its public URL (or the placeholder used instead)
    Upload {
        /// Path to the image
        file: std::path::PathBuf,
        /// Folder to store under: profiles, banners, articles, defaults
        #[arg(long)]
        folder: Option<String>,
        /// MIME type; inferred from the extension when omitted
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Delete an object by its public URL
    Delete {
        /// Public URL returned by a previous upload
        url: String,
    },
    /// Run the default-image bootstrap and print the resulting URLs
    Defaults {
        /// Seconds to wait for the bootstrap to finish
        #[arg(long, default_value = "30")]
        wait: u64,
    },
    /// Authorize against B2 and print the session (token omitted)
    Session,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(config.log_format());
    config.validate().context("Invalid configuration")?;

    match cli.command {
        Commands::Upload {
            file,
            folder,
            content_type,
        } => {
            let content_type = resolve_content_type(&file, content_type.as_deref())?;
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let original_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            let storage = create_storage(&config).await?;
            let outcome = storage
                .upload(data.into(), &original_name, &content_type, folder.as_deref())
                .await;
            print_json(&UploadReport::from(outcome))?;
        }
        Commands::Delete { url } => {
            let storage = create_storage(&config).await?;
            let deleted = storage.delete(&url).await;
            print_json(&serde_json::json!({ "url": url, "deleted": deleted }))?;
        }
        Commands::Defaults { wait } => {
            let storage = create_storage(&config).await?;
            let defaults = Arc::new(DefaultAssets::new(config.defaults().clone()));
            defaults.spawn_bootstrap(storage);

            let finished = defaults
                .wait_until_finished(Duration::from_secs(wait))
                .await;
            if !finished {
                tracing::warn!(wait_secs = wait, "Bootstrap did not finish in time");
            }

            let registry = defaults.registry();
            print_json(&serde_json::json!({
                "finished": finished,
                "state": format!("{:?}", defaults.state()),
                "banner_primary": registry.banner_primary,
                "profile_avatar": registry.profile_avatar,
                "resolved": {
                    "banner": defaults.default_image_url(DefaultImageKind::Banner),
                    "avatar": defaults.default_image_url(DefaultImageKind::Avatar),
                    "profile": defaults.default_image_url(DefaultImageKind::Profile),
                },
            }))?;
        }
        Commands::Session => {
            if config.storage_backend() != StorageBackend::B2 {
                anyhow::bail!("The session command requires STORAGE_BACKEND=b2");
            }
            let storage = B2Storage::from_config(config.storage())?;
            let session = storage.session().await.context("B2 authorization failed")?;
            print_json(&serde_json::json!({
                "api_url": session.api_url,
                "download_url": session.download_url,
                "account_id": session.account_id,
                "bucket_id": session.bucket_id,
                "expires_at": session.expires_at.to_rfc3339(),
            }))?;
        }
    }

    Ok(())
}
