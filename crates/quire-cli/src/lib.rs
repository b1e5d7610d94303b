//! Helpers shared by the `quire` binary.

use anyhow::Context;
use quire_storage::UploadOutcome;
use serde::Serialize;
use std::path::Path;

/// Content types accepted at the upload boundary.
pub const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// Initialize tracing for the CLI.
///
/// `RUST_LOG` wins when set; otherwise Quire crates log at info.
pub fn init_tracing(log_format: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("quire=info,warn"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Pick a MIME type from the file extension, or validate an explicit one.
pub fn resolve_content_type(path: &Path, explicit: Option<&str>) -> anyhow::Result<String> {
    let content_type = match explicit {
        Some(ct) => ct.trim().to_lowercase(),
        None => {
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_lowercase())
                .with_context(|| {
                    format!(
                        "Cannot infer content type of {}, pass --content-type",
                        path.display()
                    )
                })?;
            match ext.as_str() {
                "jpg" | "jpeg" => "image/jpeg".to_string(),
                "png" => "image/png".to_string(),
                "webp" => "image/webp".to_string(),
                other => anyhow::bail!("Unsupported file extension: {}", other),
            }
        }
    };

    if !ALLOWED_CONTENT_TYPES.contains(&content_type.as_str()) {
        anyhow::bail!(
            "Unsupported content type {} (allowed: {})",
            content_type,
            ALLOWED_CONTENT_TYPES.join(", ")
        );
    }

    Ok(content_type)
}

/// JSON shape printed after an upload.
#[derive(Debug, Serialize)]
pub struct UploadReport {
    pub url: String,
    pub stored: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<UploadOutcome> for UploadReport {
    fn from(outcome: UploadOutcome) -> Self {
        match outcome {
            UploadOutcome::Stored(asset) => UploadReport {
                url: asset.url,
                stored: true,
                object_name: Some(asset.object_name),
                file_id: asset.file_id,
                error: None,
            },
            UploadOutcome::Degraded {
                placeholder_url,
                error,
            } => UploadReport {
                url: placeholder_url,
                stored: false,
                object_name: None,
                file_id: None,
                error: Some(error.to_string()),
            },
        }
    }
}

pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}
