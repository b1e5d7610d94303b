//! Shared object naming for storage backends.
//!
//! Object name format: `{folder}/{uuid}{ext}`, or `{uuid}{ext}` at the bucket
//! root. The extension is taken verbatim from the original filename. Names are
//! never reused, so resolving a name by prefix yields at most one object.

use std::path::Path;
use uuid::Uuid;

/// Generate a fresh object name for an upload.
pub fn generate_object_name(folder: Option<&str>, original_name: &str) -> String {
    let extension = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default();

    match folder.map(|f| f.trim_matches('/')).filter(|f| !f.is_empty()) {
        Some(folder) => format!("{}/{}{}", folder, Uuid::new_v4(), extension),
        None => format!("{}{}", Uuid::new_v4(), extension),
    }
}

/// Build the public download URL of an object.
pub fn public_url(download_url: &str, bucket_name: &str, object_name: &str) -> String {
    format!(
        "{}/file/{}/{}",
        download_url.trim_end_matches('/'),
        bucket_name,
        encode_object_name(object_name)
    )
}

/// Percent-encode each path segment of an object name, keeping the `/`
/// separators. [`object_name_from_url`] decodes it back to the exact name.
pub fn encode_object_name(object_name: &str) -> String {
    object_name
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Recover the object name from a public URL issued for `bucket_name`.
///
/// Returns `None` when the URL lacks the `/file/{bucket_name}/` marker or has
/// nothing after it.
pub fn object_name_from_url(public_url: &str, bucket_name: &str) -> Option<String> {
    let marker = format!("/file/{}/", bucket_name);
    let start = public_url.find(&marker)? + marker.len();
    strip_to_key(&public_url[start..])
}

/// Recover the object name from a URL under `base_url`.
pub fn object_name_from_base(public_url: &str, base_url: &str) -> Option<String> {
    let prefix = format!("{}/", base_url.trim_end_matches('/'));
    strip_to_key(public_url.strip_prefix(&prefix)?)
}

fn strip_to_key(suffix: &str) -> Option<String> {
    let suffix = suffix
        .split(['?', '#'])
        .next()
        .unwrap_or_default();

    let decoded = urlencoding::decode(suffix).ok()?.into_owned();
    if decoded.is_empty() {
        None
    } else {
        Some(decoded)
    }
}
