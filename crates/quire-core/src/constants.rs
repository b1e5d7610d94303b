//! Application-wide constants.

/// Default base URL for account authorization against Backblaze B2.
pub const B2_DEFAULT_API_URL: &str = "https://api.backblazeb2.com";

/// Version prefix of the native B2 REST API.
pub const B2_API_VERSION_PATH: &str = "/b2api/v2";

/// Sessions are refreshed before the real 24h token lifetime runs out.
pub const B2_SESSION_TTL_HOURS: u64 = 22;

pub const B2_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const B2_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Attribution recorded in the `X-Bz-Info-Author` header of every upload.
pub const UPLOAD_ATTRIBUTION: &str = "quire";

/// Informational cache hint stored with each object (one day).
pub const UPLOAD_CACHE_CONTROL_HINT: &str = "public, max-age=86400";

/// Returned instead of a stored URL when a profile photo upload fails.
pub const PLACEHOLDER_PROFILE_URL: &str = "https://placehold.co/400x400?text=Profile";

/// Returned instead of a stored URL when a banner upload fails.
pub const PLACEHOLDER_BANNER_URL: &str = "https://placehold.co/1200x400?text=Banner";

/// Returned instead of a stored URL for any other failed upload.
pub const PLACEHOLDER_IMAGE_URL: &str = "https://placehold.co/800x600?text=Image";

/// Seconds the default-asset bootstrap waits after startup.
pub const DEFAULTS_BOOTSTRAP_DELAY_SECS: u64 = 5;

pub const DEFAULT_BANNER_FALLBACK: &str = "/images/default-banner.jpg";
pub const DEFAULT_AVATAR_FALLBACK: &str = "/images/default-avatar.png";

/// Candidate locations searched, in order, for the default banner image.
pub const DEFAULT_BANNER_CANDIDATES: &[&str] = &[
    "public/images/default-banner.jpg",
    "assets/default-banner.jpg",
    "static/images/default-banner.jpg",
];

/// Candidate locations searched, in order, for the default avatar image.
pub const DEFAULT_AVATAR_CANDIDATES: &[&str] = &[
    "public/images/default-avatar.png",
    "assets/default-avatar.png",
    "static/images/default-avatar.png",
];
