use once_cell::sync::Lazy;
use std::env;

/// Configuration constants for the backend

/// Path to the SQLite database file
/// Read once at startup from VETKA_DB environment variable
pub static DATABASE_PATH: Lazy<String> =
    Lazy::new(|| env::var("VETKA_DB").unwrap_or_else(|_| "vetka.sqlite".to_string()));

/// HTTP port for the combined public + admin API
/// Read from PORT environment variable, defaults to 8080
pub static WEB_PORT: Lazy<u16> = Lazy::new(|| {
    env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8080)
});

/// Static bearer token for the admin surface
///
/// The real admin authentication system (JWT, sessions) is an external
/// collaborator; this token is the "is this caller an admin" precondition
/// for deployments where that collaborator fronts this service directly.
/// When unset, every admin request is rejected.
pub static ADMIN_TOKEN: Lazy<Option<String>> = Lazy::new(|| {
    env::var("ADMIN_TOKEN").ok().filter(|t| !t.is_empty())
});

/// Search query bounds
pub mod search {
    /// Minimum normalized query length in characters
    pub const MIN_QUERY_CHARS: usize = 2;

    /// Maximum normalized query length in characters
    pub const MAX_QUERY_CHARS: usize = 100;

    /// Longest permitted run of one repeated character; longer runs
    /// (4+ with this value) reject the query. Anti-noise heuristic.
    pub const MAX_CHAR_RUN: usize = 3;

    /// Default result limit when the caller does not supply one
    pub const DEFAULT_LIMIT: i64 = 10;

    /// Upper bound on the caller-supplied result limit
    pub const MAX_LIMIT: i64 = 100;
}

/// Content payload bounds
pub mod content {
    /// Maximum menu item title length
    pub const MAX_TITLE_CHARS: usize = 255;

    /// Maximum caption length (Telegram caps captions at 1024 characters)
    pub const MAX_CAPTION_CHARS: usize = 1024;

    /// Minimum plausible length of an opaque remote file handle
    pub const MIN_FILE_ID_CHARS: usize = 10;

    /// Maximum declared file size (50 MB, the standard Bot API ceiling)
    pub const MAX_FILE_SIZE_BYTES: i64 = 50 * 1024 * 1024;
}

/// Admin listing pagination
pub mod pagination {
    /// Default page size for admin listings
    pub const DEFAULT_PAGE_SIZE: i64 = 20;

    /// Maximum page size for admin listings
    pub const MAX_PAGE_SIZE: i64 = 100;
}
