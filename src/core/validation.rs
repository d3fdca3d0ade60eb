//! Input validation pipeline.
//!
//! All precondition checks on caller-supplied input live here, in one
//! place, so the same rule cannot diverge between two call paths:
//! - search query normalization and bounds
//! - content payload cross-field requirements
//! - rating range and activity cross-rules
//!
//! Every failure is an [`AppError::Validation`] raised before any
//! datastore statement executes.

use url::Url;

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::storage::activity::ActivityType;
use crate::storage::content::ContentType;

/// Characters rejected in search queries. Defense against downstream
/// rendering/injection in consumer surfaces; storage parameters are bound
/// regardless.
const UNSAFE_QUERY_CHARS: [char; 9] = ['<', '>', '{', '}', '[', ']', '\\', '|', '`'];

/// Normalize and validate a raw search query.
///
/// Normalization collapses internal whitespace runs to single spaces and
/// trims. The normalized form is what gets matched and what is recorded in
/// the resulting activity event.
///
/// # Errors
///
/// `Validation` if the normalized query is shorter than 2 or longer than
/// 100 characters, contains an unsafe character, or repeats any single
/// character 4 or more times consecutively.
pub fn validate_search_query(raw: &str) -> AppResult<String> {
    let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    let chars = normalized.chars().count();
    if chars < config::search::MIN_QUERY_CHARS {
        return Err(AppError::Validation(format!(
            "search query must be at least {} characters",
            config::search::MIN_QUERY_CHARS
        )));
    }
    if chars > config::search::MAX_QUERY_CHARS {
        return Err(AppError::Validation(format!(
            "search query must not exceed {} characters",
            config::search::MAX_QUERY_CHARS
        )));
    }

    if normalized.chars().any(|c| UNSAFE_QUERY_CHARS.contains(&c)) {
        return Err(AppError::Validation(
            "search query contains disallowed characters: < > { } [ ] \\ | `".to_string(),
        ));
    }

    let mut run = 0usize;
    let mut prev: Option<char> = None;
    for c in normalized.chars() {
        if Some(c) == prev {
            run += 1;
            if run > config::search::MAX_CHAR_RUN {
                return Err(AppError::Validation(
                    "search query contains too many repeated characters".to_string(),
                ));
            }
        } else {
            run = 1;
            prev = Some(c);
        }
    }

    Ok(normalized)
}

/// Borrowed view of the variant-dependent content fields, as supplied by a
/// create or a merged update request.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContentFields<'a> {
    pub telegram_file_id: Option<&'a str>,
    pub text_content: Option<&'a str>,
    pub external_url: Option<&'a str>,
    pub web_app_short_name: Option<&'a str>,
    pub local_file_path: Option<&'a str>,
}

/// Cross-field requirements per content type, checked before any content
/// write.
///
/// - `text` needs a non-empty text body;
/// - opaque-media kinds need a remote file handle or a pre-upload local path;
/// - URL kinds need an http(s) external URL;
/// - `web_app` needs an external URL or a short app name;
/// - `location` carries no extra requirement.
pub fn validate_content_requirements(
    content_type: ContentType,
    fields: &ContentFields<'_>,
) -> AppResult<()> {
    let present = |v: Option<&str>| v.is_some_and(|s| !s.trim().is_empty());

    match content_type {
        ContentType::Text => {
            if !present(fields.text_content) {
                return Err(AppError::Validation(
                    "text_content required for content type 'text'".to_string(),
                ));
            }
        }
        ContentType::Photo
        | ContentType::Video
        | ContentType::Document
        | ContentType::Audio
        | ContentType::Animation => {
            if !present(fields.telegram_file_id) && !present(fields.local_file_path) {
                return Err(AppError::Validation(format!(
                    "telegram_file_id or local_file_path required for content type '{content_type}'"
                )));
            }
        }
        ContentType::YoutubeUrl | ContentType::VkUrl | ContentType::ExternalUrl => {
            match fields.external_url {
                Some(u) if !u.trim().is_empty() => validate_external_url(u)?,
                _ => {
                    return Err(AppError::Validation(format!(
                        "external_url required for content type '{content_type}'"
                    )))
                }
            }
        }
        ContentType::WebApp => {
            if !present(fields.external_url) && !present(fields.web_app_short_name) {
                return Err(AppError::Validation(
                    "external_url or web_app_short_name required for content type 'web_app'"
                        .to_string(),
                ));
            }
            if let Some(u) = fields.external_url {
                if !u.trim().is_empty() {
                    validate_external_url(u)?;
                }
            }
        }
        ContentType::Location => {}
    }

    Ok(())
}

/// External URLs must be well-formed and use http or https.
pub fn validate_external_url(url: &str) -> AppResult<()> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(AppError::Validation(
            "external_url must start with http:// or https://".to_string(),
        ));
    }
    Url::parse(url)
        .map_err(|_| AppError::Validation(format!("external_url is not a valid URL: {url}")))?;
    Ok(())
}

/// Menu item titles are non-empty and bounded.
pub fn validate_title(title: &str) -> AppResult<()> {
    if title.trim().is_empty() {
        return Err(AppError::Validation("title must not be empty".to_string()));
    }
    if title.chars().count() > config::content::MAX_TITLE_CHARS {
        return Err(AppError::Validation(format!(
            "title must not exceed {} characters",
            config::content::MAX_TITLE_CHARS
        )));
    }
    Ok(())
}

/// Captions are capped at the transport's 1024-character limit.
pub fn validate_caption(caption: &str) -> AppResult<()> {
    if caption.chars().count() > config::content::MAX_CAPTION_CHARS {
        return Err(AppError::Validation(format!(
            "caption must not exceed {} characters",
            config::content::MAX_CAPTION_CHARS
        )));
    }
    Ok(())
}

/// Opaque remote file handles shorter than 10 characters are malformed.
pub fn validate_telegram_file_id(file_id: &str) -> AppResult<()> {
    if file_id.chars().count() < config::content::MIN_FILE_ID_CHARS {
        return Err(AppError::Validation(
            "telegram_file_id has an invalid format".to_string(),
        ));
    }
    Ok(())
}

/// Declared file sizes above the transport ceiling are rejected.
pub fn validate_file_size(file_size: i64) -> AppResult<()> {
    if file_size > config::content::MAX_FILE_SIZE_BYTES {
        return Err(AppError::Validation(format!(
            "file_size exceeds the maximum of {} MB",
            config::content::MAX_FILE_SIZE_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Ratings are integers 1–5.
pub fn validate_rating_value(rating: i64) -> AppResult<()> {
    if !(1..=5).contains(&rating) {
        return Err(AppError::Validation(
            "rating must be an integer between 1 and 5".to_string(),
        ));
    }
    Ok(())
}

/// Cross-rule between activity type and the rating field: a rating is
/// mandatory for `rating` events and forbidden everywhere else.
pub fn validate_activity_rating(
    rating: Option<i64>,
    activity_type: ActivityType,
) -> AppResult<()> {
    match (activity_type, rating) {
        (ActivityType::Rating, None) => Err(AppError::Validation(
            "rating is required for activity type 'rating'".to_string(),
        )),
        (ActivityType::Rating, Some(r)) => validate_rating_value(r),
        (_, Some(_)) => Err(AppError::Validation(
            "rating may only be supplied for activity type 'rating'".to_string(),
        )),
        (_, None) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== validate_search_query ====================

    #[test]
    fn test_search_query_normalizes_whitespace() {
        assert_eq!(validate_search_query("  a   b  ").unwrap(), "a b");
        assert_eq!(validate_search_query("a\t\nb").unwrap(), "a b");
        // Idempotent: normalizing a normalized query is a no-op.
        assert_eq!(
            validate_search_query(" a   b ").unwrap(),
            validate_search_query("a b").unwrap()
        );
    }

    #[test]
    fn test_search_query_length_bounds() {
        assert!(validate_search_query("a").is_err());
        assert!(validate_search_query("   a   ").is_err());
        assert!(validate_search_query("ab").is_ok());
        let long = "ab ".repeat(40); // 119 chars normalized
        assert!(validate_search_query(&long).is_err());
    }

    #[test]
    fn test_search_query_rejects_unsafe_chars() {
        for q in [
            "test<script>",
            "a > b",
            "{query}",
            "arr[0]",
            "back\\slash",
            "pipe|pipe",
            "tick`tick",
        ] {
            let err = validate_search_query(q).unwrap_err();
            assert!(
                err.to_string().contains("disallowed characters"),
                "expected unsafe-char rejection for {q:?}, got {err}"
            );
        }
    }

    #[test]
    fn test_search_query_rejects_long_runs() {
        assert!(validate_search_query("aaaa").is_err());
        assert!(validate_search_query("baaaab").is_err());
        assert!(validate_search_query("aaa").is_ok());
        assert!(validate_search_query("aabaa").is_ok());
    }

    #[test]
    fn test_search_query_whitespace_run_does_not_trip_repeat_check() {
        // Four spaces in the raw input collapse before the repeat check runs.
        assert!(validate_search_query("ab    cd").is_ok());
    }

    // ==================== content cross-field rules ====================

    #[test]
    fn test_text_requires_text_content() {
        let err =
            validate_content_requirements(ContentType::Text, &ContentFields::default()).unwrap_err();
        assert!(err.to_string().contains("text_content required"));

        let fields = ContentFields {
            text_content: Some("hello"),
            ..Default::default()
        };
        assert!(validate_content_requirements(ContentType::Text, &fields).is_ok());
    }

    #[test]
    fn test_media_requires_file_id_or_local_path() {
        for ct in [
            ContentType::Photo,
            ContentType::Video,
            ContentType::Document,
            ContentType::Audio,
            ContentType::Animation,
        ] {
            assert!(validate_content_requirements(ct, &ContentFields::default()).is_err());
            let by_handle = ContentFields {
                telegram_file_id: Some("AgACAgIAAxkBAAIB"),
                ..Default::default()
            };
            assert!(validate_content_requirements(ct, &by_handle).is_ok());
            let by_path = ContentFields {
                local_file_path: Some("uploads/intro.mp4"),
                ..Default::default()
            };
            assert!(validate_content_requirements(ct, &by_path).is_ok());
        }
    }

    #[test]
    fn test_url_kinds_require_http_url() {
        for ct in [
            ContentType::YoutubeUrl,
            ContentType::VkUrl,
            ContentType::ExternalUrl,
        ] {
            assert!(validate_content_requirements(ct, &ContentFields::default()).is_err());
            let bad = ContentFields {
                external_url: Some("ftp://example.com/file"),
                ..Default::default()
            };
            assert!(validate_content_requirements(ct, &bad).is_err());
            let good = ContentFields {
                external_url: Some("https://example.com/watch"),
                ..Default::default()
            };
            assert!(validate_content_requirements(ct, &good).is_ok());
        }
    }

    #[test]
    fn test_web_app_requires_url_or_short_name() {
        assert!(validate_content_requirements(ContentType::WebApp, &ContentFields::default())
            .is_err());
        let by_name = ContentFields {
            web_app_short_name: Some("quiz"),
            ..Default::default()
        };
        assert!(validate_content_requirements(ContentType::WebApp, &by_name).is_ok());
        let by_url = ContentFields {
            external_url: Some("https://t.example/app"),
            ..Default::default()
        };
        assert!(validate_content_requirements(ContentType::WebApp, &by_url).is_ok());
    }

    #[test]
    fn test_location_has_no_extra_requirement() {
        assert!(
            validate_content_requirements(ContentType::Location, &ContentFields::default()).is_ok()
        );
    }

    // ==================== rating rules ====================

    #[test]
    fn test_rating_range() {
        assert!(validate_rating_value(0).is_err());
        assert!(validate_rating_value(6).is_err());
        for r in 1..=5 {
            assert!(validate_rating_value(r).is_ok());
        }
    }

    #[test]
    fn test_activity_rating_cross_rule() {
        assert!(validate_activity_rating(None, ActivityType::Rating).is_err());
        assert!(validate_activity_rating(Some(3), ActivityType::Rating).is_ok());
        assert!(validate_activity_rating(Some(9), ActivityType::Rating).is_err());
        assert!(validate_activity_rating(Some(3), ActivityType::Navigation).is_err());
        assert!(validate_activity_rating(None, ActivityType::Navigation).is_ok());
    }

    // ==================== misc field rules ====================

    #[test]
    fn test_title_bounds() {
        assert!(validate_title("Hearing aids").is_ok());
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"x".repeat(256)).is_err());
    }

    #[test]
    fn test_caption_and_file_bounds() {
        assert!(validate_caption(&"c".repeat(1024)).is_ok());
        assert!(validate_caption(&"c".repeat(1025)).is_err());
        assert!(validate_telegram_file_id("short").is_err());
        assert!(validate_telegram_file_id("AgACAgIAAxkB").is_ok());
        assert!(validate_file_size(50 * 1024 * 1024).is_ok());
        assert!(validate_file_size(50 * 1024 * 1024 + 1).is_err());
    }
}
