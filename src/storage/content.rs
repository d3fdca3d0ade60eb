//! Content payload store.
//!
//! Each content-kind menu item owns at most one payload row; the
//! `menu_item_id` UNIQUE constraint backs up the application-level
//! conflict check. All cross-field requirements are validated before any
//! write statement runs.

use rusqlite::{params, Connection, OptionalExtension, Result};
use serde::{Deserialize, Serialize};

use crate::core::error::{AppError, AppResult};
use crate::core::validation::{self, ContentFields};
use crate::storage::menu;

/// What a payload actually carries and how consumers should render it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    #[default]
    Text,
    Photo,
    Video,
    Document,
    Audio,
    Animation,
    YoutubeUrl,
    VkUrl,
    ExternalUrl,
    WebApp,
    Location,
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Text => "text",
            ContentType::Photo => "photo",
            ContentType::Video => "video",
            ContentType::Document => "document",
            ContentType::Audio => "audio",
            ContentType::Animation => "animation",
            ContentType::YoutubeUrl => "youtube_url",
            ContentType::VkUrl => "vk_url",
            ContentType::ExternalUrl => "external_url",
            ContentType::WebApp => "web_app",
            ContentType::Location => "location",
        }
    }

    pub fn from_db(value: &str) -> ContentType {
        match value {
            "photo" => ContentType::Photo,
            "video" => ContentType::Video,
            "document" => ContentType::Document,
            "audio" => ContentType::Audio,
            "animation" => ContentType::Animation,
            "youtube_url" => ContentType::YoutubeUrl,
            "vk_url" => ContentType::VkUrl,
            "external_url" => ContentType::ExternalUrl,
            "web_app" => ContentType::WebApp,
            "location" => ContentType::Location,
            _ => ContentType::Text,
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored content payload.
#[derive(Debug, Clone, Serialize)]
pub struct ContentPayload {
    pub id: i64,
    pub menu_item_id: i64,
    pub content_type: ContentType,
    pub telegram_file_id: Option<String>,
    pub caption: Option<String>,
    pub text_content: Option<String>,
    pub external_url: Option<String>,
    pub web_app_short_name: Option<String>,
    pub local_file_path: Option<String>,
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub duration: Option<i64>,
    pub thumbnail_file_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields for creating a payload. Everything but the type is optional;
/// which combination is required depends on the type.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewContentPayload {
    pub content_type: ContentType,
    #[serde(default)]
    pub telegram_file_id: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub text_content: Option<String>,
    #[serde(default)]
    pub external_url: Option<String>,
    #[serde(default)]
    pub web_app_short_name: Option<String>,
    #[serde(default)]
    pub local_file_path: Option<String>,
    #[serde(default)]
    pub file_size: Option<i64>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub width: Option<i64>,
    #[serde(default)]
    pub height: Option<i64>,
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub thumbnail_file_id: Option<String>,
}

/// Partial payload update. String fields are tri-state so an explicit
/// `null` can clear a stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentPatch {
    #[serde(default)]
    pub content_type: Option<ContentType>,
    #[serde(default, deserialize_with = "tri_state")]
    pub telegram_file_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "tri_state")]
    pub caption: Option<Option<String>>,
    #[serde(default, deserialize_with = "tri_state")]
    pub text_content: Option<Option<String>>,
    #[serde(default, deserialize_with = "tri_state")]
    pub external_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "tri_state")]
    pub web_app_short_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "tri_state")]
    pub local_file_path: Option<Option<String>>,
    #[serde(default, deserialize_with = "tri_state")]
    pub file_size: Option<Option<i64>>,
    #[serde(default, deserialize_with = "tri_state")]
    pub mime_type: Option<Option<String>>,
    #[serde(default, deserialize_with = "tri_state")]
    pub width: Option<Option<i64>>,
    #[serde(default, deserialize_with = "tri_state")]
    pub height: Option<Option<i64>>,
    #[serde(default, deserialize_with = "tri_state")]
    pub duration: Option<Option<i64>>,
    #[serde(default, deserialize_with = "tri_state")]
    pub thumbnail_file_id: Option<Option<String>>,
}

fn tri_state<'de, T, D>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

const CONTENT_COLUMNS: &str = "id, menu_item_id, content_type, telegram_file_id, caption, \
     text_content, external_url, web_app_short_name, local_file_path, file_size, mime_type, \
     width, height, duration, thumbnail_file_id, created_at, updated_at";

fn row_to_payload(row: &rusqlite::Row<'_>) -> Result<ContentPayload> {
    let content_type: String = row.get(2)?;
    Ok(ContentPayload {
        id: row.get(0)?,
        menu_item_id: row.get(1)?,
        content_type: ContentType::from_db(&content_type),
        telegram_file_id: row.get(3)?,
        caption: row.get(4)?,
        text_content: row.get(5)?,
        external_url: row.get(6)?,
        web_app_short_name: row.get(7)?,
        local_file_path: row.get(8)?,
        file_size: row.get(9)?,
        mime_type: row.get(10)?,
        width: row.get(11)?,
        height: row.get(12)?,
        duration: row.get(13)?,
        thumbnail_file_id: row.get(14)?,
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
    })
}

/// The payload owned by a menu item, if one exists.
pub fn content_for_item(conn: &Connection, menu_item_id: i64) -> Result<Option<ContentPayload>> {
    conn.query_row(
        &format!("SELECT {CONTENT_COLUMNS} FROM content_files WHERE menu_item_id = ?1"),
        params![menu_item_id],
        row_to_payload,
    )
    .optional()
}

/// Fetch a payload by its own id.
pub fn get_content(conn: &Connection, id: i64) -> Result<Option<ContentPayload>> {
    conn.query_row(
        &format!("SELECT {CONTENT_COLUMNS} FROM content_files WHERE id = ?1"),
        params![id],
        row_to_payload,
    )
    .optional()
}

fn validate_scalar_fields(
    caption: Option<&str>,
    telegram_file_id: Option<&str>,
    file_size: Option<i64>,
) -> AppResult<()> {
    if let Some(caption) = caption {
        validation::validate_caption(caption)?;
    }
    if let Some(file_id) = telegram_file_id {
        if !file_id.trim().is_empty() {
            validation::validate_telegram_file_id(file_id)?;
        }
    }
    if let Some(size) = file_size {
        validation::validate_file_size(size)?;
    }
    Ok(())
}

/// Attach a payload to a menu item.
///
/// # Errors
///
/// `NotFound` when the item does not exist, `Conflict` when it already
/// owns a payload, `Validation` when the fields do not satisfy the
/// type's requirements.
pub fn create_content(
    conn: &Connection,
    menu_item_id: i64,
    new: &NewContentPayload,
) -> AppResult<ContentPayload> {
    if menu::get_menu_item(conn, menu_item_id)?.is_none() {
        return Err(AppError::NotFound(format!(
            "menu item {menu_item_id} not found"
        )));
    }
    if content_for_item(conn, menu_item_id)?.is_some() {
        return Err(AppError::Conflict(format!(
            "menu item {menu_item_id} already has a content file"
        )));
    }

    validation::validate_content_requirements(
        new.content_type,
        &ContentFields {
            telegram_file_id: new.telegram_file_id.as_deref(),
            text_content: new.text_content.as_deref(),
            external_url: new.external_url.as_deref(),
            web_app_short_name: new.web_app_short_name.as_deref(),
            local_file_path: new.local_file_path.as_deref(),
        },
    )?;
    validate_scalar_fields(
        new.caption.as_deref(),
        new.telegram_file_id.as_deref(),
        new.file_size,
    )?;

    conn.execute(
        "INSERT INTO content_files (menu_item_id, content_type, telegram_file_id, caption,
             text_content, external_url, web_app_short_name, local_file_path, file_size,
             mime_type, width, height, duration, thumbnail_file_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            menu_item_id,
            new.content_type.as_str(),
            new.telegram_file_id,
            new.caption,
            new.text_content,
            new.external_url,
            new.web_app_short_name,
            new.local_file_path,
            new.file_size,
            new.mime_type,
            new.width,
            new.height,
            new.duration,
            new.thumbnail_file_id,
        ],
    )?;
    let id = conn.last_insert_rowid();

    get_content(conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("content file {id} vanished after insert")))
}

/// Apply a partial update to a payload.
///
/// Cross-field requirements are re-checked against the merged result, so a
/// type change cannot leave the row without its mandatory fields.
pub fn update_content(conn: &Connection, id: i64, patch: &ContentPatch) -> AppResult<ContentPayload> {
    let current = get_content(conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("content file {id} not found")))?;

    let content_type = patch.content_type.unwrap_or(current.content_type);
    let merge_str = |p: &Option<Option<String>>, c: &Option<String>| match p {
        None => c.clone(),
        Some(v) => v.clone(),
    };
    let merge_num = |p: &Option<Option<i64>>, c: Option<i64>| match p {
        None => c,
        Some(v) => *v,
    };

    let telegram_file_id = merge_str(&patch.telegram_file_id, &current.telegram_file_id);
    let caption = merge_str(&patch.caption, &current.caption);
    let text_content = merge_str(&patch.text_content, &current.text_content);
    let external_url = merge_str(&patch.external_url, &current.external_url);
    let web_app_short_name = merge_str(&patch.web_app_short_name, &current.web_app_short_name);
    let local_file_path = merge_str(&patch.local_file_path, &current.local_file_path);
    let file_size = merge_num(&patch.file_size, current.file_size);
    let mime_type = merge_str(&patch.mime_type, &current.mime_type);
    let width = merge_num(&patch.width, current.width);
    let height = merge_num(&patch.height, current.height);
    let duration = merge_num(&patch.duration, current.duration);
    let thumbnail_file_id = merge_str(&patch.thumbnail_file_id, &current.thumbnail_file_id);

    validation::validate_content_requirements(
        content_type,
        &ContentFields {
            telegram_file_id: telegram_file_id.as_deref(),
            text_content: text_content.as_deref(),
            external_url: external_url.as_deref(),
            web_app_short_name: web_app_short_name.as_deref(),
            local_file_path: local_file_path.as_deref(),
        },
    )?;
    validate_scalar_fields(caption.as_deref(), telegram_file_id.as_deref(), file_size)?;

    conn.execute(
        "UPDATE content_files SET content_type = ?1, telegram_file_id = ?2, caption = ?3,
             text_content = ?4, external_url = ?5, web_app_short_name = ?6, local_file_path = ?7,
             file_size = ?8, mime_type = ?9, width = ?10, height = ?11, duration = ?12,
             thumbnail_file_id = ?13, updated_at = CURRENT_TIMESTAMP
         WHERE id = ?14",
        params![
            content_type.as_str(),
            telegram_file_id,
            caption,
            text_content,
            external_url,
            web_app_short_name,
            local_file_path,
            file_size,
            mime_type,
            width,
            height,
            duration,
            thumbnail_file_id,
            id,
        ],
    )?;

    get_content(conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("content file {id} not found")))
}

/// Remove a payload by its own id.
pub fn delete_content(conn: &Connection, id: i64) -> AppResult<()> {
    let affected = conn.execute("DELETE FROM content_files WHERE id = ?1", params![id])?;
    if affected == 0 {
        return Err(AppError::NotFound(format!("content file {id} not found")));
    }
    Ok(())
}
