//! Content item store: the self-referential menu tree.
//!
//! The tree is an adjacency representation in SQLite (`parent_id` self
//! reference); tree reads are index lookups on `parent_id`, never object
//! graph traversal, and the one-extra-level contract is enforced by
//! construction — there is no recursive walk anywhere in this module.

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Result};
use serde::{Deserialize, Serialize};

use crate::core::access::AccessTier;
use crate::core::error::{AppError, AppResult};
use crate::core::validation;
use crate::storage::content::{self, ContentPayload};

/// MenuItem discriminator: a navigation node is expected to have children,
/// a content node is expected to own exactly one content payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Navigation,
    Content,
}

impl ItemKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Navigation => "navigation",
            ItemKind::Content => "content",
        }
    }

    pub fn from_db(value: &str) -> ItemKind {
        match value {
            "content" => ItemKind::Content,
            _ => ItemKind::Navigation,
        }
    }
}

/// A node in the content tree, with its rolling statistics.
#[derive(Debug, Clone, Serialize)]
pub struct MenuItem {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub bot_message: Option<String>,
    pub parent_id: Option<i64>,
    pub kind: ItemKind,
    pub is_active: bool,
    pub access_tier: AccessTier,
    pub view_count: i64,
    pub download_count: i64,
    pub rating_sum: i64,
    pub rating_count: i64,
    pub average_rating: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

/// Fields for an administrative create.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMenuItem {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub bot_message: Option<String>,
    #[serde(default)]
    pub parent_id: Option<i64>,
    pub kind: ItemKind,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "default_tier")]
    pub access_tier: AccessTier,
}

fn default_true() -> bool {
    true
}

fn default_tier() -> AccessTier {
    AccessTier::Free
}

/// Partial fields for an administrative update. `parent_id` is tri-state:
/// absent leaves it alone, `null` moves the item to the root level.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MenuItemPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub bot_message: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub parent_id: Option<Option<i64>>,
    #[serde(default)]
    pub kind: Option<ItemKind>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub access_tier: Option<AccessTier>,
}

/// Distinguish an absent JSON field from an explicit `null`.
fn deserialize_some<'de, T, D>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Filters for the administrative listing.
#[derive(Debug, Clone, Default)]
pub struct AdminListFilter {
    pub page: i64,
    pub limit: i64,
    pub parent_id: Option<i64>,
    pub is_active: Option<bool>,
    pub access_tier: Option<AccessTier>,
}

const ITEM_COLUMNS: &str = "id, title, description, bot_message, parent_id, kind, is_active, \
     access_tier, view_count, download_count, rating_sum, rating_count, average_rating, \
     created_at, updated_at";

fn row_to_item(row: &rusqlite::Row<'_>) -> Result<MenuItem> {
    let kind: String = row.get(5)?;
    let tier: String = row.get(7)?;
    Ok(MenuItem {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        bot_message: row.get(3)?,
        parent_id: row.get(4)?,
        kind: ItemKind::from_db(&kind),
        is_active: row.get::<_, i64>(6)? != 0,
        access_tier: AccessTier::from_db(&tier),
        view_count: row.get(8)?,
        download_count: row.get(9)?,
        rating_sum: row.get(10)?,
        rating_count: row.get(11)?,
        average_rating: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

/// Fetch a single item by id, active or not.
pub fn get_menu_item(conn: &Connection, id: i64) -> Result<Option<MenuItem>> {
    conn.query_row(
        &format!("SELECT {ITEM_COLUMNS} FROM menu_items WHERE id = ?1"),
        params![id],
        row_to_item,
    )
    .optional()
}

/// One level of children of `parent_id` (root level when `None`), ordered
/// by id ascending (insertion order).
///
/// The free tier is realized as an exact `access_tier = 'free'` filter;
/// the premium tier sees everything. This is provably equivalent to
/// filtering with `can_view` (see the access policy tests).
pub fn children_of(
    conn: &Connection,
    parent_id: Option<i64>,
    active_only: bool,
    tier: Option<AccessTier>,
) -> Result<Vec<MenuItem>> {
    let active_clause = if active_only { " AND is_active = 1" } else { "" };
    let tier_clause = match tier {
        Some(AccessTier::Free) => " AND access_tier = 'free'",
        _ => "",
    };

    let mut items = Vec::new();
    match parent_id {
        Some(p) => {
            let sql = format!(
                "SELECT {ITEM_COLUMNS} FROM menu_items \
                 WHERE parent_id = ?1{active_clause}{tier_clause} ORDER BY id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![p], row_to_item)?;
            for row in rows {
                items.push(row?);
            }
        }
        None => {
            let sql = format!(
                "SELECT {ITEM_COLUMNS} FROM menu_items \
                 WHERE parent_id IS NULL{active_clause}{tier_clause} ORDER BY id"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], row_to_item)?;
            for row in rows {
                items.push(row?);
            }
        }
    }
    Ok(items)
}

/// Fetch an active item together with its content payload (if any) and one
/// level of tier-visible active children.
///
/// Inactive items are indistinguishable from absent ones here. The
/// children's own children are never loaded — the walk is exactly one
/// level deep by construction.
pub fn get_with_content_and_children(
    conn: &Connection,
    id: i64,
    tier: AccessTier,
) -> AppResult<Option<(MenuItem, Option<ContentPayload>, Vec<MenuItem>)>> {
    let item = conn
        .query_row(
            &format!("SELECT {ITEM_COLUMNS} FROM menu_items WHERE id = ?1 AND is_active = 1"),
            params![id],
            row_to_item,
        )
        .optional()?;

    let Some(item) = item else {
        return Ok(None);
    };

    let payload = content::content_for_item(conn, id)?;
    let children = children_of(conn, Some(id), true, Some(tier))?;
    Ok(Some((item, payload, children)))
}

/// True if the item has any children, active or not.
pub fn has_children(conn: &Connection, id: i64) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM menu_items WHERE parent_id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// True if re-parenting `item_id` under `new_parent_id` would make the
/// item its own ancestor.
pub fn would_create_cycle(conn: &Connection, item_id: i64, new_parent_id: i64) -> Result<bool> {
    // Hard cap on the walk: a healthy tree is nowhere near this deep, and
    // the cap keeps pre-existing corrupt data from looping us forever.
    const MAX_DEPTH: usize = 512;

    let mut cursor = Some(new_parent_id);
    for _ in 0..MAX_DEPTH {
        match cursor {
            None => return Ok(false),
            Some(ancestor) if ancestor == item_id => return Ok(true),
            Some(ancestor) => {
                cursor = conn
                    .query_row(
                        "SELECT parent_id FROM menu_items WHERE id = ?1",
                        params![ancestor],
                        |row| row.get::<_, Option<i64>>(0),
                    )
                    .optional()?
                    .flatten();
            }
        }
    }
    Ok(true)
}

/// Create a menu item.
///
/// # Errors
///
/// `Validation` on an empty or oversized title; `NotFound` when the
/// referenced parent does not exist.
pub fn create_menu_item(conn: &Connection, new: &NewMenuItem) -> AppResult<MenuItem> {
    validation::validate_title(&new.title)?;

    if let Some(parent_id) = new.parent_id {
        let parent = get_menu_item(conn, parent_id)?.ok_or_else(|| {
            AppError::NotFound(format!("parent menu item {parent_id} not found"))
        })?;
        if !parent.is_active {
            return Err(AppError::Validation(format!(
                "parent menu item {parent_id} is inactive"
            )));
        }
    }

    conn.execute(
        "INSERT INTO menu_items (title, description, bot_message, parent_id, kind, is_active, access_tier)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            new.title,
            new.description,
            new.bot_message,
            new.parent_id,
            new.kind.as_str(),
            new.is_active as i64,
            new.access_tier.as_str(),
        ],
    )?;
    let id = conn.last_insert_rowid();

    get_menu_item(conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("menu item {id} vanished after insert")))
}

/// Apply a partial update. Last-writer-wins on every non-counter field;
/// counters are never touched by this path.
///
/// # Errors
///
/// `NotFound` for a missing item or parent; `Validation` for a bad title,
/// self-parenting, or a parent assignment that would create a cycle.
pub fn update_menu_item(conn: &Connection, id: i64, patch: &MenuItemPatch) -> AppResult<MenuItem> {
    let current = get_menu_item(conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("menu item {id} not found")))?;

    if let Some(title) = &patch.title {
        validation::validate_title(title)?;
    }

    let parent_id = match patch.parent_id {
        None => current.parent_id,
        Some(None) => None,
        Some(Some(new_parent)) => {
            if new_parent == id {
                return Err(AppError::Validation(
                    "a menu item cannot be its own parent".to_string(),
                ));
            }
            if get_menu_item(conn, new_parent)?.is_none() {
                return Err(AppError::NotFound(format!(
                    "parent menu item {new_parent} not found"
                )));
            }
            if would_create_cycle(conn, id, new_parent)? {
                return Err(AppError::Validation(
                    "parent assignment would make the item its own ancestor".to_string(),
                ));
            }
            Some(new_parent)
        }
    };

    let title = patch.title.as_ref().unwrap_or(&current.title);
    let description = match &patch.description {
        None => current.description.clone(),
        Some(d) => d.clone(),
    };
    let bot_message = match &patch.bot_message {
        None => current.bot_message.clone(),
        Some(m) => m.clone(),
    };
    let kind = patch.kind.unwrap_or(current.kind);
    let is_active = patch.is_active.unwrap_or(current.is_active);
    let access_tier = patch.access_tier.unwrap_or(current.access_tier);

    conn.execute(
        "UPDATE menu_items SET title = ?1, description = ?2, bot_message = ?3, parent_id = ?4,
         kind = ?5, is_active = ?6, access_tier = ?7, updated_at = CURRENT_TIMESTAMP
         WHERE id = ?8",
        params![
            title,
            description,
            bot_message,
            parent_id,
            kind.as_str(),
            is_active as i64,
            access_tier.as_str(),
            id,
        ],
    )?;

    get_menu_item(conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("menu item {id} not found")))
}

/// Delete an item and its owned content payload.
///
/// Deleting an item that still has children (active or not) is a
/// `Conflict`, not a cascade: cascading here would silently destroy
/// content the administrator did not ask to remove. The content payload
/// row is storage-level cleanup and goes in the same transaction.
pub fn delete_menu_item(conn: &mut Connection, id: i64) -> AppResult<()> {
    if get_menu_item(conn, id)?.is_none() {
        return Err(AppError::NotFound(format!("menu item {id} not found")));
    }
    if has_children(conn, id)? {
        return Err(AppError::Conflict(format!(
            "menu item {id} has children and cannot be deleted"
        )));
    }

    let tx = conn.transaction()?;
    tx.execute(
        "DELETE FROM content_files WHERE menu_item_id = ?1",
        params![id],
    )?;
    tx.execute("DELETE FROM menu_items WHERE id = ?1", params![id])?;
    tx.commit()?;
    Ok(())
}

/// Case-insensitive keyword search over titles and descriptions.
///
/// The query must already be normalized and validated; every word has to
/// match the title or the description. Matching goes through the
/// connection's `text_contains_fold` function rather than LIKE, because
/// LIKE folds only ASCII case and the catalog titles are largely
/// Cyrillic. Restricted to active, tier-visible items, ordered by id
/// ascending, capped at `limit`.
pub fn search_items(
    conn: &Connection,
    normalized_query: &str,
    tier: AccessTier,
    limit: i64,
) -> Result<Vec<MenuItem>> {
    if limit <= 0 {
        return Ok(Vec::new());
    }
    let words: Vec<&str> = normalized_query.split(' ').filter(|w| !w.is_empty()).collect();
    if words.is_empty() {
        return Ok(Vec::new());
    }

    let tier_clause = match tier {
        AccessTier::Free => " AND access_tier = 'free'",
        AccessTier::Premium => "",
    };

    let mut sql = format!("SELECT {ITEM_COLUMNS} FROM menu_items WHERE is_active = 1{tier_clause}");
    for i in 1..=words.len() {
        sql.push_str(&format!(
            " AND (text_contains_fold(title, ?{i}) OR text_contains_fold(description, ?{i}))"
        ));
    }
    sql.push_str(&format!(" ORDER BY id LIMIT ?{}", words.len() + 1));

    let mut bindings: Vec<Box<dyn rusqlite::ToSql>> = words
        .iter()
        .map(|w| Box::new(w.to_lowercase()) as Box<dyn rusqlite::ToSql>)
        .collect();
    bindings.push(Box::new(limit));

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(bindings.iter()), row_to_item)?;

    let mut items = Vec::new();
    for row in rows {
        items.push(row?);
    }
    Ok(items)
}

/// Paged administrative listing with optional filters. Unlike every public
/// read path, this one can see inactive items.
pub fn list_admin(
    conn: &Connection,
    filter: &AdminListFilter,
) -> Result<(Vec<MenuItem>, i64)> {
    let mut where_sql = String::from("1 = 1");
    let mut bound: Vec<i64> = Vec::new();

    if let Some(parent_id) = filter.parent_id {
        bound.push(parent_id);
        where_sql.push_str(&format!(" AND parent_id = ?{}", bound.len()));
    }
    if let Some(is_active) = filter.is_active {
        where_sql.push_str(if is_active {
            " AND is_active = 1"
        } else {
            " AND is_active = 0"
        });
    }
    if let Some(tier) = filter.access_tier {
        where_sql.push_str(&format!(" AND access_tier = '{}'", tier.as_str()));
    }

    let total: i64 = {
        let sql = format!("SELECT COUNT(*) FROM menu_items WHERE {where_sql}");
        let mut stmt = conn.prepare(&sql)?;
        stmt.query_row(params_from_iter(bound.iter()), |row| row.get(0))?
    };

    let page = filter.page.max(1);
    let limit = filter.limit.max(1);
    let offset = (page - 1) * limit;
    bound.push(limit);
    let limit_idx = bound.len();
    bound.push(offset);
    let offset_idx = bound.len();

    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM menu_items WHERE {where_sql} \
         ORDER BY id LIMIT ?{limit_idx} OFFSET ?{offset_idx}"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(bound.iter()), row_to_item)?;

    let mut items = Vec::new();
    for row in rows {
        items.push(row?);
    }
    Ok((items, total))
}
