//! Append-only user activity log.
//!
//! Activity events are the raw material for engagement analytics; the
//! aggregated counters on menu items are derived from them at write time
//! by the navigation resolver, not recomputed from this table.

use rusqlite::{params, Connection, Result};
use serde::{Deserialize, Serialize};

/// What the user did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    StartCommand,
    Navigation,
    SectionEnter,
    MaterialOpen,
    TextView,
    MediaView,
    VideoView,
    Download,
    Rating,
    Search,
}

impl ActivityType {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityType::StartCommand => "start_command",
            ActivityType::Navigation => "navigation",
            ActivityType::SectionEnter => "section_enter",
            ActivityType::MaterialOpen => "material_open",
            ActivityType::TextView => "text_view",
            ActivityType::MediaView => "media_view",
            ActivityType::VideoView => "video_view",
            ActivityType::Download => "download",
            ActivityType::Rating => "rating",
            ActivityType::Search => "search",
        }
    }

    /// Whether this event counts as a content view for the aggregated
    /// `view_count` counter.
    pub fn is_view(self) -> bool {
        matches!(
            self,
            ActivityType::MaterialOpen
                | ActivityType::TextView
                | ActivityType::MediaView
                | ActivityType::VideoView
        )
    }
}

/// One recorded event.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityRecord {
    pub id: i64,
    pub telegram_user_id: i64,
    pub menu_item_id: Option<i64>,
    pub activity_type: ActivityType,
    pub rating: Option<i64>,
    pub search_query: Option<String>,
    pub result_count: Option<i64>,
    pub created_at: String,
}

/// Append an event. Returns the new row id.
#[allow(clippy::too_many_arguments)]
pub fn emit(
    conn: &Connection,
    telegram_user_id: i64,
    menu_item_id: Option<i64>,
    activity_type: ActivityType,
    rating: Option<i64>,
    search_query: Option<&str>,
    result_count: Option<i64>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO user_activities
             (telegram_user_id, menu_item_id, activity_type, rating, search_query, result_count)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            telegram_user_id,
            menu_item_id,
            activity_type.as_str(),
            rating,
            search_query,
            result_count,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::access::AccessTier;
    use crate::storage::db::migrate_schema;
    use crate::storage::menu::{create_menu_item, ItemKind, NewMenuItem};

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        migrate_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn test_emit_search_event() {
        let conn = test_conn();
        let id = emit(
            &conn,
            100,
            None,
            ActivityType::Search,
            None,
            Some("hearing aids"),
            Some(3),
        )
        .unwrap();
        assert!(id > 0);

        let (query, count): (String, i64) = conn
            .query_row(
                "SELECT search_query, result_count FROM user_activities WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(query, "hearing aids");
        assert_eq!(count, 3);
    }

    #[test]
    fn test_activity_survives_item_deletion() {
        let conn = test_conn();
        let item = create_menu_item(
            &conn,
            &NewMenuItem {
                title: "Leaf".to_string(),
                description: None,
                bot_message: None,
                parent_id: None,
                kind: ItemKind::Content,
                is_active: true,
                access_tier: AccessTier::Free,
            },
        )
        .unwrap();
        let event = emit(
            &conn,
            100,
            Some(item.id),
            ActivityType::MaterialOpen,
            None,
            None,
            None,
        )
        .unwrap();

        conn.execute("DELETE FROM menu_items WHERE id = ?1", params![item.id])
            .unwrap();

        // The event row stays; its item reference is nulled, not cascaded.
        let stored: Option<i64> = conn
            .query_row(
                "SELECT menu_item_id FROM user_activities WHERE id = ?1",
                params![event],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(stored, None);
    }

    #[test]
    fn test_view_classification() {
        assert!(ActivityType::MaterialOpen.is_view());
        assert!(ActivityType::TextView.is_view());
        assert!(ActivityType::MediaView.is_view());
        assert!(ActivityType::VideoView.is_view());
        assert!(!ActivityType::Download.is_view());
        assert!(!ActivityType::Rating.is_view());
        assert!(!ActivityType::Search.is_view());
        assert!(!ActivityType::Navigation.is_view());
    }
}
