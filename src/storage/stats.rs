//! Statistics counters on menu items.
//!
//! Every increment is a single UPDATE with arithmetic on the stored value,
//! never read-modify-write in the application, so concurrent recorders
//! cannot lose updates. In SQLite the right-hand side of every SET reads
//! the pre-update row, which is what lets one statement move `rating_sum`,
//! `rating_count` and `average_rating` together.

use rusqlite::{params, Connection};

use crate::core::error::{AppError, AppResult};
use crate::core::validation;

/// Record one view of a menu item.
pub fn record_view(conn: &Connection, menu_item_id: i64) -> AppResult<()> {
    let affected = conn.execute(
        "UPDATE menu_items SET view_count = view_count + 1, updated_at = CURRENT_TIMESTAMP
         WHERE id = ?1",
        params![menu_item_id],
    )?;
    if affected == 0 {
        return Err(AppError::NotFound(format!(
            "menu item {menu_item_id} not found"
        )));
    }
    Ok(())
}

/// Record one download of a menu item's content.
pub fn record_download(conn: &Connection, menu_item_id: i64) -> AppResult<()> {
    let affected = conn.execute(
        "UPDATE menu_items SET download_count = download_count + 1, updated_at = CURRENT_TIMESTAMP
         WHERE id = ?1",
        params![menu_item_id],
    )?;
    if affected == 0 {
        return Err(AppError::NotFound(format!(
            "menu item {menu_item_id} not found"
        )));
    }
    Ok(())
}

/// Record a 1-5 rating: sum, count and the rounded average move in one
/// atomic statement.
pub fn record_rating(conn: &Connection, menu_item_id: i64, rating: i64) -> AppResult<()> {
    validation::validate_rating_value(rating)?;

    let affected = conn.execute(
        "UPDATE menu_items SET
             rating_sum = rating_sum + ?1,
             rating_count = rating_count + 1,
             average_rating = ROUND(CAST(rating_sum + ?1 AS REAL) / (rating_count + 1), 2),
             updated_at = CURRENT_TIMESTAMP
         WHERE id = ?2",
        params![rating, menu_item_id],
    )?;
    if affected == 0 {
        return Err(AppError::NotFound(format!(
            "menu item {menu_item_id} not found"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::access::AccessTier;
    use crate::storage::db::migrate_schema;
    use crate::storage::menu::{create_menu_item, get_menu_item, ItemKind, NewMenuItem};

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrate_schema(&conn).unwrap();
        conn
    }

    fn seed_item(conn: &Connection) -> i64 {
        create_menu_item(
            conn,
            &NewMenuItem {
                title: "Material".to_string(),
                description: None,
                bot_message: None,
                parent_id: None,
                kind: ItemKind::Content,
                is_active: true,
                access_tier: AccessTier::Free,
            },
        )
        .unwrap()
        .id
    }

    #[test]
    fn test_view_and_download_counters() {
        let conn = test_conn();
        let id = seed_item(&conn);

        record_view(&conn, id).unwrap();
        record_view(&conn, id).unwrap();
        record_download(&conn, id).unwrap();

        let item = get_menu_item(&conn, id).unwrap().unwrap();
        assert_eq!(item.view_count, 2);
        assert_eq!(item.download_count, 1);
        assert_eq!(item.rating_count, 0);
    }

    #[test]
    fn test_rating_moves_sum_count_and_average_together() {
        let conn = test_conn();
        let id = seed_item(&conn);

        // Start from sum 12 over 3 ratings (average 4.0).
        conn.execute(
            "UPDATE menu_items SET rating_sum = 12, rating_count = 3, average_rating = 4.0
             WHERE id = ?1",
            params![id],
        )
        .unwrap();

        record_rating(&conn, id, 5).unwrap();

        let item = get_menu_item(&conn, id).unwrap().unwrap();
        assert_eq!(item.rating_sum, 17);
        assert_eq!(item.rating_count, 4);
        assert_eq!(item.average_rating, Some(4.25));
    }

    #[test]
    fn test_first_rating_sets_average() {
        let conn = test_conn();
        let id = seed_item(&conn);

        record_rating(&conn, id, 3).unwrap();
        let item = get_menu_item(&conn, id).unwrap().unwrap();
        assert_eq!(item.rating_sum, 3);
        assert_eq!(item.rating_count, 1);
        assert_eq!(item.average_rating, Some(3.0));
    }

    #[test]
    fn test_average_rounds_to_two_decimals() {
        let conn = test_conn();
        let id = seed_item(&conn);

        record_rating(&conn, id, 5).unwrap();
        record_rating(&conn, id, 5).unwrap();
        record_rating(&conn, id, 4).unwrap();
        // 14 / 3 = 4.666... -> 4.67
        let item = get_menu_item(&conn, id).unwrap().unwrap();
        assert_eq!(item.average_rating, Some(4.67));
    }

    #[test]
    fn test_out_of_range_rating_is_rejected_without_write() {
        let conn = test_conn();
        let id = seed_item(&conn);

        assert!(matches!(
            record_rating(&conn, id, 0).unwrap_err(),
            AppError::Validation(_)
        ));
        assert!(matches!(
            record_rating(&conn, id, 6).unwrap_err(),
            AppError::Validation(_)
        ));

        let item = get_menu_item(&conn, id).unwrap().unwrap();
        assert_eq!(item.rating_count, 0);
        assert_eq!(item.average_rating, None);
    }

    #[test]
    fn test_missing_item_is_not_found() {
        let conn = test_conn();
        assert!(matches!(
            record_view(&conn, 999).unwrap_err(),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            record_download(&conn, 999).unwrap_err(),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            record_rating(&conn, 999, 5).unwrap_err(),
            AppError::NotFound(_)
        ));
    }
}
