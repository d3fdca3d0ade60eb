//! Bot user records and subscription state lookup.

use rusqlite::{params, Connection, OptionalExtension, Result};
use serde::Serialize;

/// A registered caller, keyed by their messenger id.
#[derive(Debug, Clone, Serialize)]
pub struct BotUser {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub subscription_type: String,
    pub created_at: String,
}

fn row_to_user(row: &rusqlite::Row<'_>) -> Result<BotUser> {
    Ok(BotUser {
        telegram_id: row.get(0)?,
        username: row.get(1)?,
        subscription_type: row.get(2)?,
        created_at: row.get(3)?,
    })
}

pub fn get_user(conn: &Connection, telegram_id: i64) -> Result<Option<BotUser>> {
    conn.query_row(
        "SELECT telegram_id, username, subscription_type, created_at
         FROM users WHERE telegram_id = ?1",
        params![telegram_id],
        row_to_user,
    )
    .optional()
}

/// Register a caller or refresh an existing record.
///
/// The subscription type is only overwritten when the caller supplies one;
/// a plain re-registration never downgrades an existing subscription.
pub fn upsert_user(
    conn: &Connection,
    telegram_id: i64,
    username: Option<&str>,
    subscription_type: Option<&str>,
) -> Result<BotUser> {
    conn.execute(
        "INSERT INTO users (telegram_id, username, subscription_type)
         VALUES (?1, ?2, COALESCE(?3, 'free'))
         ON CONFLICT(telegram_id) DO UPDATE SET
             username = COALESCE(excluded.username, username),
             subscription_type = COALESCE(?3, subscription_type)",
        params![telegram_id, username, subscription_type],
    )?;

    conn.query_row(
        "SELECT telegram_id, username, subscription_type, created_at
         FROM users WHERE telegram_id = ?1",
        params![telegram_id],
        row_to_user,
    )
}

/// Subscription state for access resolution. `None` for unknown callers,
/// who resolve to the free tier.
pub fn lookup_subscription_state(
    conn: &Connection,
    telegram_id: i64,
) -> Result<Option<String>> {
    conn.query_row(
        "SELECT subscription_type FROM users WHERE telegram_id = ?1",
        params![telegram_id],
        |row| row.get(0),
    )
    .optional()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::db::migrate_schema;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        migrate_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn test_upsert_registers_then_refreshes() {
        let conn = test_conn();

        let created = upsert_user(&conn, 42, Some("alice"), None).unwrap();
        assert_eq!(created.subscription_type, "free");

        let upgraded = upsert_user(&conn, 42, None, Some("premium")).unwrap();
        assert_eq!(upgraded.subscription_type, "premium");
        assert_eq!(upgraded.username.as_deref(), Some("alice"));

        // A later plain re-registration keeps the subscription.
        let again = upsert_user(&conn, 42, Some("alice"), None).unwrap();
        assert_eq!(again.subscription_type, "premium");
    }

    #[test]
    fn test_lookup_subscription_state() {
        let conn = test_conn();
        assert_eq!(lookup_subscription_state(&conn, 7).unwrap(), None);

        upsert_user(&conn, 7, None, Some("premium")).unwrap();
        assert_eq!(
            lookup_subscription_state(&conn, 7).unwrap().as_deref(),
            Some("premium")
        );
    }
}
