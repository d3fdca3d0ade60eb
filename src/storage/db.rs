use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::functions::FunctionFlags;
use rusqlite::{Connection, Result};

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Create a new database connection pool
///
/// Initializes a pool with up to 10 connections and runs schema migrations.
/// Every connection is opened with WAL journaling, foreign keys enabled and
/// a busy timeout, so concurrent writers from different pool connections
/// queue instead of failing.
///
/// # Arguments
///
/// * `database_path` - Path to SQLite database file
pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path).with_init(|conn| {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        register_sql_functions(conn)
    });
    let pool = Pool::builder().max_size(10).build(manager)?;

    // Ensure schema is up to date on first connection
    let conn = pool.get()?;
    if let Err(e) = migrate_schema(&conn) {
        log::warn!("Failed to migrate schema: {}", e);
    }

    Ok(pool)
}

/// Get a connection from the pool
///
/// The connection is automatically returned to the pool when dropped.
pub fn get_connection(pool: &DbPool) -> Result<DbConnection, r2d2::Error> {
    pool.get()
}

/// Register custom SQL functions on a connection.
///
/// `text_contains_fold(haystack, needle)` is a substring test that
/// lowercases the haystack with full Unicode folding before matching.
/// SQLite's own LIKE only folds ASCII, which silently misses Cyrillic
/// titles that differ from the query in case alone. The needle is
/// expected pre-lowercased by the caller so the fold runs once per row,
/// not twice.
pub fn register_sql_functions(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        "text_contains_fold",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let haystack: Option<String> = ctx.get(0)?;
            let needle: String = ctx.get(1)?;
            Ok(haystack.is_some_and(|h| h.to_lowercase().contains(&needle)))
        },
    )
}

/// Create all required tables and indexes if they do not exist yet.
///
/// Idempotent; safe to run on every startup and on fresh test databases.
pub fn migrate_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS menu_items (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            title           TEXT NOT NULL,
            description     TEXT,
            bot_message     TEXT,
            parent_id       INTEGER REFERENCES menu_items(id),
            kind            TEXT NOT NULL DEFAULT 'navigation',
            is_active       INTEGER NOT NULL DEFAULT 1,
            access_tier     TEXT NOT NULL DEFAULT 'free',
            view_count      INTEGER NOT NULL DEFAULT 0,
            download_count  INTEGER NOT NULL DEFAULT 0,
            rating_sum      INTEGER NOT NULL DEFAULT 0,
            rating_count    INTEGER NOT NULL DEFAULT 0,
            average_rating  REAL,
            created_at      TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at      TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );
        CREATE INDEX IF NOT EXISTS idx_menu_items_parent_id ON menu_items(parent_id);
        CREATE INDEX IF NOT EXISTS idx_menu_items_is_active ON menu_items(is_active);
        CREATE INDEX IF NOT EXISTS idx_menu_items_access_tier ON menu_items(access_tier);

        CREATE TABLE IF NOT EXISTS content_files (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            menu_item_id        INTEGER NOT NULL UNIQUE REFERENCES menu_items(id),
            content_type        TEXT NOT NULL,
            telegram_file_id    TEXT,
            caption             TEXT,
            text_content        TEXT,
            external_url        TEXT,
            web_app_short_name  TEXT,
            local_file_path     TEXT,
            file_size           INTEGER,
            mime_type           TEXT,
            width               INTEGER,
            height              INTEGER,
            duration            INTEGER,
            thumbnail_file_id   TEXT,
            created_at          TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at          TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS users (
            telegram_id        INTEGER PRIMARY KEY,
            username           TEXT,
            subscription_type  TEXT NOT NULL DEFAULT 'free',
            created_at         TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS user_activities (
            id                INTEGER PRIMARY KEY AUTOINCREMENT,
            telegram_user_id  INTEGER NOT NULL,
            menu_item_id      INTEGER REFERENCES menu_items(id) ON DELETE SET NULL,
            activity_type     TEXT NOT NULL,
            rating            INTEGER,
            search_query      TEXT,
            result_count      INTEGER,
            created_at        TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );
        CREATE INDEX IF NOT EXISTS idx_user_activities_menu_item_id
            ON user_activities(menu_item_id);",
    )?;
    Ok(())
}
