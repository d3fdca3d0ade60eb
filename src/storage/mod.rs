//! Database pool, menu/content stores, statistics, and the activity log

pub mod activity;
pub mod content;
pub mod db;
pub mod menu;
pub mod stats;
pub mod users;

// Re-exports for convenience
pub use self::db::{
    create_pool, get_connection, migrate_schema, register_sql_functions, DbConnection, DbPool,
};
