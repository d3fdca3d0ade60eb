//! Vetka — backend for a content-delivery Telegram bot
//!
//! This library provides the content navigation core for the bot:
//! the menu-item tree, tier-gated access resolution, rolling
//! view/download/rating statistics, and keyword search.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, access policy, validation
//! - `storage`: database pool, menu/content stores, statistics, activity log
//! - `navigation`: request-scoped orchestration of the above
//! - `web`: admin- and bot-facing HTTP surfaces

pub mod core;
pub mod navigation;
pub mod storage;
pub mod web;

// Re-export commonly used types for convenience
pub use crate::core::access::{can_view, resolve_tier, AccessTier};
pub use crate::core::error::{AppError, AppResult};
pub use navigation::NavigationService;
pub use storage::{create_pool, get_connection, DbConnection, DbPool};
