//! Navigation resolver: the service layer every public read and write
//! goes through.
//!
//! Each operation resolves the caller's access tier first, then performs
//! its reads and side effects. Statistics and activity side effects that
//! belong to one logical operation run inside one transaction, so a
//! recorded event and its counter move together or not at all.

use std::sync::Arc;

use serde::Serialize;

use crate::core::access::{can_view, resolve_tier, AccessTier};
use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::core::validation;
use crate::storage::activity::{self, ActivityType};
use crate::storage::content::ContentPayload;
use crate::storage::menu::{self, MenuItem};
use crate::storage::stats;
use crate::storage::users;
use crate::storage::DbPool;

/// A menu item as the bot sees it. `children` is always empty in list
/// responses; only the single-item content read fills it, one level deep.
#[derive(Debug, Clone, Serialize)]
pub struct MenuItemNode {
    #[serde(flatten)]
    pub item: MenuItem,
    pub children: Vec<MenuItem>,
}

#[derive(Debug, Serialize)]
pub struct MenuItemListResponse {
    pub items: Vec<MenuItemNode>,
}

/// Single-item read: the item, its payload if it has one, one level of
/// visible children, and a fallback message when a navigation section has
/// nothing to show.
#[derive(Debug, Serialize)]
pub struct MenuContentResponse {
    #[serde(flatten)]
    pub item: MenuItem,
    pub content: Option<ContentPayload>,
    pub children: Vec<MenuItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_section_message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub items: Vec<MenuItem>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct RatingOutcome {
    pub menu_item_id: i64,
    pub rating: i64,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ActivityOutcome {
    pub activity_id: i64,
}

/// Fields of a raw activity event as submitted by the bot.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ActivityRequest {
    pub telegram_user_id: i64,
    #[serde(default)]
    pub menu_item_id: Option<i64>,
    pub activity_type: ActivityType,
    #[serde(default)]
    pub rating: Option<i64>,
    #[serde(default)]
    pub search_query: Option<String>,
}

/// Orchestrates tier resolution, tree reads, search, and the statistics
/// side effects. Cheap to clone; holds only the pool handle.
#[derive(Clone)]
pub struct NavigationService {
    pool: Arc<DbPool>,
}

impl NavigationService {
    pub fn new(pool: Arc<DbPool>) -> Self {
        NavigationService { pool }
    }

    fn tier_for(
        &self,
        conn: &rusqlite::Connection,
        telegram_user_id: i64,
    ) -> AppResult<AccessTier> {
        let state = users::lookup_subscription_state(conn, telegram_user_id)?;
        Ok(resolve_tier(state.as_deref()))
    }

    /// One level of the menu tree visible to this caller.
    ///
    /// With `parent_id` absent this is the root level. A missing or
    /// inactive parent is `NotFound`; an empty result is a normal empty
    /// list, never an error.
    pub fn list_children(
        &self,
        telegram_user_id: i64,
        parent_id: Option<i64>,
    ) -> AppResult<MenuItemListResponse> {
        let conn = self.pool.get()?;
        let tier = self.tier_for(&conn, telegram_user_id)?;

        if let Some(parent_id) = parent_id {
            let parent = menu::get_menu_item(&conn, parent_id)?
                .filter(|p| p.is_active)
                .ok_or_else(|| {
                    AppError::NotFound(format!("menu item {parent_id} not found"))
                })?;
            log::debug!(
                "listing children of {} for user {} at tier {}",
                parent.id,
                telegram_user_id,
                tier
            );
        }

        let items = menu::children_of(&conn, parent_id, true, Some(tier))?;
        Ok(MenuItemListResponse {
            items: items
                .into_iter()
                .map(|item| MenuItemNode {
                    item,
                    children: Vec::new(),
                })
                .collect(),
        })
    }

    /// Resolve one item with its payload and one level of children, and
    /// record the view.
    ///
    /// Absent and inactive items are both `NotFound`. A tier-gated item is
    /// `Forbidden` here; the public handler hides that distinction from
    /// callers. The `material_open` event and the view counter are written
    /// in one transaction with the read.
    pub fn get_content(
        &self,
        telegram_user_id: i64,
        item_id: i64,
    ) -> AppResult<MenuContentResponse> {
        let mut conn = self.pool.get()?;
        let tier = self.tier_for(&conn, telegram_user_id)?;

        let tx = conn.transaction()?;
        let (item, content, children) =
            menu::get_with_content_and_children(&tx, item_id, tier)?.ok_or_else(|| {
                AppError::NotFound(format!("menu item {item_id} not found"))
            })?;

        if !can_view(tier, item.access_tier) {
            return Err(AppError::Forbidden(format!(
                "menu item {item_id} requires a premium subscription"
            )));
        }

        activity::emit(
            &tx,
            telegram_user_id,
            Some(item_id),
            ActivityType::MaterialOpen,
            None,
            None,
            None,
        )?;
        stats::record_view(&tx, item_id)?;
        tx.commit()?;

        let empty_section_message = if menu::ItemKind::Navigation == item.kind
            && children.is_empty()
            && content.is_none()
        {
            Some("This section is empty for now. Check back later.".to_string())
        } else {
            None
        };

        Ok(MenuContentResponse {
            item,
            content,
            children,
            empty_section_message,
        })
    }

    /// Keyword search over titles and descriptions, tier-filtered.
    ///
    /// The query is validated and normalized before any datastore work;
    /// the emitted `search` event records the normalized form together
    /// with the result count.
    pub fn search(
        &self,
        telegram_user_id: i64,
        raw_query: &str,
        limit: i64,
    ) -> AppResult<SearchResponse> {
        let normalized = validation::validate_search_query(raw_query)?;
        let limit = limit.clamp(1, config::search::MAX_LIMIT);

        let conn = self.pool.get()?;
        let tier = self.tier_for(&conn, telegram_user_id)?;
        let items = menu::search_items(&conn, &normalized, tier, limit)?;

        activity::emit(
            &conn,
            telegram_user_id,
            None,
            ActivityType::Search,
            None,
            Some(&normalized),
            Some(items.len() as i64),
        )?;

        log::debug!(
            "search {:?} by user {} returned {} items",
            normalized,
            telegram_user_id,
            items.len()
        );
        Ok(SearchResponse {
            total: items.len(),
            query: normalized,
            items,
        })
    }

    /// Record a 1-5 rating for an active item. The rating event and the
    /// counter update commit together.
    pub fn rate(
        &self,
        telegram_user_id: i64,
        menu_item_id: i64,
        rating: i64,
    ) -> AppResult<RatingOutcome> {
        validation::validate_rating_value(rating)?;

        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        let item = menu::get_menu_item(&tx, menu_item_id)?
            .filter(|i| i.is_active)
            .ok_or_else(|| AppError::NotFound(format!("menu item {menu_item_id} not found")))?;

        activity::emit(
            &tx,
            telegram_user_id,
            Some(item.id),
            ActivityType::Rating,
            Some(rating),
            None,
            None,
        )?;
        stats::record_rating(&tx, item.id, rating)?;
        tx.commit()?;

        Ok(RatingOutcome {
            menu_item_id,
            rating,
            message: "Thank you for your rating!".to_string(),
        })
    }

    /// Record a raw activity event submitted by the bot and drive the
    /// aggregated counters from it.
    ///
    /// View-kind events bump `view_count`, `download` bumps
    /// `download_count`, `rating` routes through the same atomic rating
    /// update as the rating endpoint.
    pub fn record_activity(&self, request: &ActivityRequest) -> AppResult<ActivityOutcome> {
        validation::validate_activity_rating(request.rating, request.activity_type)?;

        let normalized_query = match request.search_query.as_deref() {
            Some(raw) if request.activity_type == ActivityType::Search => {
                Some(validation::validate_search_query(raw)?)
            }
            Some(_) => {
                return Err(AppError::Validation(
                    "search_query may only be supplied for activity type 'search'".to_string(),
                ))
            }
            None => None,
        };

        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        if let Some(item_id) = request.menu_item_id {
            if menu::get_menu_item(&tx, item_id)?.is_none() {
                return Err(AppError::NotFound(format!("menu item {item_id} not found")));
            }
        }

        let activity_id = activity::emit(
            &tx,
            request.telegram_user_id,
            request.menu_item_id,
            request.activity_type,
            request.rating,
            normalized_query.as_deref(),
            None,
        )?;

        if let Some(item_id) = request.menu_item_id {
            if request.activity_type.is_view() {
                stats::record_view(&tx, item_id)?;
            } else if request.activity_type == ActivityType::Download {
                stats::record_download(&tx, item_id)?;
            } else if request.activity_type == ActivityType::Rating {
                // Unreachable without a rating per the cross-rule above.
                if let Some(rating) = request.rating {
                    stats::record_rating(&tx, item_id, rating)?;
                }
            }
        }
        tx.commit()?;

        Ok(ActivityOutcome { activity_id })
    }
}
