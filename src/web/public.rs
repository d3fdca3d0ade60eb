//! Bot-facing handlers.
//!
//! Every operation is keyed by `telegram_user_id`; the resolver maps it to
//! an access tier before touching the tree. The content endpoint hides
//! tier-gated items behind 404 so free callers cannot probe for premium
//! content by id.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::navigation::{
    ActivityOutcome, ActivityRequest, MenuContentResponse, MenuItemListResponse, RatingOutcome,
    SearchResponse,
};
use crate::storage::users::{self, BotUser};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub telegram_user_id: i64,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

pub async fn list_menu_items(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<MenuItemListResponse>> {
    let response = state
        .nav
        .list_children(params.telegram_user_id, params.parent_id)?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct UserParam {
    pub telegram_user_id: i64,
}

pub async fn get_menu_item_content(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<UserParam>,
) -> AppResult<Json<MenuContentResponse>> {
    match state.nav.get_content(params.telegram_user_id, id) {
        Ok(response) => Ok(Json(response)),
        // Existence hiding: a tier-gated item looks exactly like a
        // missing one from the outside.
        Err(AppError::Forbidden(_)) => {
            Err(AppError::NotFound(format!("menu item {id} not found")))
        }
        Err(e) => Err(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub telegram_user_id: i64,
    pub query: String,
    #[serde(default)]
    pub limit: Option<i64>,
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<SearchResponse>> {
    let limit = params.limit.unwrap_or(config::search::DEFAULT_LIMIT);
    if !(1..=config::search::MAX_LIMIT).contains(&limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {}",
            config::search::MAX_LIMIT
        )));
    }
    let response = state
        .nav
        .search(params.telegram_user_id, &params.query, limit)?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub telegram_user_id: i64,
    pub menu_item_id: i64,
    pub rating: i64,
}

pub async fn create_rating(
    State(state): State<AppState>,
    Json(request): Json<RatingRequest>,
) -> AppResult<(StatusCode, Json<RatingOutcome>)> {
    let outcome = state
        .nav
        .rate(request.telegram_user_id, request.menu_item_id, request.rating)?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn create_activity(
    State(state): State<AppState>,
    Json(request): Json<ActivityRequest>,
) -> AppResult<(StatusCode, Json<ActivityOutcome>)> {
    let outcome = state.nav.record_activity(&request)?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    pub telegram_id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub subscription_type: Option<String>,
}

pub async fn register_user(
    State(state): State<AppState>,
    Json(request): Json<RegisterUserRequest>,
) -> AppResult<(StatusCode, Json<BotUser>)> {
    if let Some(subscription) = request.subscription_type.as_deref() {
        if subscription != "free" && subscription != "premium" {
            return Err(AppError::Validation(
                "subscription_type must be 'free' or 'premium'".to_string(),
            ));
        }
    }

    let conn = state.pool.get()?;
    let user = users::upsert_user(
        &conn,
        request.telegram_id,
        request.username.as_deref(),
        request.subscription_type.as_deref(),
    )?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::access::AccessTier;
    use crate::storage::menu::{create_menu_item, ItemKind, NewMenuItem};
    use crate::storage::{create_pool, users};

    fn state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("web.sqlite");
        let pool = Arc::new(create_pool(path.to_str().unwrap()).unwrap());
        (AppState::new(pool), dir)
    }

    fn seed_premium_item(state: &AppState) -> i64 {
        let conn = state.pool.get().unwrap();
        create_menu_item(
            &conn,
            &NewMenuItem {
                title: "Pro material".to_string(),
                description: None,
                bot_message: None,
                parent_id: None,
                kind: ItemKind::Content,
                is_active: true,
                access_tier: AccessTier::Premium,
            },
        )
        .unwrap()
        .id
    }

    // A tier-gated item and a missing item must be indistinguishable to a
    // free caller at this boundary: both come back as NotFound, never
    // Forbidden.
    #[tokio::test]
    async fn test_content_handler_hides_gated_items_as_not_found() {
        let (state, _dir) = state();
        let gated = seed_premium_item(&state);

        let err = get_menu_item_content(
            State(state.clone()),
            Path(gated),
            Query(UserParam {
                telegram_user_id: 1,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)), "got {err}");

        let missing = get_menu_item_content(
            State(state),
            Path(gated + 1000),
            Query(UserParam {
                telegram_user_id: 1,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(missing, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_content_handler_serves_gated_item_to_premium_caller() {
        let (state, _dir) = state();
        let gated = seed_premium_item(&state);
        {
            let conn = state.pool.get().unwrap();
            users::upsert_user(&conn, 9, None, Some("premium")).unwrap();
        }

        let response = get_menu_item_content(
            State(state),
            Path(gated),
            Query(UserParam {
                telegram_user_id: 9,
            }),
        )
        .await
        .unwrap();
        assert_eq!(response.0.item.id, gated);
    }
}
