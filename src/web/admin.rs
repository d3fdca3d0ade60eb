//! Admin handlers.
//!
//! The admin surface is gated by a static bearer token; real identity
//! management lives in an external system in front of this service. With
//! no token configured the whole surface is closed.

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::core::access::AccessTier;
use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::storage::content::{
    self, ContentPatch, ContentPayload, NewContentPayload,
};
use crate::storage::menu::{
    self, AdminListFilter, MenuItem, MenuItemPatch, NewMenuItem,
};

use super::AppState;

fn require_admin(headers: &HeaderMap) -> AppResult<()> {
    let expected = config::ADMIN_TOKEN
        .as_deref()
        .ok_or_else(|| AppError::Unauthorized("admin surface is not configured".to_string()))?;

    let supplied = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match supplied {
        Some(token) if token == expected => Ok(()),
        _ => Err(AppError::Unauthorized("invalid admin token".to_string())),
    }
}

fn parse_tier(value: &str) -> AppResult<AccessTier> {
    match value {
        "free" => Ok(AccessTier::Free),
        "premium" => Ok(AccessTier::Premium),
        other => Err(AppError::Validation(format!(
            "access_tier must be 'free' or 'premium', got '{other}'"
        ))),
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub access_tier: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub items: Vec<MenuItem>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

pub async fn list_menu_items(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ListResponse>> {
    require_admin(&headers)?;

    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(config::pagination::DEFAULT_PAGE_SIZE)
        .clamp(1, config::pagination::MAX_PAGE_SIZE);
    let access_tier = query.access_tier.as_deref().map(parse_tier).transpose()?;

    let conn = state.pool.get()?;
    let (items, total) = menu::list_admin(
        &conn,
        &AdminListFilter {
            page,
            limit,
            parent_id: query.parent_id,
            is_active: query.is_active,
            access_tier,
        },
    )?;
    Ok(Json(ListResponse {
        items,
        total,
        page,
        limit,
    }))
}

pub async fn create_menu_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(new): Json<NewMenuItem>,
) -> AppResult<(StatusCode, Json<MenuItem>)> {
    require_admin(&headers)?;
    let conn = state.pool.get()?;
    let item = menu::create_menu_item(&conn, &new)?;
    log::info!("admin created menu item {} ({:?})", item.id, item.title);
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn get_menu_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> AppResult<Json<MenuItem>> {
    require_admin(&headers)?;
    let conn = state.pool.get()?;
    let item = menu::get_menu_item(&conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("menu item {id} not found")))?;
    Ok(Json(item))
}

pub async fn update_menu_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(patch): Json<MenuItemPatch>,
) -> AppResult<Json<MenuItem>> {
    require_admin(&headers)?;
    let conn = state.pool.get()?;
    let item = menu::update_menu_item(&conn, id, &patch)?;
    Ok(Json(item))
}

pub async fn delete_menu_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    require_admin(&headers)?;
    let mut conn = state.pool.get()?;
    menu::delete_menu_item(&mut conn, id)?;
    log::info!("admin deleted menu item {}", id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_item_content(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> AppResult<Json<ContentPayload>> {
    require_admin(&headers)?;
    let conn = state.pool.get()?;
    let payload = content::content_for_item(&conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("menu item {id} has no content file")))?;
    Ok(Json(payload))
}

pub async fn create_item_content(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(new): Json<NewContentPayload>,
) -> AppResult<(StatusCode, Json<ContentPayload>)> {
    require_admin(&headers)?;
    let conn = state.pool.get()?;
    let payload = content::create_content(&conn, id, &new)?;
    Ok((StatusCode::CREATED, Json(payload)))
}

pub async fn update_content_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(file_id): Path<i64>,
    Json(patch): Json<ContentPatch>,
) -> AppResult<Json<ContentPayload>> {
    require_admin(&headers)?;
    let conn = state.pool.get()?;
    let payload = content::update_content(&conn, file_id, &patch)?;
    Ok(Json(payload))
}

pub async fn delete_content_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(file_id): Path<i64>,
) -> AppResult<StatusCode> {
    require_admin(&headers)?;
    let conn = state.pool.get()?;
    content::delete_content(&conn, file_id)?;
    Ok(StatusCode::NO_CONTENT)
}
