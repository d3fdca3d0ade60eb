//! HTTP surface: router assembly and error mapping.

pub mod admin;
pub mod public;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::core::error::AppError;
use crate::navigation::NavigationService;
use crate::storage::DbPool;

/// Shared handler state. Cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    pub nav: NavigationService,
    pub pool: Arc<DbPool>,
}

impl AppState {
    pub fn new(pool: Arc<DbPool>) -> Self {
        AppState {
            nav: NavigationService::new(pool.clone()),
            pool,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            // Infrastructure details never reach the caller.
            AppError::Database(_) | AppError::DatabasePool(_) | AppError::Io(_) => {
                log::error!("request failed: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// Assemble the public and admin surfaces into one router.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/v1/menu-items", get(public::list_menu_items))
        .route(
            "/api/v1/menu-items/{id}/content",
            get(public::get_menu_item_content),
        )
        .route("/api/v1/search", get(public::search))
        .route("/api/v1/ratings", post(public::create_rating))
        .route("/api/v1/user-activities", post(public::create_activity))
        .route("/api/v1/users", post(public::register_user))
        .route("/health", get(public::health));

    let admin = Router::new()
        .route(
            "/api/v1/admin/menu-items",
            get(admin::list_menu_items).post(admin::create_menu_item),
        )
        .route(
            "/api/v1/admin/menu-items/{id}",
            get(admin::get_menu_item)
                .put(admin::update_menu_item)
                .delete(admin::delete_menu_item),
        )
        .route(
            "/api/v1/admin/menu-items/{id}/content-files",
            get(admin::get_item_content).post(admin::create_item_content),
        )
        .route(
            "/api/v1/admin/content-files/{file_id}",
            put(admin::update_content_file).delete(admin::delete_content_file),
        );

    api.merge(admin)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
