use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;

use crate::api::resource::{
    find_by_id_or_404, process_create, process_delete, process_mutate, process_reorder,
    process_update, ReorderRequest,
};
use crate::api::response::ApiResponse;
use crate::api::services::REORDERED;
use crate::app::AppState;
use crate::auth::middleware::AuthUser;
use crate::db::models::Category;
use crate::db::query::{Filter, Sort};
use crate::error::AppError;

#[derive(Debug, Default, Deserialize)]
pub struct CategoryListQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub active: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/reorder", patch(reorder_categories))
        .route(
            "/{id}",
            get(get_category).put(update_category).delete(delete_category),
        )
        .route("/{id}/toggle", patch(toggle_category))
}

pub async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<CategoryListQuery>,
) -> Result<Json<ApiResponse<Vec<Category>>>, AppError> {
    let mut filter = Filter::new().eq_opt("type", query.kind.as_deref());
    if query.active.as_deref() == Some("true") {
        filter = filter.eq("isActive", true);
    }

    let categories = state
        .categories
        .find_many(&filter, &Sort::asc("order").then_desc("createdAt"), None)
        .await?;
    Ok(Json(ApiResponse::list(categories)))
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Category>>, AppError> {
    let category = find_by_id_or_404(state.categories.as_ref(), &id).await?;
    Ok(Json(ApiResponse::data(category)))
}

pub async fn create_category(
    _user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<ApiResponse<Category>>), AppError> {
    let category = process_create(state.categories.as_ref(), payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::data(category))))
}

pub async fn update_category(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> Result<Json<ApiResponse<Category>>, AppError> {
    let category = process_update(state.categories.as_ref(), &id, patch).await?;
    Ok(Json(ApiResponse::data(category)))
}

pub async fn delete_category(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    process_delete(state.categories.as_ref(), &id).await?;
    Ok(Json(ApiResponse::message("تم حذف القسم بنجاح")))
}

pub async fn toggle_category(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Category>>, AppError> {
    let category = process_mutate(state.categories.as_ref(), &id, |category: &mut Category| {
        category.is_active = !category.is_active;
        Ok(())
    })
    .await?;
    Ok(Json(ApiResponse::data(category)))
}

pub async fn reorder_categories(
    _user: AuthUser,
    State(state): State<AppState>,
    Json(request): Json<ReorderRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    process_reorder(state.categories.as_ref(), &request.ordered_ids).await?;
    Ok(Json(ApiResponse::message(REORDERED)))
}
