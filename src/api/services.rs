use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;

use crate::api::resource::{
    find_by_id_or_404, find_by_slug_or_404, process_create, process_delete, process_mutate,
    process_reorder, process_update, ReorderRequest,
};
use crate::api::response::ApiResponse;
use crate::app::AppState;
use crate::auth::middleware::AuthUser;
use crate::db::models::Service;
use crate::db::query::{Filter, Sort};
use crate::error::AppError;

pub const REORDERED: &str = "تم تحديث الترتيب بنجاح";

#[derive(Debug, Default, Deserialize)]
pub struct ServiceListQuery {
    pub active: Option<String>,
    pub category: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_services).post(create_service))
        .route("/reorder", patch(reorder_services))
        .route("/id/{id}", get(get_service_by_id))
        .route(
            "/{id}",
            get(get_service_by_slug)
                .put(update_service)
                .delete(delete_service),
        )
        .route("/{id}/toggle", patch(toggle_service))
}

/// `GET /api/services`
pub async fn list_services(
    State(state): State<AppState>,
    Query(query): Query<ServiceListQuery>,
) -> Result<Json<ApiResponse<Vec<Service>>>, AppError> {
    let mut filter = Filter::new().eq_opt("category", query.category.as_deref());
    if query.active.as_deref() == Some("true") {
        filter = filter.eq("isActive", true);
    }

    let services = state
        .services
        .find_many(&filter, &Sort::asc("order").then_desc("createdAt"), None)
        .await?;
    Ok(Json(ApiResponse::list(services)))
}

/// `GET /api/services/id/{id}`
pub async fn get_service_by_id(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Service>>, AppError> {
    let service = find_by_id_or_404(state.services.as_ref(), &id).await?;
    Ok(Json(ApiResponse::data(service)))
}

/// `GET /api/services/{slug}`
pub async fn get_service_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<Service>>, AppError> {
    let service = find_by_slug_or_404(state.services.as_ref(), &slug).await?;
    Ok(Json(ApiResponse::data(service)))
}

pub async fn create_service(
    _user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<ApiResponse<Service>>), AppError> {
    let service = process_create(state.services.as_ref(), payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::data(service))))
}

pub async fn update_service(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> Result<Json<ApiResponse<Service>>, AppError> {
    let service = process_update(state.services.as_ref(), &id, patch).await?;
    Ok(Json(ApiResponse::data(service)))
}

pub async fn delete_service(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    process_delete(state.services.as_ref(), &id).await?;
    Ok(Json(ApiResponse::message("تم حذف الخدمة بنجاح")))
}

/// `PATCH /api/services/{id}/toggle` flips `isActive`.
pub async fn toggle_service(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Service>>, AppError> {
    let service = process_mutate(state.services.as_ref(), &id, |service: &mut Service| {
        service.is_active = !service.is_active;
        Ok(())
    })
    .await?;
    Ok(Json(ApiResponse::data(service)))
}

pub async fn reorder_services(
    _user: AuthUser,
    State(state): State<AppState>,
    Json(request): Json<ReorderRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    process_reorder(state.services.as_ref(), &request.ordered_ids).await?;
    Ok(Json(ApiResponse::message(REORDERED)))
}
