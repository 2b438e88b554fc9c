use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;

use crate::api::resource::{
    find_by_id_or_404, find_by_slug_or_404, process_create, process_delete, process_mutate,
    process_update,
};
use crate::api::response::ApiResponse;
use crate::app::AppState;
use crate::auth::middleware::AuthUser;
use crate::db::models::{Blog, PublishStatus};
use crate::db::query::{Filter, Sort};
use crate::error::AppError;

/// Maximum number of related articles returned.
pub const RELATED_LIMIT: usize = 3;

#[derive(Debug, Default, Deserialize)]
pub struct BlogListQuery {
    pub status: Option<String>,
    pub category: Option<String>,
    pub featured: Option<String>,
    pub limit: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_blogs).post(create_blog))
        .route("/categories/list", get(list_blog_categories))
        .route("/id/{id}", get(get_blog_by_id))
        .route(
            "/{id}",
            get(get_blog_by_slug).put(update_blog).delete(delete_blog),
        )
        .route("/{id}/related", get(related_blogs))
        .route("/{id}/featured", patch(toggle_featured))
        .route("/{id}/publish", patch(toggle_publish))
}

/// `GET /api/blogs`
pub async fn list_blogs(
    State(state): State<AppState>,
    Query(query): Query<BlogListQuery>,
) -> Result<Json<ApiResponse<Vec<Blog>>>, AppError> {
    let mut filter = Filter::new()
        .eq_opt("status", query.status.as_deref())
        .eq_opt("category", query.category.as_deref());
    if query.featured.as_deref() == Some("true") {
        filter = filter.eq("featured", true);
    }
    let limit = parse_limit(query.limit.as_deref());

    let sort = Sort::asc("order")
        .then_desc("publishedAt")
        .then_desc("createdAt");
    let blogs = state.blogs.find_many(&filter, &sort, limit).await?;
    Ok(Json(ApiResponse::list(blogs)))
}

/// A positive page size; unparseable, zero and negative values mean no limit.
fn parse_limit(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|l| l.trim().parse::<i64>().ok())
        .filter(|l| *l > 0)
}

/// `GET /api/blogs/id/{id}`
pub async fn get_blog_by_id(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Blog>>, AppError> {
    let blog = find_by_id_or_404(state.blogs.as_ref(), &id).await?;
    Ok(Json(ApiResponse::data(blog)))
}

/// `GET /api/blogs/{slug}`
pub async fn get_blog_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<Blog>>, AppError> {
    let blog = find_by_slug_or_404(state.blogs.as_ref(), &slug).await?;
    Ok(Json(ApiResponse::data(blog)))
}

/// Published articles other than `blog` sharing its category or a tag,
/// newest first.
pub fn select_related(blog: &Blog, candidates: Vec<Blog>) -> Vec<Blog> {
    candidates
        .into_iter()
        .filter(|other| other.id != blog.id && other.status == PublishStatus::Published)
        .filter(|other| {
            other.category == blog.category || other.tags.iter().any(|t| blog.tags.contains(t))
        })
        .take(RELATED_LIMIT)
        .collect()
}

/// `GET /api/blogs/{slug}/related`
pub async fn related_blogs(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<Vec<Blog>>>, AppError> {
    let blog = find_by_slug_or_404(state.blogs.as_ref(), &slug).await?;

    let candidates = state
        .blogs
        .find_many(
            &Filter::new().eq("status", PublishStatus::Published),
            &Sort::desc("publishedAt"),
            None,
        )
        .await?;
    Ok(Json(ApiResponse::data(select_related(&blog, candidates))))
}

/// `GET /api/blogs/categories/list`: distinct category labels in use.
pub async fn list_blog_categories(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<String>>>, AppError> {
    let blogs = state
        .blogs
        .find_many(&Filter::new(), &Sort::asc("category"), None)
        .await?;

    let mut categories: Vec<String> = blogs.into_iter().map(|b| b.category).collect();
    categories.dedup();
    Ok(Json(ApiResponse::data(categories)))
}

pub async fn create_blog(
    _user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<ApiResponse<Blog>>), AppError> {
    let blog = process_create(state.blogs.as_ref(), payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::data(blog))))
}

pub async fn update_blog(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> Result<Json<ApiResponse<Blog>>, AppError> {
    let blog = process_update(state.blogs.as_ref(), &id, patch).await?;
    Ok(Json(ApiResponse::data(blog)))
}

pub async fn delete_blog(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    process_delete(state.blogs.as_ref(), &id).await?;
    Ok(Json(ApiResponse::message("تم حذف المقال بنجاح")))
}

pub async fn toggle_featured(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Blog>>, AppError> {
    let blog = process_mutate(state.blogs.as_ref(), &id, |blog: &mut Blog| {
        blog.featured = !blog.featured;
        Ok(())
    })
    .await?;
    Ok(Json(ApiResponse::data(blog)))
}

/// `PATCH /api/blogs/{id}/publish` toggles between draft and published.
pub async fn toggle_publish(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Blog>>, AppError> {
    let blog = process_mutate(state.blogs.as_ref(), &id, |blog: &mut Blog| {
        blog.status = blog.status.toggled();
        Ok(())
    })
    .await?;
    Ok(Json(ApiResponse::data(blog)))
}
