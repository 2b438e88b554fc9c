use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::response::ApiResponse;
use crate::app::AppState;
use crate::db::models::PublishStatus;
use crate::db::query::Filter;
use crate::error::AppError;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ServiceStats {
    pub total: u64,
    pub active: u64,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct BlogStats {
    pub total: u64,
    pub published: u64,
    pub drafts: u64,
}

/// Dashboard counters.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Stats {
    pub services: ServiceStats,
    pub blogs: BlogStats,
    pub categories: u64,
    pub media: u64,
}

pub async fn collect_stats(state: &AppState) -> Result<Stats, AppError> {
    let all = Filter::new();
    let (services, blogs, categories, media) = tokio::try_join!(
        state.services.count(&all),
        state.blogs.count(&all),
        state.categories.count(&all),
        state.media.count(&all),
    )?;

    let published_filter = Filter::new().eq("status", PublishStatus::Published);
    let draft_filter = Filter::new().eq("status", PublishStatus::Draft);
    let active_filter = Filter::new().eq("isActive", true);
    let (published, drafts, active) = tokio::try_join!(
        state.blogs.count(&published_filter),
        state.blogs.count(&draft_filter),
        state.services.count(&active_filter),
    )?;

    Ok(Stats {
        services: ServiceStats {
            total: services,
            active,
        },
        blogs: BlogStats {
            total: blogs,
            published,
            drafts,
        },
        categories,
        media,
    })
}

/// `GET /api/stats`
pub async fn stats_handler(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Stats>>, AppError> {
    Ok(Json(ApiResponse::data(collect_stats(&state).await?)))
}
