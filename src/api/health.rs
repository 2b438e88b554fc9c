use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// `GET /`
pub async fn root_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Admin API is running",
        "version": VERSION,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// `GET /api`: index of resource roots.
pub async fn api_index_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "Admin API",
        "version": VERSION,
        "endpoints": {
            "health": "/api/health",
            "auth": "/api/auth",
            "services": "/api/services",
            "blogs": "/api/blogs",
            "categories": "/api/categories",
            "media": "/api/media",
            "faq": "/api/faq",
            "stats": "/api/stats",
        },
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// `GET /api/health`
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "API is running",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
