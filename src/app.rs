use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::auth;
use crate::auth::token::TokenService;
use crate::db::memory::InMemoryRepository;
use crate::db::models::{Blog, Category, FaqCategory, Media, Service, User};
use crate::db::repository::Repository;
use crate::media::pipeline::{MediaPipeline, MAX_BATCH_FILES};
use crate::storage::client::StorageClient;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<dyn Repository<Service>>,
    pub blogs: Arc<dyn Repository<Blog>>,
    pub categories: Arc<dyn Repository<Category>>,
    pub faqs: Arc<dyn Repository<FaqCategory>>,
    pub media: Arc<dyn Repository<Media>>,
    pub users: Arc<dyn Repository<User>>,
    pub media_pipeline: Arc<MediaPipeline>,
    pub tokens: Arc<TokenService>,
}

impl AppState {
    /// State backed entirely by in-memory repositories.
    pub fn in_memory(
        storage: Arc<dyn StorageClient>,
        tokens: TokenService,
        max_upload_bytes: usize,
    ) -> Self {
        let media: Arc<dyn Repository<Media>> = Arc::new(InMemoryRepository::<Media>::new());
        Self {
            services: Arc::new(InMemoryRepository::<Service>::new()),
            blogs: Arc::new(InMemoryRepository::<Blog>::new()),
            categories: Arc::new(InMemoryRepository::<Category>::new()),
            faqs: Arc::new(InMemoryRepository::<FaqCategory>::new()),
            media_pipeline: Arc::new(MediaPipeline::new(media.clone(), storage, max_upload_bytes)),
            media,
            users: Arc::new(InMemoryRepository::<User>::new()),
            tokens: Arc::new(tokens),
        }
    }
}

/// HTTP-level settings for [`router`].
#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Build the full API router.
pub fn router(state: AppState, options: &RouterOptions) -> Router {
    // Room for a full batch plus multipart framing.
    let body_limit = options
        .max_upload_bytes
        .saturating_mul(MAX_BATCH_FILES)
        .saturating_add(1024 * 1024);

    let auth_routes = Router::new()
        .route("/login", post(auth::login::login_handler))
        .route("/me", get(auth::login::me_handler));

    Router::new()
        .route("/", get(api::health::root_handler))
        .route("/api", get(api::health::api_index_handler))
        .route("/api/health", get(api::health::health_handler))
        .route("/api/stats", get(api::stats::stats_handler))
        .nest("/api/auth", auth_routes)
        .nest("/api/services", api::services::routes())
        .nest("/api/blogs", api::blogs::routes())
        .nest("/api/categories", api::categories::routes())
        .nest("/api/faq", api::faq::routes())
        .nest("/api/media", api::media::routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer(&options.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
