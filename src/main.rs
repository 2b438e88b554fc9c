use std::sync::Arc;

use anyhow::Context;

use sitecms::app::{self, AppState, RouterOptions};
use sitecms::auth::login::seed_default_admin;
use sitecms::auth::token::TokenService;
use sitecms::config::{AppConfig, StorageBackend, DEFAULT_JWT_SECRET};
use sitecms::db::connection::DbHandle;
use sitecms::db::models::{Blog, Category, FaqCategory, Media, Service, User};
use sitecms::db::repository::{ensure_indexes, MongoRepository, Repository};
use sitecms::media::pipeline::{MediaPipeline, FILE_ROUTE_PREFIX};
use sitecms::storage::client::{LocalStorageClient, S3StorageClient, StorageClient};

async fn build_storage(config: &AppConfig) -> anyhow::Result<Arc<dyn StorageClient>> {
    let storage: Arc<dyn StorageClient> = match config.storage_backend {
        StorageBackend::Local => {
            let base_url = format!(
                "{}{}",
                config.public_base_url.trim_end_matches('/'),
                FILE_ROUTE_PREFIX
            );
            Arc::new(LocalStorageClient::new(&config.upload_dir, base_url).await?)
        }
        StorageBackend::S3 => {
            let public_url = config.s3_public_url.clone().unwrap_or_else(|| {
                format!(
                    "{}{}",
                    config.public_base_url.trim_end_matches('/'),
                    FILE_ROUTE_PREFIX
                )
            });
            Arc::new(
                S3StorageClient::connect(
                    config.s3_bucket.clone(),
                    config.s3_endpoint.as_deref(),
                    public_url,
                )
                .await?,
            )
        }
    };
    Ok(storage)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sitecms=info,tower_http=info".into()),
        )
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    tracing::info!(port = config.port, backend = ?config.storage_backend, "Starting sitecms");

    if config.jwt_secret == DEFAULT_JWT_SECRET {
        tracing::warn!("JWT_SECRET is not set; using the development secret");
    }

    // Connect to MongoDB
    let handle = DbHandle::new(&config.mongodb_uri, &config.mongodb_database);
    let db = handle
        .connect()
        .await
        .context("Failed to connect to MongoDB")?;

    ensure_indexes::<Service>(&db).await?;
    ensure_indexes::<Blog>(&db).await?;
    ensure_indexes::<Category>(&db).await?;
    ensure_indexes::<FaqCategory>(&db).await?;
    ensure_indexes::<Media>(&db).await?;
    ensure_indexes::<User>(&db).await?;

    let media: Arc<dyn Repository<Media>> = Arc::new(MongoRepository::<Media>::new(&db));
    let users: Arc<dyn Repository<User>> = Arc::new(MongoRepository::<User>::new(&db));

    let storage = build_storage(&config)
        .await
        .context("Failed to initialize storage")?;
    tracing::info!("Storage client initialized");

    seed_default_admin(
        users.as_ref(),
        &config.admin_email,
        &config.admin_password,
        bcrypt::DEFAULT_COST,
    )
    .await
    .context("Failed to seed admin user")?;

    let state = AppState {
        services: Arc::new(MongoRepository::<Service>::new(&db)),
        blogs: Arc::new(MongoRepository::<Blog>::new(&db)),
        categories: Arc::new(MongoRepository::<Category>::new(&db)),
        faqs: Arc::new(MongoRepository::<FaqCategory>::new(&db)),
        media_pipeline: Arc::new(MediaPipeline::new(
            media.clone(),
            storage,
            config.max_upload_bytes,
        )),
        media,
        users,
        tokens: Arc::new(TokenService::new(&config.jwt_secret, config.jwt_expires_days)),
    };

    let router = app::router(
        state,
        &RouterOptions {
            allowed_origins: config.allowed_origins(),
            max_upload_bytes: config.max_upload_bytes,
        },
    );

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    tracing::info!("Listening on http://{}", address);

    axum::serve(listener, router.into_make_service()).await?;
    Ok(())
}
