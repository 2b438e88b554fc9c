#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;

use axum::Router;
use chrono::Utc;
use serde_json::Value;
use tempfile::TempDir;

use sitecms::app::{self, AppState, RouterOptions};
use sitecms::auth::login::{hash_password, seed_default_admin};
use sitecms::auth::token::TokenService;
use sitecms::db::models::{new_id, Role, User};
use sitecms::media::pipeline::{DEFAULT_MAX_UPLOAD_BYTES, FILE_ROUTE_PREFIX};
use sitecms::storage::client::{LocalStorageClient, StorageClient};

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const EDITOR_EMAIL: &str = "editor@example.com";
pub const PASSWORD: &str = "test-password";
pub const JWT_SECRET: &str = "test-secret";

/// Cheap bcrypt cost for tests.
const TEST_COST: u32 = 4;

/// In-memory application wired to a temporary local file store.
///
/// The upload directory lives as long as this struct.
pub struct TestEnv {
    _upload_dir: TempDir,
    pub router: Router,
    pub state: AppState,
    pub storage: Arc<dyn StorageClient>,
    pub admin_token: String,
    pub editor_token: String,
}

impl TestEnv {
    pub async fn start() -> Self {
        Self::with_upload_limit(DEFAULT_MAX_UPLOAD_BYTES).await
    }

    pub async fn with_upload_limit(max_upload_bytes: usize) -> Self {
        let upload_dir = tempfile::tempdir().expect("Failed to create upload dir");
        let storage: Arc<dyn StorageClient> = Arc::new(
            LocalStorageClient::new(
                upload_dir.path(),
                format!("http://localhost:5000{}", FILE_ROUTE_PREFIX),
            )
            .await
            .expect("Failed to create local storage"),
        );

        let tokens = TokenService::new(JWT_SECRET, 30);
        let state = AppState::in_memory(storage.clone(), tokens, max_upload_bytes);

        seed_default_admin(state.users.as_ref(), ADMIN_EMAIL, PASSWORD, TEST_COST)
            .await
            .expect("Failed to seed admin");

        let now = Utc::now();
        let editor = User {
            id: new_id(),
            email: EDITOR_EMAIL.to_string(),
            password_hash: hash_password(PASSWORD, TEST_COST)
                .await
                .expect("Failed to hash password"),
            name: "Editor".to_string(),
            role: Role::Editor,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state
            .users
            .create(&editor)
            .await
            .expect("Failed to create editor");

        let admin = state
            .users
            .find_one(&sitecms::db::query::Filter::new().eq("email", ADMIN_EMAIL))
            .await
            .expect("Failed to load admin")
            .expect("Admin missing");
        let admin_token = state.tokens.issue(&admin.id).expect("Failed to issue token");
        let editor_token = state.tokens.issue(&editor.id).expect("Failed to issue token");

        let router = app::router(
            state.clone(),
            &RouterOptions {
                allowed_origins: vec!["http://localhost:3001".to_string()],
                max_upload_bytes,
            },
        );

        Self {
            _upload_dir: upload_dir,
            router,
            state,
            storage,
            admin_token,
            editor_token,
        }
    }

    /// Build an `axum_test::TestServer` that expects success by default.
    pub fn server(&self) -> axum_test::TestServer {
        axum_test::TestServer::builder()
            .expect_success_by_default()
            .try_build(self.router.clone())
            .expect("Failed to build TestServer")
    }

    /// Build a `TestServer` that does NOT expect success by default (for error tests).
    pub fn server_permissive(&self) -> axum_test::TestServer {
        axum_test::TestServer::builder()
            .try_build(self.router.clone())
            .expect("Failed to build TestServer")
    }

    /// Helper: create a blog through the API and return its JSON.
    pub async fn create_blog(&self, server: &axum_test::TestServer, body: Value) -> Value {
        let response = server
            .post("/api/blogs")
            .authorization_bearer(&self.editor_token)
            .json(&body)
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json::<Value>()["data"].clone()
    }
}

/// Minimal complete blog payload.
pub fn blog_body(title: &str) -> Value {
    serde_json::json!({
        "title": title,
        "excerpt": "ملخص المقال",
        "content": "محتوى المقال عن العزل",
        "image": "/uploads/roof.webp",
        "category": "عزل"
    })
}

/// Encode a solid-colour PNG.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        width,
        height,
        image::Rgb([30, 120, 200]),
    ));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .expect("Failed to encode PNG");
    buf
}
