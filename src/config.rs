use serde::Deserialize;

use crate::media::pipeline::DEFAULT_MAX_UPLOAD_BYTES;

/// Where uploaded binaries are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Local,
    S3,
}

/// Process configuration.
///
/// Layered from built-in defaults, an optional `sitecms.toml` in the working
/// directory, and environment variables (`PORT`, `MONGODB_URI`, ...), later
/// layers winning.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub port: u16,
    pub mongodb_uri: String,
    pub mongodb_database: String,
    pub jwt_secret: String,
    pub jwt_expires_days: i64,
    pub storage_backend: StorageBackend,
    /// Root directory of the local storage backend.
    pub upload_dir: String,
    /// Externally visible base URL of this API, used for local file URLs.
    pub public_base_url: String,
    pub s3_bucket: String,
    #[serde(default)]
    pub s3_endpoint: Option<String>,
    /// Base URL under which bucket objects are publicly reachable.
    #[serde(default)]
    pub s3_public_url: Option<String>,
    pub admin_email: String,
    pub admin_password: String,
    pub frontend_url: String,
    pub main_site_url: String,
    pub max_upload_bytes: usize,
}

pub const DEFAULT_JWT_SECRET: &str = "dev-secret-change-me";

impl AppConfig {
    /// Load configuration from defaults, `sitecms.toml` and the environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::builder()?
            .add_source(config::File::with_name("sitecms").required(false))
            .add_source(config::Environment::default().try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Built-in defaults only.
    pub fn defaults() -> Result<Self, config::ConfigError> {
        Self::builder()?.build()?.try_deserialize()
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
        config::Config::builder()
            .set_default("port", 5000)?
            .set_default("mongodb_uri", "mongodb://localhost:27017")?
            .set_default("mongodb_database", "sitecms")?
            .set_default("jwt_secret", DEFAULT_JWT_SECRET)?
            .set_default("jwt_expires_days", 30)?
            .set_default("storage_backend", "local")?
            .set_default("upload_dir", "uploads")?
            .set_default("public_base_url", "http://localhost:5000")?
            .set_default("s3_bucket", "")?
            .set_default("admin_email", "admin@tebaservices.com")?
            .set_default("admin_password", "admin123")?
            .set_default("frontend_url", "http://localhost:3001")?
            .set_default("main_site_url", "http://localhost:3000")?
            .set_default("max_upload_bytes", DEFAULT_MAX_UPLOAD_BYTES as i64)
    }

    /// Origins allowed by CORS, deduplicated.
    pub fn allowed_origins(&self) -> Vec<String> {
        let mut origins = Vec::new();
        for origin in [
            self.frontend_url.as_str(),
            self.main_site_url.as_str(),
            "http://localhost:3000",
            "http://localhost:3001",
        ] {
            let origin = origin.trim_end_matches('/').to_string();
            if !origin.is_empty() && !origins.contains(&origin) {
                origins.push(origin);
            }
        }
        origins
    }

    pub fn bind_address(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::defaults().unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.jwt_expires_days, 30);
        assert_eq!(config.storage_backend, StorageBackend::Local);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.admin_email, "admin@tebaservices.com");
        assert!(config.s3_endpoint.is_none());
    }

    #[test]
    fn test_allowed_origins_deduplicated() {
        let mut config = AppConfig::defaults().unwrap();
        config.frontend_url = "https://admin.example.com/".to_string();
        let origins = config.allowed_origins();
        assert_eq!(
            origins,
            vec![
                "https://admin.example.com",
                "http://localhost:3000",
                "http://localhost:3001"
            ]
        );
    }

    #[test]
    fn test_storage_backend_parsing() {
        let backend: StorageBackend = serde_json::from_str("\"s3\"").unwrap();
        assert_eq!(backend, StorageBackend::S3);
    }
}
