use std::time::Duration;

use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use tokio::sync::OnceCell;

use crate::error::AppError;

/// Server selection gives up after this long when MongoDB is unreachable.
pub const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Lazily connected MongoDB handle.
///
/// Owned by process initialization and passed explicitly to whatever needs
/// the database. Connecting is idempotent: concurrent callers share the
/// first successful connection.
pub struct DbHandle {
    uri: String,
    database: String,
    client: OnceCell<Client>,
}

impl DbHandle {
    pub fn new(uri: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            database: database.into(),
            client: OnceCell::new(),
        }
    }

    /// Connect if not already connected and return the database.
    pub async fn connect(&self) -> Result<Database, AppError> {
        let client = self
            .client
            .get_or_try_init(|| async {
                let mut options = ClientOptions::parse(&self.uri).await?;
                options.server_selection_timeout = Some(SERVER_SELECTION_TIMEOUT);
                let client = Client::with_options(options)?;

                // Fail fast instead of on the first query.
                client
                    .database(&self.database)
                    .run_command(bson::doc! { "ping": 1 })
                    .await?;

                tracing::info!(database = %self.database, "Connected to MongoDB");
                Ok::<_, AppError>(client)
            })
            .await?;

        Ok(client.database(&self.database))
    }

    pub fn is_connected(&self) -> bool {
        self.client.initialized()
    }
}
