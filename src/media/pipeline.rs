use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;

use crate::db::models::{new_id, Entity, Media, RelatedTo};
use crate::db::repository::Repository;
use crate::error::AppError;
use crate::media::transcode::{is_transcodable, transcode_blocking, WEBP_MIME};
use crate::storage::client::StorageClient;

/// Default per-file size limit.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
/// Maximum number of files accepted by one multi-file upload.
pub const MAX_BATCH_FILES: usize = 10;
/// Route that serves stored binaries back through the API.
pub const FILE_ROUTE_PREFIX: &str = "/api/media/file";

/// Image formats accepted for upload.
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "svg"];
pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/svg+xml",
];
pub const UNSUPPORTED_FORMAT: &str =
    "نوع الملف غير مدعوم (المسموح: jpg, jpeg, png, gif, webp, svg)";

/// A file received from a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub original_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Metadata shared by all files of one upload request.
#[derive(Debug, Clone, Default)]
pub struct UploadMetadata {
    pub alt: String,
    pub related_to: Option<RelatedTo>,
}

/// Per-file outcome of a batch upload.
#[derive(Debug)]
pub struct BatchItem {
    pub original_name: String,
    pub result: Result<Media, AppError>,
}

/// Media ingestion: validate, store, transcode, record.
pub struct MediaPipeline {
    repo: Arc<dyn Repository<Media>>,
    storage: Arc<dyn StorageClient>,
    max_upload_bytes: usize,
}

impl MediaPipeline {
    pub fn new(
        repo: Arc<dyn Repository<Media>>,
        storage: Arc<dyn StorageClient>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            repo,
            storage,
            max_upload_bytes,
        }
    }

    pub fn storage(&self) -> &dyn StorageClient {
        self.storage.as_ref()
    }

    fn validate(&self, file: &UploadedFile) -> Result<(), AppError> {
        if file.data.is_empty() {
            return Err(AppError::UploadRejected("لم يتم رفع أي ملف".into()));
        }
        if file.data.len() > self.max_upload_bytes {
            return Err(AppError::UploadRejected(format!(
                "حجم الملف كبير جداً (الحد الأقصى {}MB)",
                self.max_upload_bytes / (1024 * 1024)
            )));
        }

        let content_type = essence(&file.content_type);
        if !ALLOWED_CONTENT_TYPES.contains(&content_type.as_str()) {
            return Err(AppError::UploadRejected(UNSUPPORTED_FORMAT.into()));
        }
        if let Some((_, ext)) = file.original_name.rsplit_once('.') {
            if !ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
                return Err(AppError::UploadRejected(UNSUPPORTED_FORMAT.into()));
            }
        }
        Ok(())
    }

    /// Ingest a single file and return its persisted record.
    pub async fn ingest(
        &self,
        file: UploadedFile,
        metadata: &UploadMetadata,
    ) -> Result<Media, AppError> {
        // 1. Reject empty, oversized and non-image payloads
        self.validate(&file)?;

        let UploadedFile {
            original_name,
            content_type,
            data,
        } = file;
        let content_type = essence(&content_type);
        let received_size = data.len();

        // 2. Store the received binary under its original key
        let stem = storage_stem();
        let original_key = format!("{}.{}", stem, extension_for(&original_name, &content_type));
        let source = is_transcodable(&content_type).then(|| data.clone());

        let original_url = self
            .storage
            .put_object(&original_key, data, &content_type)
            .await?;

        // 3. Transcode raster images, pass everything else through
        let (key, url, mimetype, size, width, height) = match source {
            Some(source) => {
                let transcoded = match transcode_blocking(source).await {
                    Ok(transcoded) => transcoded,
                    Err(e) => {
                        tracing::warn!(original_name = %original_name, error = %e, "Transcode failed");
                        self.discard(&original_key).await;
                        return Err(e);
                    }
                };

                let final_key = format!("{}.webp", stem);
                let size = transcoded.bytes.len() as u64;
                let url = match self
                    .storage
                    .put_object(&final_key, transcoded.bytes, WEBP_MIME)
                    .await
                {
                    Ok(url) => url,
                    Err(e) => {
                        self.discard(&original_key).await;
                        return Err(e);
                    }
                };

                (
                    final_key,
                    url,
                    WEBP_MIME.to_string(),
                    size,
                    Some(transcoded.width),
                    Some(transcoded.height),
                )
            }
            None => (
                original_key.clone(),
                original_url,
                content_type.clone(),
                received_size as u64,
                None,
                None,
            ),
        };

        // 4. Create the metadata record
        let now = Utc::now();
        let media = Media {
            id: new_id(),
            path: format!("{}/{}", FILE_ROUTE_PREFIX, key),
            filename: key.clone(),
            original_name: original_name.clone(),
            url,
            mimetype,
            size,
            width,
            height,
            alt: metadata.alt.clone(),
            related_to: metadata.related_to.clone(),
            created_at: now,
            updated_at: now,
        };

        let created = match media.validate() {
            Ok(()) => self.repo.create(&media).await,
            Err(e) => Err(e),
        };
        if let Err(e) = created {
            self.discard(&key).await;
            if key != original_key {
                self.discard(&original_key).await;
            }
            return Err(e);
        }

        // 5. Drop the original once the transcoded copy is recorded
        if key != original_key {
            self.discard(&original_key).await;
        }

        tracing::info!(
            media_id = %media.id,
            key = %media.filename,
            original_name = %original_name,
            received_bytes = received_size,
            stored_bytes = media.size,
            "Media ingested"
        );

        Ok(media)
    }

    /// Ingest up to [`MAX_BATCH_FILES`] files concurrently.
    ///
    /// Files succeed or fail independently; successes are not rolled back.
    pub async fn ingest_batch(
        &self,
        files: Vec<UploadedFile>,
        metadata: &UploadMetadata,
    ) -> Result<Vec<BatchItem>, AppError> {
        if files.is_empty() {
            return Err(AppError::UploadRejected("لم يتم رفع أي ملفات".into()));
        }
        if files.len() > MAX_BATCH_FILES {
            return Err(AppError::UploadRejected(format!(
                "الحد الأقصى {} ملفات",
                MAX_BATCH_FILES
            )));
        }

        let uploads = files.into_iter().map(|file| async move {
            let original_name = file.original_name.clone();
            let result = self.ingest(file, metadata).await;
            BatchItem {
                original_name,
                result,
            }
        });

        Ok(join_all(uploads).await)
    }

    /// Delete a media record and release its binary.
    ///
    /// A failing binary delete is logged and does not block the record delete.
    pub async fn delete(&self, id: &str) -> Result<Media, AppError> {
        let media = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(Media::NOT_FOUND.into()))?;

        if let Err(e) = self.storage.delete_object(&media.filename).await {
            tracing::warn!(media_id = %media.id, key = %media.filename, error = %e, "Failed to delete stored file");
        }

        self.repo
            .delete_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(Media::NOT_FOUND.into()))
    }

    /// Best-effort removal of an intermediate binary.
    async fn discard(&self, key: &str) {
        if let Err(e) = self.storage.delete_object(key).await {
            tracing::warn!(key, error = %e, "Failed to clean up stored file");
        }
    }
}

/// Unique key stem: `media/{millis}-{uuid}`.
fn storage_stem() -> String {
    format!(
        "media/{}-{}",
        Utc::now().timestamp_millis(),
        uuid::Uuid::new_v4().simple()
    )
}

/// Lowercased mimetype without parameters.
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// File extension from the original name, falling back to the mimetype.
fn extension_for(original_name: &str, content_type: &str) -> String {
    let from_name = original_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    from_name.unwrap_or_else(|| {
        let ext = match content_type {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/svg+xml" => "svg",
            _ => "bin",
        };
        ext.to_string()
    })
}
