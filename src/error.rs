use thiserror::Error;

/// Application-wide error types.
///
/// Every variant except [`AppError::StorageDelete`] aborts the current request.
/// `Display` yields the localized message returned to API clients.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required field is missing or malformed.
    #[error("{0}")]
    Validation(String),

    /// A unique index rejected the write.
    #[error("هذا {} موجود مسبقاً", duplicate_field_label(.field))]
    DuplicateKey { field: String },

    #[error("{0}")]
    NotFound(String),

    /// No file was uploaded, or the payload is unusable.
    #[error("{0}")]
    UploadRejected(String),

    /// Image decoding or re-encoding failed.
    #[error("فشل معالجة الصورة: {0}")]
    Transcode(String),

    /// Removing a stored binary failed. Logged and swallowed by the delete path.
    #[error("Storage delete error: {0}")]
    StorageDelete(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Human-readable (Arabic) name of a field that violated a unique index.
pub fn duplicate_field_label(field: &str) -> &'static str {
    match field {
        "slug" => "الرابط",
        "email" => "البريد الإلكتروني",
        _ => "القيمة",
    }
}

/// Helper conversion from anyhow::Error
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<mongodb::error::Error> for AppError {
    fn from(err: mongodb::error::Error) -> Self {
        crate::db::repository::map_mongo_error(err)
    }
}
