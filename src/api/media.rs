use axum::extract::{Multipart, Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::api::resource::process_mutate;
use crate::api::response::ApiResponse;
use crate::app::AppState;
use crate::auth::middleware::AuthUser;
use crate::db::models::{Entity, Media, RelatedTo};
use crate::db::query::{Filter, Sort};
use crate::error::AppError;
use crate::media::pipeline::{UploadMetadata, UploadedFile};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaListQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub related_type: Option<String>,
    pub related_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AltRequest {
    #[serde(default)]
    pub alt: String,
}

/// A file of a multi-file upload that could not be ingested.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedUpload {
    pub original_name: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct BatchUploadResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<Media>,
    pub failed: Vec<FailedUpload>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_media))
        .route("/upload", post(upload_single))
        .route("/upload-multiple", post(upload_multiple))
        .route("/file/{*key}", get(serve_file))
        .route("/{id}", patch(update_alt).delete(delete_media))
}

/// `GET /api/media`, newest first.
pub async fn list_media(
    State(state): State<AppState>,
    Query(query): Query<MediaListQuery>,
) -> Result<Json<ApiResponse<Vec<Media>>>, AppError> {
    let mut filter = Filter::new()
        .eq_opt("relatedTo.type", query.related_type.as_deref())
        .eq_opt("relatedTo.id", query.related_id.as_deref());
    if let Some(kind) = query.kind.as_deref().filter(|k| !k.is_empty()) {
        filter = filter.contains("mimetype", kind);
    }

    let media = state
        .media
        .find_many(&filter, &Sort::desc("createdAt"), None)
        .await?;
    Ok(Json(ApiResponse::list(media)))
}

/// Files and metadata collected from a multipart body.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub files: Vec<UploadedFile>,
    pub metadata: UploadMetadata,
}

/// Read every part of a multipart upload. File parts are taken from
/// `file_field`; `alt` and `relatedTo` are text parts.
pub async fn read_upload_form(
    mut multipart: Multipart,
    file_field: &str,
) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Multipart error: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "alt" => {
                form.metadata.alt = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read alt: {e}")))?;
            }
            "relatedTo" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read relatedTo: {e}")))?;
                form.metadata.related_to = parse_related_to(&text)?;
            }
            _ if name == file_field => {
                let original_name = field.file_name().unwrap_or("upload.bin").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::UploadRejected(format!("Failed to read file: {e}")))?;
                form.files.push(UploadedFile {
                    original_name,
                    content_type,
                    data: data.to_vec(),
                });
            }
            _ => {}
        }
    }

    Ok(form)
}

/// `relatedTo` arrives as JSON text; blank means unattached.
pub fn parse_related_to(text: &str) -> Result<Option<RelatedTo>, AppError> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(text)
        .map(Some)
        .map_err(|e| AppError::BadRequest(format!("relatedTo غير صالح: {e}")))
}

/// `POST /api/media/upload`
pub async fn upload_single(
    _user: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<Media>>), AppError> {
    let form = read_upload_form(multipart, "file").await?;
    let file = form
        .files
        .into_iter()
        .next()
        .ok_or_else(|| AppError::UploadRejected("لم يتم رفع أي ملف".into()))?;

    let media = state.media_pipeline.ingest(file, &form.metadata).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::data(media))))
}

/// `POST /api/media/upload-multiple`
///
/// Responds 201 when at least one file was stored; failed files are listed
/// in `failed`. When every file fails the first error is returned.
pub async fn upload_multiple(
    _user: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<BatchUploadResponse>), AppError> {
    let form = read_upload_form(multipart, "files").await?;
    let items = state
        .media_pipeline
        .ingest_batch(form.files, &form.metadata)
        .await?;

    let mut data = Vec::new();
    let mut failed = Vec::new();
    let mut first_error = None;
    for item in items {
        match item.result {
            Ok(media) => data.push(media),
            Err(e) => {
                failed.push(FailedUpload {
                    original_name: item.original_name,
                    message: e.to_string(),
                });
                first_error.get_or_insert(e);
            }
        }
    }

    if data.is_empty() {
        if let Some(e) = first_error {
            return Err(e);
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(BatchUploadResponse {
            success: true,
            count: data.len(),
            data,
            failed,
        }),
    ))
}

/// `PATCH /api/media/{id}` updates the alt text only.
pub async fn update_alt(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<AltRequest>,
) -> Result<Json<ApiResponse<Media>>, AppError> {
    let media = process_mutate(state.media.as_ref(), &id, move |media: &mut Media| {
        media.alt = request.alt;
        Ok(())
    })
    .await?;
    Ok(Json(ApiResponse::data(media)))
}

pub async fn delete_media(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    state.media_pipeline.delete(&id).await?;
    Ok(Json(ApiResponse::message("تم حذف الملف بنجاح")))
}

/// Content type inferred from a storage key's extension.
pub fn content_type_for(key: &str) -> &'static str {
    let extension = key
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "webp" => "image/webp",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}

/// `GET /api/media/file/{*key}` streams a stored binary.
pub async fn serve_file(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    let data = state
        .media_pipeline
        .storage()
        .get_object(&key)
        .await?
        .ok_or_else(|| AppError::NotFound(Media::NOT_FOUND.into()))?;

    Ok(([(CONTENT_TYPE, content_type_for(&key))], data).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("media/1-abc.webp"), "image/webp");
        assert_eq!(content_type_for("media/photo.JPEG"), "image/jpeg");
        assert_eq!(content_type_for("media/file"), "application/octet-stream");
    }

    #[test]
    fn test_parse_related_to() {
        assert_eq!(parse_related_to("").unwrap(), None);
        assert_eq!(
            parse_related_to(r#"{"type":"service","id":"s1"}"#).unwrap(),
            Some(RelatedTo::Service { id: "s1".into() })
        );
        assert!(parse_related_to("{not json").is_err());
    }
}
