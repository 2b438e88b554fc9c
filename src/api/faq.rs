//! FAQ categories and their embedded questions. All writes require the admin
//! role.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;

use crate::api::resource::{
    find_by_id_or_404, merge_shallow, process_create, process_delete, process_mutate,
    process_reorder, process_update, ReorderRequest,
};
use crate::api::response::ApiResponse;
use crate::app::AppState;
use crate::auth::middleware::AdminUser;
use crate::db::models::{new_id, FaqCategory, FaqQuestion};
use crate::db::query::{Filter, Sort};
use crate::error::AppError;

#[derive(Debug, Default, Deserialize)]
pub struct FaqListQuery {
    pub active: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_faq).post(create_faq))
        .route("/reorder", put(reorder_faq))
        .route("/{id}", get(get_faq).put(update_faq).delete(delete_faq))
        .route("/{id}/toggle", patch(toggle_faq))
        .route("/{id}/questions", post(add_question))
        .route(
            "/{id}/questions/{question_id}",
            put(update_question).delete(delete_question),
        )
        .route("/{id}/questions/{question_id}/toggle", patch(toggle_question))
}

/// `GET /api/faq`. With `active=true`, inactive categories and inactive
/// questions are both hidden.
pub async fn list_faq(
    State(state): State<AppState>,
    Query(query): Query<FaqListQuery>,
) -> Result<Json<ApiResponse<Vec<FaqCategory>>>, AppError> {
    let active_only = query.active.as_deref() == Some("true");
    let filter = if active_only {
        Filter::new().eq("isActive", true)
    } else {
        Filter::new()
    };

    let mut categories = state.faqs.find_many(&filter, &Sort::asc("order"), None).await?;
    if active_only {
        categories.iter_mut().for_each(FaqCategory::retain_active_questions);
    }
    Ok(Json(ApiResponse::list(categories)))
}

pub async fn get_faq(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<FaqCategory>>, AppError> {
    let category = find_by_id_or_404(state.faqs.as_ref(), &id).await?;
    Ok(Json(ApiResponse::data(category)))
}

pub async fn create_faq(
    _admin: AdminUser,
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<ApiResponse<FaqCategory>>), AppError> {
    let category = process_create(state.faqs.as_ref(), payload).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::data(category))))
}

pub async fn update_faq(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> Result<Json<ApiResponse<FaqCategory>>, AppError> {
    let category = process_update(state.faqs.as_ref(), &id, patch).await?;
    Ok(Json(ApiResponse::data(category)))
}

pub async fn delete_faq(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    process_delete(state.faqs.as_ref(), &id).await?;
    Ok(Json(ApiResponse::message("تم حذف القسم بنجاح")))
}

pub async fn toggle_faq(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<FaqCategory>>, AppError> {
    let category = process_mutate(state.faqs.as_ref(), &id, |faq: &mut FaqCategory| {
        faq.is_active = !faq.is_active;
        Ok(())
    })
    .await?;
    Ok(Json(ApiResponse::data(category)))
}

pub async fn reorder_faq(
    _admin: AdminUser,
    State(state): State<AppState>,
    Json(request): Json<ReorderRequest>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    process_reorder(state.faqs.as_ref(), &request.ordered_ids).await?;
    Ok(Json(ApiResponse::message("تم إعادة ترتيب الأقسام")))
}

fn parse_question(value: Value) -> Result<FaqQuestion, AppError> {
    serde_json::from_value(value).map_err(|e| AppError::Validation(format!("بيانات غير صالحة: {e}")))
}

/// Apply a JSON patch to one question, keeping its id.
pub fn patch_question(question: &mut FaqQuestion, patch: Value) -> Result<(), AppError> {
    let Value::Object(mut patch) = patch else {
        return Err(AppError::BadRequest("بيانات غير صالحة".into()));
    };
    patch.remove("_id");

    let mut stored = match serde_json::to_value(&*question) {
        Ok(Value::Object(map)) => map,
        _ => return Err(AppError::Internal("question did not serialize to an object".into())),
    };
    merge_shallow(&mut stored, patch);
    *question = parse_question(Value::Object(stored))?;
    Ok(())
}

/// `POST /api/faq/{id}/questions`
pub async fn add_question(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<ApiResponse<FaqCategory>>), AppError> {
    let mut question = parse_question(payload)?;
    question.id = new_id();

    let category = process_mutate(state.faqs.as_ref(), &id, move |faq: &mut FaqCategory| {
        faq.questions.push(question);
        Ok(())
    })
    .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::data(category))))
}

pub async fn update_question(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path((id, question_id)): Path<(String, String)>,
    Json(patch): Json<Value>,
) -> Result<Json<ApiResponse<FaqCategory>>, AppError> {
    let category = process_mutate(state.faqs.as_ref(), &id, |faq: &mut FaqCategory| {
        patch_question(faq.question_mut(&question_id)?, patch)
    })
    .await?;
    Ok(Json(ApiResponse::data(category)))
}

/// Removing an unknown question id leaves the category unchanged.
pub async fn delete_question(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path((id, question_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<FaqCategory>>, AppError> {
    let category = process_mutate(state.faqs.as_ref(), &id, |faq: &mut FaqCategory| {
        faq.questions.retain(|q| q.id != question_id);
        Ok(())
    })
    .await?;
    Ok(Json(ApiResponse::data(category)))
}

pub async fn toggle_question(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path((id, question_id)): Path<(String, String)>,
) -> Result<Json<ApiResponse<FaqCategory>>, AppError> {
    let category = process_mutate(state.faqs.as_ref(), &id, |faq: &mut FaqCategory| {
        let question = faq.question_mut(&question_id)?;
        question.is_active = !question.is_active;
        Ok(())
    })
    .await?;
    Ok(Json(ApiResponse::data(category)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_patch_question_keeps_id() {
        let mut question = parse_question(json!({
            "_id": "q1",
            "question": "قديم",
            "answer": "جواب",
            "order": 2
        }))
        .unwrap();

        patch_question(&mut question, json!({ "_id": "other", "question": "جديد" })).unwrap();
        assert_eq!(question.id, "q1");
        assert_eq!(question.question, "جديد");
        assert_eq!(question.answer, "جواب");
        assert_eq!(question.order, 2);
    }

    #[test]
    fn test_patch_question_rejects_non_object() {
        let mut question = parse_question(json!({ "question": "q", "answer": "a" })).unwrap();
        assert!(patch_question(&mut question, json!("text")).is_err());
    }
}
