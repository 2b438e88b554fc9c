//! Generic create/read/update/delete/reorder over any [`Entity`].
//!
//! Every write goes through the same steps: build the next version, run the
//! entity's hook chain against the previous version, validate, then issue a
//! single storage call.

use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::content::hooks::apply_hooks;
use crate::db::models::{new_id, Entity, Ordered};
use crate::db::repository::Repository;
use crate::error::AppError;

/// Fields a caller can never set directly.
const PROTECTED_FIELDS: &[&str] = &["_id", "createdAt", "updatedAt"];

/// `{ "orderedIds": [...] }`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    #[serde(default)]
    pub ordered_ids: Vec<String>,
}

pub fn not_found<T: Entity>() -> AppError {
    AppError::NotFound(T::NOT_FOUND.into())
}

fn parse_entity<T: Entity>(value: Value) -> Result<T, AppError> {
    serde_json::from_value(value).map_err(|e| AppError::Validation(format!("بيانات غير صالحة: {e}")))
}

fn payload_object(payload: Value) -> Result<Map<String, Value>, AppError> {
    match payload {
        Value::Object(mut map) => {
            for field in PROTECTED_FIELDS {
                map.remove(*field);
            }
            Ok(map)
        }
        _ => Err(AppError::BadRequest("بيانات غير صالحة".into())),
    }
}

/// Shallow merge: top-level keys of `patch` replace stored ones, `null`
/// resets a field to its default.
pub fn merge_shallow(stored: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, value) in patch {
        if value.is_null() {
            stored.remove(&key);
        } else {
            stored.insert(key, value);
        }
    }
}

pub async fn find_by_id_or_404<T: Entity>(repo: &dyn Repository<T>, id: &str) -> Result<T, AppError> {
    repo.find_by_id(id).await?.ok_or_else(not_found::<T>)
}

pub async fn find_by_slug_or_404<T: Entity>(
    repo: &dyn Repository<T>,
    slug: &str,
) -> Result<T, AppError> {
    repo.find_by_slug(slug).await?.ok_or_else(not_found::<T>)
}

/// Insert a new document built from a JSON payload.
pub async fn process_create<T: Entity>(
    repo: &dyn Repository<T>,
    payload: Value,
) -> Result<T, AppError> {
    let now = Utc::now();
    let mut draft: T = parse_entity(Value::Object(payload_object(payload)?))?;
    draft.assign_identity(new_id(), now);

    apply_hooks(None, &mut draft, now);
    draft.validate()?;

    repo.create(&draft).await?;
    tracing::info!(collection = T::COLLECTION, id = %draft.id(), "Document created");
    Ok(draft)
}

/// Merge a JSON patch over the stored document and replace it.
pub async fn process_update<T: Entity>(
    repo: &dyn Repository<T>,
    id: &str,
    patch: Value,
) -> Result<T, AppError> {
    let patch = payload_object(patch)?;
    let existing = find_by_id_or_404(repo, id).await?;

    let mut merged = match serde_json::to_value(&existing) {
        Ok(Value::Object(map)) => map,
        Ok(_) => return Err(AppError::Internal("entity did not serialize to an object".into())),
        Err(e) => return Err(AppError::Internal(e.to_string())),
    };
    merge_shallow(&mut merged, patch);

    let next: T = parse_entity(Value::Object(merged))?;
    replace_with_hooks(repo, existing, next).await
}

/// Load, change in place, and replace.
pub async fn process_mutate<T, F>(repo: &dyn Repository<T>, id: &str, mutate: F) -> Result<T, AppError>
where
    T: Entity,
    F: FnOnce(&mut T) -> Result<(), AppError> + Send,
{
    let existing = find_by_id_or_404(repo, id).await?;
    let mut next = existing.clone();
    mutate(&mut next)?;
    replace_with_hooks(repo, existing, next).await
}

async fn replace_with_hooks<T: Entity>(
    repo: &dyn Repository<T>,
    existing: T,
    mut next: T,
) -> Result<T, AppError> {
    let now = Utc::now();
    next.touch(now);
    apply_hooks(Some(&existing), &mut next, now);
    next.validate()?;

    let updated = repo
        .update_by_id(existing.id(), &next)
        .await?
        .ok_or_else(not_found::<T>)?;
    tracing::info!(collection = T::COLLECTION, id = %updated.id(), "Document updated");
    Ok(updated)
}

pub async fn process_delete<T: Entity>(repo: &dyn Repository<T>, id: &str) -> Result<T, AppError> {
    let deleted = repo.delete_by_id(id).await?.ok_or_else(not_found::<T>)?;
    tracing::info!(collection = T::COLLECTION, id = %id, "Document deleted");
    Ok(deleted)
}

/// Assign `order = index` to each listed id, one write per id.
///
/// Unknown ids are skipped. Writes are not transactional: a failure leaves
/// earlier ids reordered.
pub async fn process_reorder<T: Ordered>(
    repo: &dyn Repository<T>,
    ordered_ids: &[String],
) -> Result<(), AppError> {
    for (index, id) in ordered_ids.iter().enumerate() {
        let Some(existing) = repo.find_by_id(id).await? else {
            tracing::debug!(collection = T::COLLECTION, id = %id, "Skipping unknown id in reorder");
            continue;
        };
        let mut next = existing.clone();
        next.set_order(index as i64);
        replace_with_hooks(repo, existing, next).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::InMemoryRepository;
    use crate::db::models::{Blog, Category, PublishStatus};
    use crate::db::query::{Filter, Sort};
    use serde_json::json;

    fn blog_payload(title: &str) -> Value {
        json!({
            "title": title,
            "excerpt": "ملخص قصير",
            "content": "نص المقال",
            "image": "/img.webp",
            "category": "عزل"
        })
    }

    #[tokio::test]
    async fn test_create_ignores_protected_fields() {
        let repo = InMemoryRepository::<Blog>::new();
        let mut payload = blog_payload("Roof Guide");
        payload["_id"] = json!("chosen-by-client");
        payload["createdAt"] = json!("2000-01-01T00:00:00Z");

        let blog = process_create(&repo, payload).await.unwrap();
        assert_ne!(blog.id, "chosen-by-client");
        assert!(blog.created_at.timestamp() > 946_684_800);
        assert_eq!(blog.slug, "roof-guide");
    }

    #[tokio::test]
    async fn test_create_rejects_non_object() {
        let repo = InMemoryRepository::<Blog>::new();
        let err = process_create(&repo, json!([1, 2])).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_create_validation_failure_not_persisted() {
        let repo = InMemoryRepository::<Blog>::new();
        let err = process_create(&repo, json!({ "title": "Only title" }))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(repo.count(&Filter::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_invalid_enum_is_validation_error() {
        let repo = InMemoryRepository::<Blog>::new();
        let mut payload = blog_payload("x");
        payload["status"] = json!("archived");
        let err = process_create(&repo, payload).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_duplicate_slug_second_create_fails() {
        let repo = InMemoryRepository::<Blog>::new();
        let first = process_create(&repo, blog_payload("دليل العزل الحراري"))
            .await
            .unwrap();
        let err = process_create(&repo, blog_payload("دليل العزل الحراري"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "هذا الرابط موجود مسبقاً");

        let stored = find_by_id_or_404(&repo, &first.id).await.unwrap();
        assert_eq!(stored.slug, "دليل-العزل-الحراري");
    }

    #[tokio::test]
    async fn test_update_merges_and_keeps_identity() {
        let repo = InMemoryRepository::<Blog>::new();
        let created = process_create(&repo, blog_payload("Original")).await.unwrap();

        let updated = process_update(
            &repo,
            &created.id,
            json!({ "title": "Renamed", "_id": "hijack", "content": vec!["w"; 450].join(" ") }),
        )
        .await
        .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.slug, "original");
        assert_eq!(updated.read_time, "3 دقائق");
        assert_eq!(updated.excerpt, created.excerpt);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let repo = InMemoryRepository::<Blog>::new();
        let err = process_update(&repo, "nope", json!({ "title": "x" }))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "المقال غير موجود");
    }

    #[tokio::test]
    async fn test_mutate_runs_hooks() {
        let repo = InMemoryRepository::<Blog>::new();
        let created = process_create(&repo, blog_payload("Publish me")).await.unwrap();

        let published = process_mutate(&repo, &created.id, |blog: &mut Blog| {
            blog.status = blog.status.toggled();
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(published.status, PublishStatus::Published);
        assert!(published.published_at.is_some());
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = InMemoryRepository::<Blog>::new();
        let created = process_create(&repo, blog_payload("Temp")).await.unwrap();
        process_delete(&repo, &created.id).await.unwrap();
        let err = process_delete(&repo, &created.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_reorder_assigns_sequential_order() {
        let repo = InMemoryRepository::<Category>::new();
        let mut ids = Vec::new();
        for name in ["a", "b", "c"] {
            let category = process_create(&repo, json!({ "name": name, "type": "service" }))
                .await
                .unwrap();
            ids.push(category.id);
        }

        let ordered = vec![ids[2].clone(), "unknown".to_string(), ids[0].clone(), ids[1].clone()];
        process_reorder(&repo, &ordered).await.unwrap();

        let sorted = repo
            .find_many(&Filter::new(), &Sort::asc("order"), None)
            .await
            .unwrap();
        let names: Vec<&str> = sorted.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
        assert_eq!(sorted[0].order, 0);
        assert_eq!(sorted[1].order, 2);
        assert_eq!(sorted[2].order, 3);
    }

    #[test]
    fn test_merge_shallow_null_resets() {
        let mut stored = json!({ "a": 1, "b": { "x": 1, "y": 2 } })
            .as_object()
            .unwrap()
            .clone();
        let patch = json!({ "a": null, "b": { "x": 5 } }).as_object().unwrap().clone();
        merge_shallow(&mut stored, patch);
        assert_eq!(Value::Object(stored), json!({ "b": { "x": 5 } }));
    }
}
