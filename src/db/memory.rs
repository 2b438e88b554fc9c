use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::db::models::Entity;
use crate::db::query::{Filter, Sort};
use crate::db::repository::Repository;
use crate::error::AppError;

/// In-memory [`Repository`] used by tests and by local runs without MongoDB.
///
/// Enforces the same unique fields as the MongoDB indexes.
pub struct InMemoryRepository<T: Entity> {
    documents: Mutex<Vec<T>>,
}

impl<T: Entity> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> InMemoryRepository<T> {
    pub fn new() -> Self {
        Self {
            documents: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<T>>, AppError> {
        self.documents
            .lock()
            .map_err(|_| AppError::Database("in-memory store poisoned".into()))
    }
}

fn to_value<T: Entity>(doc: &T) -> Result<Value, AppError> {
    serde_json::to_value(doc).map_err(|e| AppError::Database(e.to_string()))
}

/// Reject `candidate` if another stored document shares a unique field value.
fn check_unique<T: Entity>(documents: &[T], candidate: &T) -> Result<(), AppError> {
    let candidate_value = to_value(candidate)?;
    for other in documents.iter().filter(|d| d.id() != candidate.id()) {
        let other_value = to_value(other)?;
        for field in T::UNIQUE_FIELDS {
            let mine = candidate_value.get(*field).unwrap_or(&Value::Null);
            let theirs = other_value.get(*field).unwrap_or(&Value::Null);
            if mine == theirs {
                return Err(AppError::DuplicateKey {
                    field: field.to_string(),
                });
            }
        }
    }
    Ok(())
}

#[async_trait]
impl<T: Entity> Repository<T> for InMemoryRepository<T> {
    async fn create(&self, doc: &T) -> Result<(), AppError> {
        let mut documents = self.lock()?;
        if documents.iter().any(|d| d.id() == doc.id()) {
            return Err(AppError::DuplicateKey {
                field: "_id".to_string(),
            });
        }
        check_unique(&documents, doc)?;
        documents.push(doc.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<T>, AppError> {
        let documents = self.lock()?;
        Ok(documents.iter().find(|d| d.id() == id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<T>, AppError> {
        self.find_one(&Filter::new().eq("slug", slug)).await
    }

    async fn find_one(&self, filter: &Filter) -> Result<Option<T>, AppError> {
        let documents = self.lock()?;
        for doc in documents.iter() {
            if filter.matches(&to_value(doc)?) {
                return Ok(Some(doc.clone()));
            }
        }
        Ok(None)
    }

    async fn find_many(
        &self,
        filter: &Filter,
        sort: &Sort,
        limit: Option<i64>,
    ) -> Result<Vec<T>, AppError> {
        let mut matched = {
            let documents = self.lock()?;
            let mut matched = Vec::new();
            for doc in documents.iter() {
                let value = to_value(doc)?;
                if filter.matches(&value) {
                    matched.push((value, doc.clone()));
                }
            }
            matched
        };

        matched.sort_by(|(a, _), (b, _)| sort.compare(a, b));

        // Zero and negative limits mean no limit.
        let limit = limit
            .filter(|l| *l > 0)
            .map(|l| l as usize)
            .unwrap_or(usize::MAX);

        Ok(matched.into_iter().take(limit).map(|(_, doc)| doc).collect())
    }

    async fn update_by_id(&self, id: &str, doc: &T) -> Result<Option<T>, AppError> {
        let mut documents = self.lock()?;
        let Some(position) = documents.iter().position(|d| d.id() == id) else {
            return Ok(None);
        };
        check_unique(&documents, doc)?;
        documents[position] = doc.clone();
        Ok(Some(doc.clone()))
    }

    async fn delete_by_id(&self, id: &str) -> Result<Option<T>, AppError> {
        let mut documents = self.lock()?;
        let position = documents.iter().position(|d| d.id() == id);
        Ok(position.map(|p| documents.remove(p)))
    }

    async fn count(&self, filter: &Filter) -> Result<u64, AppError> {
        let documents = self.lock()?;
        let mut count = 0;
        for doc in documents.iter() {
            if filter.matches(&to_value(doc)?) {
                count += 1;
            }
        }
        Ok(count)
    }
}
