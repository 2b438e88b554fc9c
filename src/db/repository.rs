use std::sync::LazyLock;

use async_trait::async_trait;
use bson::{doc, Document};
use futures::TryStreamExt;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{FindOptions, IndexOptions};
use mongodb::{Collection, Database, IndexModel};
use regex::Regex;

use crate::db::models::Entity;
use crate::db::query::{Filter, Sort};
use crate::error::AppError;

/// Storage interface for one entity type.
///
/// Abstracted as a trait so handlers can run against MongoDB or an in-memory
/// store. Writes are single-document and atomic; uniqueness is enforced by
/// the backend and surfaces as [`AppError::DuplicateKey`].
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Insert a new document.
    async fn create(&self, doc: &T) -> Result<(), AppError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<T>, AppError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<T>, AppError>;

    /// First document matching `filter`, if any.
    async fn find_one(&self, filter: &Filter) -> Result<Option<T>, AppError>;

    async fn find_many(
        &self,
        filter: &Filter,
        sort: &Sort,
        limit: Option<i64>,
    ) -> Result<Vec<T>, AppError>;

    /// Replace the stored document with the same id.
    ///
    /// Returns `None` when no such document exists.
    async fn update_by_id(&self, id: &str, doc: &T) -> Result<Option<T>, AppError>;

    /// Remove a document, returning it if it existed.
    async fn delete_by_id(&self, id: &str) -> Result<Option<T>, AppError>;

    async fn count(&self, filter: &Filter) -> Result<u64, AppError>;
}

/// MongoDB implementation of [`Repository`].
pub struct MongoRepository<T: Entity> {
    collection: Collection<T>,
}

impl<T: Entity> MongoRepository<T> {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(T::COLLECTION),
        }
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for MongoRepository<T> {
    async fn create(&self, doc: &T) -> Result<(), AppError> {
        self.collection.insert_one(doc).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<T>, AppError> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<T>, AppError> {
        Ok(self.collection.find_one(doc! { "slug": slug }).await?)
    }

    async fn find_one(&self, filter: &Filter) -> Result<Option<T>, AppError> {
        Ok(self.collection.find_one(filter.to_document()?).await?)
    }

    async fn find_many(
        &self,
        filter: &Filter,
        sort: &Sort,
        limit: Option<i64>,
    ) -> Result<Vec<T>, AppError> {
        let mut options = FindOptions::builder().sort(sort.to_document()).build();
        options.limit = limit.filter(|l| *l > 0);

        let mut cursor = self
            .collection
            .find(filter.to_document()?)
            .with_options(options)
            .await?;

        let mut documents = Vec::new();
        while let Some(doc) = cursor.try_next().await? {
            documents.push(doc);
        }

        Ok(documents)
    }

    async fn update_by_id(&self, id: &str, doc: &T) -> Result<Option<T>, AppError> {
        let result = self.collection.replace_one(doc! { "_id": id }, doc).await?;
        if result.matched_count == 0 {
            return Ok(None);
        }
        Ok(Some(doc.clone()))
    }

    async fn delete_by_id(&self, id: &str) -> Result<Option<T>, AppError> {
        Ok(self.collection.find_one_and_delete(doc! { "_id": id }).await?)
    }

    async fn count(&self, filter: &Filter) -> Result<u64, AppError> {
        Ok(self.collection.count_documents(filter.to_document()?).await?)
    }
}

/// Create the unique indexes declared by `T`.
pub async fn ensure_indexes<T: Entity>(db: &Database) -> Result<(), AppError> {
    let collection = db.collection::<T>(T::COLLECTION);
    for field in T::UNIQUE_FIELDS {
        let mut keys = Document::new();
        keys.insert(*field, 1);
        let model = IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().unique(true).build())
            .build();
        collection.create_index(model).await?;
        tracing::debug!(collection = T::COLLECTION, field = *field, "Ensured unique index");
    }
    Ok(())
}

const DUPLICATE_KEY_CODE: i32 = 11000;

static INDEX_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"index: ([A-Za-z0-9_.]+?)_-?1\b").expect("valid index name regex")
});

/// Extract the first indexed field from an E11000 message such as
/// `E11000 duplicate key error collection: cms.blogs index: slug_1 dup key: ...`.
pub fn duplicate_field_from_message(message: &str) -> Option<String> {
    INDEX_NAME
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Classify a driver error. Duplicate-key violations become
/// [`AppError::DuplicateKey`]; everything else is a database error.
pub fn map_mongo_error(err: mongodb::error::Error) -> AppError {
    let duplicate = match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE =>
        {
            Some(write_error.message.clone())
        }
        ErrorKind::Command(command_error) if command_error.code == DUPLICATE_KEY_CODE => {
            Some(command_error.message.clone())
        }
        _ => None,
    };

    match duplicate {
        Some(message) => AppError::DuplicateKey {
            field: duplicate_field_from_message(&message).unwrap_or_default(),
        },
        None => AppError::Database(err.to_string()),
    }
}
