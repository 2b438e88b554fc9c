//! Backend-neutral filters and sort orders.
//!
//! The same [`Filter`] renders to a MongoDB query document and evaluates
//! directly against serialized entities for the in-memory repository.

use std::cmp::Ordering;

use bson::{Bson, Document};
use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field equals the value. On array fields, any element may match.
    Eq { field: String, value: Value },
    /// Case-insensitive substring match on a string field.
    Contains { field: String, needle: String },
}

/// Conjunction of conditions, plus an optional disjunction group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    all: Vec<Condition>,
    any: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.all.push(Condition::Eq {
            field: field.to_string(),
            value,
        });
        self
    }

    /// Add an equality condition only when `value` is present.
    pub fn eq_opt<V: Serialize>(self, field: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.eq(field, value),
            None => self,
        }
    }

    pub fn contains(mut self, field: &str, needle: &str) -> Self {
        self.all.push(Condition::Contains {
            field: field.to_string(),
            needle: needle.to_string(),
        });
        self
    }

    /// Match when any of `fields` contains `needle`.
    pub fn any_contains(mut self, fields: &[&str], needle: &str) -> Self {
        self.any.extend(fields.iter().map(|field| Condition::Contains {
            field: field.to_string(),
            needle: needle.to_string(),
        }));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty() && self.any.is_empty()
    }

    pub fn to_document(&self) -> Result<Document, AppError> {
        let mut document = Document::new();
        for condition in &self.all {
            let (field, value) = condition_to_bson(condition)?;
            document.insert(field, value);
        }
        if !self.any.is_empty() {
            let branches = self
                .any
                .iter()
                .map(|condition| {
                    let (field, value) = condition_to_bson(condition)?;
                    let mut branch = Document::new();
                    branch.insert(field, value);
                    Ok(Bson::Document(branch))
                })
                .collect::<Result<Vec<_>, AppError>>()?;
            document.insert("$or", branches);
        }
        Ok(document)
    }

    /// Evaluate the filter against a serialized entity.
    pub fn matches(&self, entity: &Value) -> bool {
        let all = self.all.iter().all(|c| condition_matches(c, entity));
        let any = self.any.is_empty() || self.any.iter().any(|c| condition_matches(c, entity));
        all && any
    }
}

fn condition_to_bson(condition: &Condition) -> Result<(String, Bson), AppError> {
    match condition {
        Condition::Eq { field, value } => {
            let value = bson::to_bson(value).map_err(|e| AppError::Database(e.to_string()))?;
            Ok((field.clone(), value))
        }
        Condition::Contains { field, needle } => {
            let mut pattern = Document::new();
            pattern.insert("$regex", regex::escape(needle));
            pattern.insert("$options", "i");
            Ok((field.clone(), Bson::Document(pattern)))
        }
    }
}

/// Resolve a dotted path like `relatedTo.type`.
fn lookup<'a>(entity: &'a Value, path: &str) -> &'a Value {
    path.split('.')
        .try_fold(entity, |current, segment| current.get(segment))
        .unwrap_or(&Value::Null)
}

fn condition_matches(condition: &Condition, entity: &Value) -> bool {
    match condition {
        Condition::Eq { field, value } => match lookup(entity, field) {
            Value::Array(items) if !value.is_array() => items.contains(value),
            found => found == value,
        },
        Condition::Contains { field, needle } => {
            let needle = needle.to_lowercase();
            let contains = |v: &Value| {
                v.as_str()
                    .is_some_and(|s| s.to_lowercase().contains(&needle))
            };
            match lookup(entity, field) {
                Value::Array(items) => items.iter().any(contains),
                found => contains(found),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Ordered list of sort keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sort {
    keys: Vec<(String, Direction)>,
}

impl Sort {
    pub fn asc(field: &str) -> Self {
        Self::default().then_asc(field)
    }

    pub fn desc(field: &str) -> Self {
        Self::default().then_desc(field)
    }

    pub fn then_asc(mut self, field: &str) -> Self {
        self.keys.push((field.to_string(), Direction::Asc));
        self
    }

    pub fn then_desc(mut self, field: &str) -> Self {
        self.keys.push((field.to_string(), Direction::Desc));
        self
    }

    pub fn to_document(&self) -> Document {
        let mut document = Document::new();
        for (field, direction) in &self.keys {
            let order = match direction {
                Direction::Asc => 1,
                Direction::Desc => -1,
            };
            document.insert(field.clone(), order);
        }
        document
    }

    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        for (field, direction) in &self.keys {
            let ordering = compare_values(lookup(a, field), lookup(b, field));
            let ordering = match direction {
                Direction::Asc => ordering,
                Direction::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

/// Type rank follows MongoDB's comparison order for the types in use.
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or_default();
            let y = y.as_f64().unwrap_or_default();
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use serde_json::json;

    #[test]
    fn test_filter_to_document() {
        let filter = Filter::new().eq("status", "published").eq("featured", true);
        let document = filter.to_document().unwrap();
        assert_eq!(document, doc! { "status": "published", "featured": true });
    }

    #[test]
    fn test_contains_escapes_regex() {
        let filter = Filter::new().contains("mimetype", "image/svg+xml");
        let document = filter.to_document().unwrap();
        let condition = document.get_document("mimetype").unwrap();
        assert_eq!(condition.get_str("$regex").unwrap(), r"image/svg\+xml");
        assert_eq!(condition.get_str("$options").unwrap(), "i");
    }

    #[test]
    fn test_any_contains_renders_or() {
        let filter = Filter::new().any_contains(&["title", "excerpt"], "عزل");
        let document = filter.to_document().unwrap();
        assert_eq!(document.get_array("$or").unwrap().len(), 2);
    }

    #[test]
    fn test_matches_nested_and_arrays() {
        let entity = json!({
            "mimetype": "image/WEBP",
            "tags": ["roof", "heat"],
            "relatedTo": { "type": "blog", "id": "b1" }
        });

        assert!(Filter::new().contains("mimetype", "webp").matches(&entity));
        assert!(Filter::new().eq("relatedTo.type", "blog").matches(&entity));
        assert!(Filter::new().eq("tags", "heat").matches(&entity));
        assert!(!Filter::new().eq("relatedTo.id", "b2").matches(&entity));
        assert!(!Filter::new().eq("missing", "x").matches(&entity));
        assert!(Filter::new().matches(&entity));
    }

    #[test]
    fn test_any_group_requires_one_match() {
        let entity = json!({ "title": "Roof", "excerpt": "Waterproofing" });
        let filter = Filter::new().any_contains(&["title", "excerpt"], "water");
        assert!(filter.matches(&entity));
        let filter = Filter::new().any_contains(&["title", "excerpt"], "solar");
        assert!(!filter.matches(&entity));
    }

    #[test]
    fn test_sort_compare_multiple_keys() {
        let sort = Sort::asc("order").then_desc("createdAt");
        let a = json!({ "order": 1, "createdAt": "2024-01-02T00:00:00Z" });
        let b = json!({ "order": 1, "createdAt": "2024-01-01T00:00:00Z" });
        let c = json!({ "order": 0, "createdAt": "2023-01-01T00:00:00Z" });

        let mut items = vec![b.clone(), a.clone(), c.clone()];
        items.sort_by(|x, y| sort.compare(x, y));
        assert_eq!(items, vec![c, a, b]);
        assert_eq!(sort.to_document(), doc! { "order": 1, "createdAt": -1 });
    }

    #[test]
    fn test_null_sorts_first() {
        let sort = Sort::asc("publishedAt");
        let unset = json!({ "publishedAt": null });
        let set = json!({ "publishedAt": "2024-01-01T00:00:00Z" });
        assert_eq!(sort.compare(&unset, &set), Ordering::Less);
    }
}
