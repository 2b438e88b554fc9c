//! Pre-persist lifecycle hooks.
//!
//! Each document type exposes an ordered list of pure transforms that run on
//! the draft right before it is written. Hooks only fill in derived fields;
//! they never reject a write.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::content::slug::derive_slug;

/// Reading speed used for the read-time estimate.
pub const WORDS_PER_MINUTE: usize = 200;

/// A single pre-persist transform.
pub type Hook<T> = fn(&mut T, &Changes, DateTime<Utc>);

/// Top-level (serialized) field names modified by the current write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changes {
    fields: BTreeSet<String>,
}

impl Changes {
    /// Compute the modified fields of `next` relative to `previous`.
    ///
    /// On insert (`previous == None`) every field carrying a non-empty value
    /// counts as modified. On update a field is modified when its serialized
    /// value differs from the stored one.
    pub fn between<T: Serialize>(previous: Option<&T>, next: &T) -> Self {
        let next = to_object(next);
        let previous = previous.map(to_object);

        let fields = next
            .iter()
            .filter(|(key, value)| match &previous {
                None => !is_empty_value(value),
                Some(prev) => prev.get(key.as_str()).unwrap_or(&Value::Null) != *value,
            })
            .map(|(key, _)| key.clone())
            .collect();

        Self { fields }
    }

    /// Build a change set from explicit field names.
    pub fn of<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn to_object<T: Serialize>(value: &T) -> serde_json::Map<String, Value> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Document types that derive fields before being persisted.
pub trait Lifecycle: Serialize + Sized + 'static {
    /// Ordered hook chain; applied front to back.
    fn hooks() -> &'static [Hook<Self>];
}

/// Run the hook chain of `T` against a draft.
pub fn apply_hooks<T: Lifecycle>(previous: Option<&T>, draft: &mut T, now: DateTime<Utc>) {
    let changes = Changes::between(previous, draft);
    for hook in T::hooks() {
        hook(draft, &changes, now);
    }
}

/// Rule 1: derive the slug from `source` when the source field changed, the
/// slug was not set in the same write and no slug exists yet.
pub fn derive_slug_if_absent(
    slug: &mut String,
    source: &str,
    source_field: &str,
    changes: &Changes,
) {
    if changes.contains(source_field) && !changes.contains("slug") && slug.trim().is_empty() {
        *slug = derive_slug(source);
    }
}

/// Rule 2: reading-time estimate for a body of text.
///
/// Words are whitespace-separated runs; Arabic text is not segmented further.
pub fn estimate_read_time(content: &str) -> String {
    let words = content.split_whitespace().count();
    let minutes = words.div_ceil(WORDS_PER_MINUTE).max(1);
    format!("{minutes} دقائق")
}

/// Rule 3: stamp the first publication time. An existing timestamp is kept.
pub fn stamp_published_at(
    published_at: &mut Option<DateTime<Utc>>,
    is_published: bool,
    changes: &Changes,
    now: DateTime<Utc>,
) {
    if changes.contains("status") && is_published && published_at.is_none() {
        *published_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Debug, Clone, Serialize)]
    struct Draft {
        title: String,
        slug: String,
        tags: Vec<String>,
        order: i64,
    }

    fn draft(title: &str, slug: &str) -> Draft {
        Draft {
            title: title.to_string(),
            slug: slug.to_string(),
            tags: vec![],
            order: 0,
        }
    }

    #[test]
    fn test_changes_on_insert_skip_empty_fields() {
        let changes = Changes::between(None, &draft("Hello", ""));
        assert!(changes.contains("title"));
        assert!(!changes.contains("slug"));
        assert!(!changes.contains("tags"));
        assert!(changes.contains("order"));
    }

    #[test]
    fn test_changes_on_update_only_differences() {
        let before = draft("Hello", "hello");
        let mut after = before.clone();
        after.title = "Hello again".to_string();

        let changes = Changes::between(Some(&before), &after);
        assert!(changes.contains("title"));
        assert!(!changes.contains("slug"));
        assert!(!changes.contains("order"));
    }

    #[test]
    fn test_slug_derived_when_absent() {
        let mut slug = String::new();
        derive_slug_if_absent(&mut slug, "دليل العزل الحراري", "title", &Changes::of(["title"]));
        assert_eq!(slug, "دليل-العزل-الحراري");
    }

    #[test]
    fn test_explicit_slug_is_never_overwritten() {
        let mut slug = "custom".to_string();
        derive_slug_if_absent(&mut slug, "New Title", "title", &Changes::of(["title"]));
        assert_eq!(slug, "custom");

        let mut slug = String::new();
        derive_slug_if_absent(&mut slug, "New Title", "title", &Changes::of(["title", "slug"]));
        assert_eq!(slug, "");
    }

    #[test]
    fn test_slug_not_derived_without_title_change() {
        let mut slug = String::new();
        derive_slug_if_absent(&mut slug, "Title", "title", &Changes::of(["content"]));
        assert!(slug.is_empty());
    }

    #[test]
    fn test_read_time_rounds_up() {
        let four_hundred = vec!["كلمة"; 400].join(" ");
        assert_eq!(estimate_read_time(&four_hundred), "2 دقائق");

        let four_hundred_one = vec!["word"; 401].join(" ");
        assert_eq!(estimate_read_time(&four_hundred_one), "3 دقائق");

        assert_eq!(estimate_read_time("one"), "1 دقائق");
    }

    #[test]
    fn test_read_time_splits_on_whitespace_runs() {
        let content = "  alpha \n\n beta\t\tgamma  ";
        assert_eq!(estimate_read_time(content), "1 دقائق");
        assert_eq!(estimate_read_time(""), "1 دقائق");
    }

    #[test]
    fn test_published_at_set_once() {
        let first = Utc::now();
        let mut published_at = None;
        stamp_published_at(&mut published_at, true, &Changes::of(["status"]), first);
        assert_eq!(published_at, Some(first));

        let later = first + chrono::Duration::hours(1);
        stamp_published_at(&mut published_at, true, &Changes::of(["status"]), later);
        assert_eq!(published_at, Some(first));
    }

    #[test]
    fn test_published_at_untouched_for_drafts() {
        let mut published_at = None;
        stamp_published_at(&mut published_at, false, &Changes::of(["status"]), Utc::now());
        assert!(published_at.is_none());
    }
}
