//! In-memory reference backend. The demo server and the test suite run against
//! it; real deployments implement [`Collection`]/[`CollectionResolver`] over
//! their own storage.

use crate::error::AppError;
use crate::query::Query;
use crate::schema::CollectionSchema;
use crate::store::{doc_id, Collection, CollectionResolver, Document, FindOptions};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

fn now_value() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn compare_field(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => match (x, y) {
            (Value::Number(n), Value::Number(m)) => n
                .as_f64()
                .partial_cmp(&m.as_f64())
                .unwrap_or(Ordering::Equal),
            (Value::String(s), Value::String(t)) => s.cmp(t),
            (Value::Bool(p), Value::Bool(q)) => p.cmp(q),
            _ => Ordering::Equal,
        },
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub struct MemoryCollection {
    schema: CollectionSchema,
    docs: RwLock<Vec<Document>>,
}

impl MemoryCollection {
    pub fn new(schema: CollectionSchema) -> Self {
        MemoryCollection {
            schema,
            docs: RwLock::new(Vec::new()),
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<Document>>, AppError> {
        self.docs
            .read()
            .map_err(|_| AppError::Store("collection lock poisoned".into()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Vec<Document>>, AppError> {
        self.docs
            .write()
            .map_err(|_| AppError::Store("collection lock poisoned".into()))
    }
}

fn project_id(doc: &Document) -> Document {
    let mut out = Document::new();
    if let Some(id) = doc.get("_id") {
        out.insert("_id".into(), id.clone());
    }
    out
}

#[async_trait]
impl Collection for MemoryCollection {
    fn schema(&self) -> &CollectionSchema {
        &self.schema
    }

    async fn find(&self, query: &Query, options: &FindOptions) -> Result<Vec<Document>, AppError> {
        tracing::debug!(
            collection = %self.schema.collection,
            conditions = query.len(),
            "find"
        );
        let mut matched: Vec<Document> = {
            let docs = self.read()?;
            docs.iter().filter(|d| query.matches(d)).cloned().collect()
        };
        if let Some(sort) = &options.sort {
            matched.sort_by(|a, b| {
                let ord = compare_field(a.get(&sort.field), b.get(&sort.field));
                if sort.descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }
        let skip = options.skip.unwrap_or(0).max(0) as usize;
        let mut page: Vec<Document> = matched.into_iter().skip(skip).collect();
        if let Some(limit) = options.limit {
            page.truncate(limit.max(0) as usize);
        }
        if options.id_only {
            page = page.iter().map(project_id).collect();
        }
        Ok(page)
    }

    async fn find_one(&self, query: &Query) -> Result<Option<Document>, AppError> {
        let docs = self.read()?;
        Ok(docs.iter().find(|d| query.matches(d)).cloned())
    }

    async fn count(&self, query: &Query) -> Result<u64, AppError> {
        let docs = self.read()?;
        Ok(docs.iter().filter(|d| query.matches(d)).count() as u64)
    }

    async fn create(&self, mut doc: Document) -> Result<Document, AppError> {
        if doc_id(&doc).is_none() {
            doc.insert("_id".into(), Value::String(Uuid::new_v4().to_string()));
        }
        let now = now_value();
        if self.schema.has_field("createdAt") && !doc.contains_key("createdAt") {
            doc.insert("createdAt".into(), now.clone());
        }
        if self.schema.has_field("updatedAt") {
            doc.insert("updatedAt".into(), now);
        }
        tracing::debug!(collection = %self.schema.collection, id = ?doc_id(&doc), "create");
        let mut docs = self.write()?;
        docs.push(doc.clone());
        Ok(doc)
    }

    async fn update_by_id(&self, id: &str, fields: Document) -> Result<Option<Document>, AppError> {
        let mut docs = self.write()?;
        let Some(existing) = docs.iter_mut().find(|d| doc_id(d) == Some(id)) else {
            return Ok(None);
        };
        for (k, v) in fields {
            // The identifier never changes.
            if k == "_id" {
                continue;
            }
            existing.insert(k, v);
        }
        if self.schema.has_field("updatedAt") {
            existing.insert("updatedAt".into(), now_value());
        }
        tracing::debug!(collection = %self.schema.collection, id = %id, "update");
        Ok(Some(existing.clone()))
    }

    async fn remove_by_id(&self, id: &str) -> Result<Option<Document>, AppError> {
        let mut docs = self.write()?;
        let idx = docs.iter().position(|d| doc_id(d) == Some(id));
        Ok(idx.map(|i| {
            tracing::debug!(collection = %self.schema.collection, id = %id, "remove");
            docs.remove(i)
        }))
    }

    async fn remove_where(&self, query: &Query) -> Result<u64, AppError> {
        let mut docs = self.write()?;
        let before = docs.len();
        docs.retain(|d| !query.matches(d));
        let removed = (before - docs.len()) as u64;
        tracing::debug!(collection = %self.schema.collection, removed, "remove where");
        Ok(removed)
    }
}

/// Named collections living in process memory.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Arc<MemoryCollection>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a collection under its schema name, returning the handle for
    /// seeding.
    pub fn create_collection(&self, schema: CollectionSchema) -> Arc<MemoryCollection> {
        let name = schema.collection.clone();
        let collection = Arc::new(MemoryCollection::new(schema));
        if let Ok(mut map) = self.collections.write() {
            map.insert(name, collection.clone());
        }
        collection
    }
}

impl CollectionResolver for MemoryStore {
    fn resolve(&self, name: &str) -> Option<Arc<dyn Collection>> {
        let map = self.collections.read().ok()?;
        map.get(name).cloned().map(|c| c as Arc<dyn Collection>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldKind;
    use crate::store::SortSpec;
    use serde_json::json;

    fn people() -> MemoryCollection {
        MemoryCollection::new(
            CollectionSchema::new("people")
                .field("name", FieldKind::String)
                .field("age", FieldKind::Number)
                .timestamps(),
        )
    }

    fn doc(v: Value) -> Document {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_timestamps() {
        let col = people();
        let created = col.create(doc(json!({"name": "ada"}))).await.unwrap();
        assert!(doc_id(&created).is_some());
        assert!(created.contains_key("createdAt"));
        assert!(created.contains_key("updatedAt"));
    }

    #[tokio::test]
    async fn test_find_sort_skip_limit() {
        let col = people();
        for (name, age) in [("a", 30), ("b", 10), ("c", 20)] {
            col.create(doc(json!({"name": name, "age": age})))
                .await
                .unwrap();
        }
        let opts = FindOptions {
            sort: Some(SortSpec::parse("age")),
            skip: Some(1),
            limit: Some(1),
            id_only: false,
        };
        let page = col.find(&Query::match_all(), &opts).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].get("name").unwrap(), "c");
    }

    #[tokio::test]
    async fn test_descending_sort() {
        let col = people();
        for age in [10, 30, 20] {
            col.create(doc(json!({"name": "x", "age": age})))
                .await
                .unwrap();
        }
        let opts = FindOptions::sorted(SortSpec::parse("-age"));
        let all = col.find(&Query::match_all(), &opts).await.unwrap();
        let ages: Vec<i64> = all
            .iter()
            .map(|d| d.get("age").unwrap().as_i64().unwrap())
            .collect();
        assert_eq!(ages, vec![30, 20, 10]);
    }

    #[tokio::test]
    async fn test_id_only_projection() {
        let col = people();
        col.create(doc(json!({"name": "ada", "age": 36})))
            .await
            .unwrap();
        let ids = col
            .find(&Query::match_all(), &FindOptions::id_only())
            .await
            .unwrap();
        assert_eq!(ids[0].len(), 1);
        assert!(ids[0].contains_key("_id"));
    }

    #[tokio::test]
    async fn test_update_merges_keeps_id_and_refreshes_updated_at() {
        let col = people();
        let created = col
            .create(doc(json!({"name": "ada", "age": 36})))
            .await
            .unwrap();
        let id = doc_id(&created).unwrap().to_string();
        // Timestamps carry millisecond precision; cross a boundary so the
        // refresh is observable.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let updated = col
            .update_by_id(&id, doc(json!({"age": 37, "_id": "hijack"})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc_id(&updated), Some(id.as_str()));
        assert_eq!(updated.get("age").unwrap(), 37);
        assert_eq!(updated.get("name").unwrap(), "ada");
        assert_eq!(updated.get("createdAt"), created.get("createdAt"));
        assert_ne!(updated.get("updatedAt"), created.get("updatedAt"));
    }

    #[tokio::test]
    async fn test_remove_where_counts() {
        let col = people();
        for age in [10, 20, 20] {
            col.create(doc(json!({"name": "x", "age": age})))
                .await
                .unwrap();
        }
        let removed = col
            .remove_where(&Query::eq("age", json!(20)))
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(col.count(&Query::match_all()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_resolver_finds_registered_collections() {
        let store = MemoryStore::new();
        store.create_collection(CollectionSchema::new("users"));
        assert!(store.resolve("users").is_some());
        assert!(store.resolve("ghosts").is_none());
    }
}
