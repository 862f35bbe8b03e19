//! Storage capability interface: any named, schema-bearing collection the admin
//! layer can operate on implements [`Collection`]; a [`CollectionResolver`]
//! turns the URL path segment into a concrete handle once per request.

pub mod memory;

use crate::error::AppError;
use crate::query::Query;
use crate::schema::CollectionSchema;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub use memory::{MemoryCollection, MemoryStore};

/// A schemaless-JSON document. Field order is preserved end to end.
pub type Document = serde_json::Map<String, Value>;

/// String identifier of a document, when present.
pub fn doc_id(doc: &Document) -> Option<&str> {
    doc.get("_id").and_then(Value::as_str)
}

/// Sort key parsed from the request, mongo style: `-createdAt` = newest first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub descending: bool,
}

impl SortSpec {
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix('-') {
            Some(field) => SortSpec {
                field: field.to_string(),
                descending: true,
            },
            None => SortSpec {
                field: raw.to_string(),
                descending: false,
            },
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct FindOptions {
    pub sort: Option<SortSpec>,
    pub limit: Option<i64>,
    pub skip: Option<i64>,
    /// Project each result down to its `_id` field only.
    pub id_only: bool,
}

impl FindOptions {
    pub fn id_only() -> Self {
        FindOptions {
            id_only: true,
            ..Default::default()
        }
    }

    pub fn sorted(sort: SortSpec) -> Self {
        FindOptions {
            sort: Some(sort),
            ..Default::default()
        }
    }
}

/// One named, schema-bearing collection. Every storage backend implements this
/// per collection; the admin layer never sees anything more concrete.
#[async_trait]
pub trait Collection: Send + Sync {
    fn schema(&self) -> &CollectionSchema;

    async fn find(&self, query: &Query, options: &FindOptions) -> Result<Vec<Document>, AppError>;

    async fn find_one(&self, query: &Query) -> Result<Option<Document>, AppError>;

    async fn count(&self, query: &Query) -> Result<u64, AppError>;

    /// Insert a document; the backend assigns `_id` when absent and maintains
    /// declared timestamp fields. Returns the stored document.
    async fn create(&self, doc: Document) -> Result<Document, AppError>;

    /// Merge `fields` onto the document with `id` and persist. `None` when no
    /// such document exists.
    async fn update_by_id(&self, id: &str, fields: Document) -> Result<Option<Document>, AppError>;

    /// Remove one document, returning it, or `None` when absent.
    async fn remove_by_id(&self, id: &str) -> Result<Option<Document>, AppError>;

    /// Remove every matching document, returning how many were removed.
    async fn remove_where(&self, query: &Query) -> Result<u64, AppError>;
}

/// Resolves a collection name from the request path into a live handle.
pub trait CollectionResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Option<Arc<dyn Collection>>;
}

/// Fallible resolution used by request handlers: an unknown name is a schema
/// failure, surfaced through the generic error channel.
pub fn resolve_collection(
    resolver: &dyn CollectionResolver,
    name: &str,
) -> Result<Arc<dyn Collection>, AppError> {
    resolver
        .resolve(name)
        .ok_or_else(|| AppError::Schema(format!("unknown collection: {}", name)))
}
