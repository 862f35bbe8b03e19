//! Collection schemas: ordered field descriptors, known only at runtime.

use serde::Serialize;
use serde_json::{Map, Value};

/// Type tag for a schema field. Reference fields are `Id`-kind with a target
/// collection name in the descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum FieldKind {
    Id,
    String,
    Number,
    Boolean,
    Date,
    Object,
    Array,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Id => "Id",
            FieldKind::String => "String",
            FieldKind::Number => "Number",
            FieldKind::Boolean => "Boolean",
            FieldKind::Date => "Date",
            FieldKind::Object => "Object",
            FieldKind::Array => "Array",
        }
    }
}

#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    /// Target collection when this field holds ids into another collection.
    pub reference: Option<String>,
}

/// Ordered schema for one named collection. `_id` is always the first field.
#[derive(Clone, Debug)]
pub struct CollectionSchema {
    pub collection: String,
    pub fields: Vec<FieldDescriptor>,
    /// Reference fields to eager-resolve in admin list responses.
    pub populate_for_admin: Vec<String>,
}

impl CollectionSchema {
    pub fn new(collection: impl Into<String>) -> Self {
        CollectionSchema {
            collection: collection.into(),
            fields: vec![FieldDescriptor {
                name: "_id".into(),
                kind: FieldKind::Id,
                reference: None,
            }],
            populate_for_admin: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldDescriptor {
            name: name.into(),
            kind,
            reference: None,
        });
        self
    }

    /// Add a reference field pointing into `target`.
    pub fn reference(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.fields.push(FieldDescriptor {
            name: name.into(),
            kind: FieldKind::Id,
            reference: Some(target.into()),
        });
        self
    }

    /// Append `createdAt`/`updatedAt` date fields, maintained by the store.
    pub fn timestamps(self) -> Self {
        self.field("createdAt", FieldKind::Date)
            .field("updatedAt", FieldKind::Date)
    }

    pub fn populate(mut self, fields: &[&str]) -> Self {
        self.populate_for_admin = fields.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn descriptor(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.descriptor(name).is_some()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// The exact header line an importable CSV must carry.
    pub fn header_line(&self) -> String {
        self.field_names().collect::<Vec<_>>().join(",")
    }

    /// Ordered `name -> {"type", "ref"?}` map for the schema endpoint.
    pub fn descriptor_map(&self) -> Map<String, Value> {
        let mut out = Map::new();
        for f in &self.fields {
            let mut desc = Map::new();
            desc.insert("type".into(), Value::String(f.kind.as_str().into()));
            if let Some(target) = &f.reference {
                desc.insert("ref".into(), Value::String(target.clone()));
            }
            out.insert(f.name.clone(), Value::Object(desc));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CollectionSchema {
        CollectionSchema::new("posts")
            .field("title", FieldKind::String)
            .reference("author", "users")
            .field("tags", FieldKind::Array)
            .timestamps()
    }

    #[test]
    fn test_id_is_first_field() {
        let s = sample();
        assert_eq!(s.fields[0].name, "_id");
        assert_eq!(s.fields[0].kind, FieldKind::Id);
    }

    #[test]
    fn test_header_line_follows_declaration_order() {
        assert_eq!(
            sample().header_line(),
            "_id,title,author,tags,createdAt,updatedAt"
        );
    }

    #[test]
    fn test_descriptor_map_preserves_order_and_refs() {
        let map = sample().descriptor_map();
        let keys: Vec<&str> = map.keys().map(|k| k.as_str()).collect();
        assert_eq!(
            keys,
            vec!["_id", "title", "author", "tags", "createdAt", "updatedAt"]
        );
        let author = map.get("author").unwrap();
        assert_eq!(author.get("type").unwrap(), "Id");
        assert_eq!(author.get("ref").unwrap(), "users");
    }

    #[test]
    fn test_descriptor_lookup() {
        let s = sample();
        assert_eq!(s.descriptor("tags").unwrap().kind, FieldKind::Array);
        assert!(s.descriptor("missing").is_none());
        assert!(s.has_field("createdAt"));
    }
}
