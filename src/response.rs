//! Response shaping: field blacklists, the list envelope, and the CSV
//! attachment builder.

use crate::store::Document;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Serialize;

/// Fields never accepted from request bodies or CSV imports. The importer
/// special-cases the identifier to locate existing records.
pub const REQUEST_BLACKLIST: &[&str] = &[
    "_id",
    "salt",
    "hashedPassword",
    "createdAt",
    "updatedAt",
    "__v",
];

/// Fields never returned to clients.
pub const RESPONSE_BLACKLIST: &[&str] = &["password", "salt", "hashedPassword"];

#[derive(Serialize)]
pub struct ListEnvelope {
    #[serde(rename = "itemCount")]
    pub item_count: u64,
    pub items: Vec<Document>,
}

pub fn strip_response_fields(mut doc: Document) -> Document {
    for field in RESPONSE_BLACKLIST {
        doc.remove(*field);
    }
    doc
}

pub fn strip_request_fields(mut doc: Document) -> Document {
    for field in REQUEST_BLACKLIST {
        doc.remove(*field);
    }
    doc
}

/// Attachment filename: `{collection}-export-{year}-{month}-{day}-.csv`, day
/// unpadded, trailing dash included. Existing download tooling expects this
/// shape.
pub fn export_filename(collection: &str) -> String {
    format!("{collection}-export-{}-.csv", Utc::now().format("%Y-%m-%-d"))
}

pub fn csv_attachment(filename: &str, body: String) -> Response {
    (
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                "text/csv; charset=utf-8".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_strip_removes_secrets() {
        let doc = json!({"_id": "1", "name": "ada", "hashedPassword": "x", "salt": "y"})
            .as_object()
            .cloned()
            .unwrap();
        let stripped = strip_response_fields(doc);
        assert!(stripped.contains_key("name"));
        assert!(!stripped.contains_key("hashedPassword"));
        assert!(!stripped.contains_key("salt"));
    }

    #[test]
    fn test_request_strip_removes_identity_and_audit_fields() {
        let doc = json!({"_id": "1", "name": "ada", "createdAt": "x", "__v": 3})
            .as_object()
            .cloned()
            .unwrap();
        let stripped = strip_request_fields(doc);
        assert_eq!(stripped.len(), 1);
        assert!(stripped.contains_key("name"));
    }

    #[test]
    fn test_list_envelope_uses_item_count_key() {
        let body = serde_json::to_string(&ListEnvelope {
            item_count: 3,
            items: vec![],
        })
        .unwrap();
        assert_eq!(body, "{\"itemCount\":3,\"items\":[]}");
    }

    #[test]
    fn test_export_filename_shape() {
        let name = export_filename("books");
        assert!(name.starts_with("books-export-"));
        assert!(name.ends_with("-.csv"));
    }
}
