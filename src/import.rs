//! CSV import: header gate, per-row candidate records, concurrent upserts,
//! and a capped error summary.

use crate::csv::csv_to_rows;
use crate::error::AppError;
use crate::query::Query;
use crate::response::REQUEST_BLACKLIST;
use crate::schema::FieldKind;
use crate::store::{Collection, Document};
use futures_util::future::join_all;
use serde_json::{Map, Value};
use std::sync::Arc;

/// How many row errors are itemized before the rest collapse into an
/// aggregate count. Bulk imports with many bad rows must not produce
/// unbounded response payloads.
const ERROR_DISPLAY_CAP: usize = 5;

fn row_error_summary(failures: &[String]) -> Value {
    let mut errors = Map::new();
    for (i, message) in failures.iter().take(ERROR_DISPLAY_CAP).enumerate() {
        errors.insert(i.to_string(), Value::String(message.clone()));
    }
    if failures.len() > ERROR_DISPLAY_CAP {
        errors.insert(
            ERROR_DISPLAY_CAP.to_string(),
            Value::String(format!(
                "And {} more errors.",
                failures.len() - ERROR_DISPLAY_CAP
            )),
        );
    }
    Value::Object(errors)
}

// Zip schema fields with row cells in order. Blacklisted fields are dropped
// except the identifier, which is kept so the upsert can find an existing
// record. Cells for non-string fields carry JSON.
fn build_candidate(
    collection: &dyn Collection,
    cells: &[String],
) -> Result<Document, String> {
    let mut candidate = Document::new();
    for (position, descriptor) in collection.schema().fields.iter().enumerate() {
        let name = descriptor.name.as_str();
        if name != "_id" && REQUEST_BLACKLIST.contains(&name) {
            continue;
        }
        let Some(cell) = cells.get(position) else {
            continue;
        };
        if cell.is_empty() {
            continue;
        }
        let value = match descriptor.kind {
            FieldKind::Id | FieldKind::String => Value::String(cell.clone()),
            _ => serde_json::from_str(cell)
                .map_err(|e| format!("field {name} is not valid JSON: {e}"))?,
        };
        candidate.insert(name.to_string(), value);
    }
    Ok(candidate)
}

async fn import_row(collection: Arc<dyn Collection>, cells: &[String]) -> Result<(), String> {
    let mut candidate = build_candidate(collection.as_ref(), cells)?;
    let id = candidate
        .get("_id")
        .and_then(Value::as_str)
        .map(|s| s.to_string());
    if let Some(id) = id {
        let existing = collection
            .find_one(&Query::eq("_id", Value::String(id.clone())))
            .await
            .map_err(|e| e.to_string())?;
        if existing.is_some() {
            candidate.remove("_id");
            collection
                .update_by_id(&id, candidate)
                .await
                .map_err(|e| e.to_string())?;
            return Ok(());
        }
    }
    candidate.remove("_id");
    collection.create(candidate).await.map_err(|e| e.to_string())?;
    Ok(())
}

/// Import CSV text into a collection. The header row must equal the schema's
/// field names joined by commas, order-sensitive; anything else is rejected
/// before any row is touched. Data rows upsert independently and
/// concurrently, one outcome per row; the call returns only after every row
/// has settled. Ok means every row landed; row failures come back as
/// [`AppError::ImportFailed`] with at most five itemized messages plus an
/// aggregate count.
pub async fn import_csv(collection: Arc<dyn Collection>, text: &str) -> Result<(), AppError> {
    let trimmed = text.trim();
    let lines: Vec<&str> = trimmed.lines().collect();
    if lines.len() < 2 {
        return Err(AppError::Validation(
            "CSV must contain a header row and at least one data row".into(),
        ));
    }
    let expected = collection.schema().header_line();
    if lines[0] != expected {
        return Err(AppError::Validation(format!(
            "CSV header does not match the {} schema",
            collection.schema().collection
        )));
    }

    let rows = csv_to_rows(trimmed, ',');
    let tasks = rows
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, row)| row.iter().any(|cell| !cell.is_empty()))
        .map(|(index, row)| {
            let collection = collection.clone();
            async move {
                import_row(collection, row)
                    .await
                    .map_err(|e| format!("Row {index}: {e}"))
            }
        });
    let outcomes = join_all(tasks).await;

    let total = outcomes.len();
    let failures: Vec<String> = outcomes.into_iter().filter_map(Result::err).collect();
    tracing::debug!(
        collection = %collection.schema().collection,
        rows = total,
        failed = failures.len(),
        "import settled"
    );
    if failures.is_empty() {
        Ok(())
    } else {
        Err(AppError::ImportFailed {
            errors: row_error_summary(&failures),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CollectionSchema;
    use crate::store::memory::MemoryStore;
    use crate::store::{doc_id, CollectionResolver, FindOptions};
    use serde_json::json;

    fn store_with_people() -> (MemoryStore, Arc<dyn Collection>) {
        let store = MemoryStore::new();
        store.create_collection(
            CollectionSchema::new("people")
                .field("name", FieldKind::String)
                .field("age", FieldKind::Number)
                .timestamps(),
        );
        let collection = store.resolve("people").unwrap();
        (store, collection)
    }

    fn header() -> String {
        "_id,name,age,createdAt,updatedAt".to_string()
    }

    #[tokio::test]
    async fn test_header_mismatch_is_rejected() {
        let (_store, people) = store_with_people();
        let err = import_csv(people, "name,age\nada,36\n").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_missing_data_rows_are_rejected() {
        let (_store, people) = store_with_people();
        let err = import_csv(people.clone(), &header()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        let err = import_csv(people, "").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_import_creates_rows() {
        let (_store, people) = store_with_people();
        let text = format!("{}\n,\"ada\",\"36\",,\n,\"bob\",\"41\",,\n", header());
        import_csv(people.clone(), &text).await.unwrap();
        assert_eq!(people.count(&Query::match_all()).await.unwrap(), 2);
        let ada = people
            .find_one(&Query::eq("name", json!("ada")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ada.get("age").unwrap(), 36);
        assert!(ada.contains_key("createdAt"));
    }

    #[tokio::test]
    async fn test_import_updates_existing_by_id() {
        let (_store, people) = store_with_people();
        let created = people
            .create(json!({"name": "ada", "age": 36}).as_object().cloned().unwrap())
            .await
            .unwrap();
        let id = doc_id(&created).unwrap().to_string();
        let text = format!("{}\n\"{}\",\"ada lovelace\",,,\n", header(), id);
        import_csv(people.clone(), &text).await.unwrap();
        assert_eq!(people.count(&Query::match_all()).await.unwrap(), 1);
        let updated = people
            .find_one(&Query::eq("_id", json!(id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.get("name").unwrap(), "ada lovelace");
        // Empty cells leave existing fields alone.
        assert_eq!(updated.get("age").unwrap(), 36);
    }

    #[tokio::test]
    async fn test_unknown_id_creates_with_fresh_identifier() {
        let (_store, people) = store_with_people();
        let text = format!("{}\n\"ghost\",\"eve\",,,\n", header());
        import_csv(people.clone(), &text).await.unwrap();
        let all = people
            .find(&Query::match_all(), &FindOptions::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
        assert_ne!(doc_id(&all[0]), Some("ghost"));
    }

    #[tokio::test]
    async fn test_blacklisted_columns_are_ignored() {
        let (_store, people) = store_with_people();
        let text = format!("{}\n,\"ada\",,2001-01-01 00:00:00,2001-01-01 00:00:00\n", header());
        import_csv(people.clone(), &text).await.unwrap();
        let ada = people
            .find_one(&Query::eq("name", json!("ada")))
            .await
            .unwrap()
            .unwrap();
        assert_ne!(ada.get("createdAt").unwrap(), "2001-01-01 00:00:00");
    }

    #[tokio::test]
    async fn test_bad_json_fails_that_row_only() {
        let (_store, people) = store_with_people();
        let text = format!("{}\n,\"ada\",\"36\",,\n,\"bob\",notjson,,\n", header());
        let err = import_csv(people.clone(), &text).await.unwrap_err();
        let AppError::ImportFailed { errors } = err else {
            panic!("expected import failure");
        };
        let errors = errors.as_object().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors["0"].as_str().unwrap().starts_with("Row 2:"));
        // The good row still landed.
        assert_eq!(people.count(&Query::match_all()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_error_summary_caps_at_five_plus_aggregate() {
        let (_store, people) = store_with_people();
        let mut text = format!("{}\n", header());
        for _ in 0..12 {
            text.push_str(",\"x\",bad,,\n");
        }
        let err = import_csv(people, &text).await.unwrap_err();
        let AppError::ImportFailed { errors } = err else {
            panic!("expected import failure");
        };
        let errors = errors.as_object().unwrap();
        assert_eq!(errors.len(), 6);
        assert_eq!(errors["5"], json!("And 7 more errors."));
    }

    #[tokio::test]
    async fn test_blank_lines_between_rows_are_skipped() {
        let (_store, people) = store_with_people();
        let text = format!("{}\n,\"ada\",,,\n\n,\"bob\",,,\n", header());
        import_csv(people.clone(), &text).await.unwrap();
        assert_eq!(people.count(&Query::match_all()).await.unwrap(), 2);
    }
}
