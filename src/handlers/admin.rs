//! Admin CRUD handlers over runtime-named collections: schema introspection,
//! list/show/create/update/delete, bulk delete, CSV export and import.

use crate::csv::to_csv;
use crate::error::AppError;
use crate::extractors::RequireAdmin;
use crate::import::import_csv;
use crate::query::{build_search_query, FilterClause, Query};
use crate::response::{
    csv_attachment, export_filename, strip_request_fields, strip_response_fields, ListEnvelope,
};
use crate::schema::CollectionSchema;
use crate::state::AppState;
use crate::store::{doc_id, Document, FindOptions, SortSpec};
use axum::extract::Query as Params;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};

const DEFAULT_LIMIT: i64 = 20;
const DEFAULT_SORT: &str = "-createdAt";

// Admin frontends send `Number(x) || default` semantics: absent, empty,
// non-numeric, and zero all fall back.
fn numeric_or(params: &HashMap<String, String>, key: &str, default: i64) -> i64 {
    params
        .get(key)
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .map(|n| n as i64)
        .filter(|n| *n != 0)
        .unwrap_or(default)
}

/// Collect `filters[N][field]` / `filters[N][value]` pairs in index order.
/// Slots missing either half are dropped.
fn parse_filter_clauses(params: &HashMap<String, String>) -> Vec<FilterClause> {
    let mut slots: BTreeMap<usize, (Option<String>, Option<String>)> = BTreeMap::new();
    for (key, value) in params {
        let Some(rest) = key.strip_prefix("filters[") else {
            continue;
        };
        let Some((index, attr)) = rest.split_once("][") else {
            continue;
        };
        let Ok(index) = index.parse::<usize>() else {
            continue;
        };
        let slot = slots.entry(index).or_default();
        match attr {
            "field]" => slot.0 = Some(value.clone()),
            "value]" => slot.1 = Some(value.clone()),
            _ => {}
        }
    }
    slots
        .into_values()
        .filter_map(|(field, value)| Some(FilterClause::new(field?, value?)))
        .collect()
}

fn body_to_doc(value: Value) -> Result<Document, AppError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(AppError::Validation("body must be a JSON object".into())),
    }
}

// Batched reference resolution: one In-query per populated field, ids that
// fail to resolve keep their raw value.
async fn populate_references(
    state: &AppState,
    schema: &CollectionSchema,
    mut items: Vec<Document>,
) -> Result<Vec<Document>, AppError> {
    for field in &schema.populate_for_admin {
        let Some(descriptor) = schema.descriptor(field) else {
            continue;
        };
        let Some(target) = descriptor.reference.as_deref() else {
            continue;
        };
        let mut seen = BTreeSet::new();
        let ids: Vec<Value> = items
            .iter()
            .filter_map(|item| item.get(field).and_then(Value::as_str))
            .filter(|id| seen.insert(id.to_string()))
            .map(|id| Value::String(id.to_string()))
            .collect();
        if ids.is_empty() {
            continue;
        }
        let related = state.collection(target)?;
        let related_docs = related
            .find(&Query::in_values("_id", ids), &FindOptions::default())
            .await?;
        let by_id: HashMap<String, Document> = related_docs
            .into_iter()
            .filter_map(|d| {
                let id = doc_id(&d)?.to_string();
                Some((id, strip_response_fields(d)))
            })
            .collect();
        for item in &mut items {
            let Some(id) = item.get(field).and_then(Value::as_str) else {
                continue;
            };
            if let Some(resolved) = by_id.get(id) {
                item.insert(field.clone(), Value::Object(resolved.clone()));
            }
        }
    }
    Ok(items)
}

pub async fn schema(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let handle = state.collection(&collection)?;
    Ok(Json(Value::Object(handle.schema().descriptor_map())))
}

pub async fn list(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Params(params): Params<HashMap<String, String>>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let handle = state.collection(&collection)?;
    let limit = numeric_or(&params, "limit", DEFAULT_LIMIT);
    let skip = numeric_or(&params, "skip", 0);
    let sort = params
        .get("sort")
        .filter(|s| !s.is_empty())
        .map(|s| SortSpec::parse(s))
        .unwrap_or_else(|| SortSpec::parse(DEFAULT_SORT));
    let clauses = parse_filter_clauses(&params);
    tracing::debug!(%collection, limit, skip, filters = clauses.len(), "list");

    let query = build_search_query(state.resolver.as_ref(), handle.schema(), &clauses).await?;
    // Count and page run against the same compiled query but are not a
    // consistent snapshot relative to concurrent writes.
    let item_count = handle.count(&query).await?;
    let options = FindOptions {
        sort: Some(sort),
        limit: Some(limit),
        skip: Some(skip),
        id_only: false,
    };
    let items = handle.find(&query, &options).await?;
    let items = populate_references(&state, handle.schema(), items).await?;
    let items = items.into_iter().map(strip_response_fields).collect();
    Ok(Json(ListEnvelope { item_count, items }))
}

pub async fn show(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let handle = state.collection(&collection)?;
    let found = handle
        .find_one(&Query::eq("_id", Value::String(id.clone())))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{collection}/{id}")))?;
    Ok(Json(Value::Object(strip_response_fields(found))))
}

pub async fn create(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let handle = state.collection(&collection)?;
    let created = handle.create(body_to_doc(body)?).await?;
    Ok(Json(Value::Object(strip_response_fields(created))))
}

pub async fn update(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let handle = state.collection(&collection)?;
    let fields = strip_request_fields(body_to_doc(body)?);
    let updated = handle
        .update_by_id(&id, fields)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{collection}/{id}")))?;
    Ok(Json(Value::Object(strip_response_fields(updated))))
}

pub async fn destroy(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let handle = state.collection(&collection)?;
    handle
        .remove_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{collection}/{id}")))?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct BulkDeleteBody {
    pub ids: Vec<String>,
}

pub async fn destroy_multiple(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Json(body): Json<BulkDeleteBody>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let handle = state.collection(&collection)?;
    let ids: Vec<Value> = body.ids.into_iter().map(Value::String).collect();
    let removed = handle.remove_where(&Query::in_values("_id", ids)).await?;
    if removed == 0 {
        return Err(AppError::NotFound(format!("{collection}: no matching ids")));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn export_to_csv(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Params(params): Params<HashMap<String, String>>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let handle = state.collection(&collection)?;
    let clauses = parse_filter_clauses(&params);
    let query = build_search_query(state.resolver.as_ref(), handle.schema(), &clauses).await?;
    let docs = handle.find(&query, &FindOptions::default()).await?;
    tracing::debug!(%collection, rows = docs.len(), "export");
    let body = to_csv(handle.schema(), &docs);
    Ok(csv_attachment(&export_filename(&collection), body))
}

#[derive(Deserialize)]
pub struct ImportBody {
    pub url: String,
}

pub async fn import_from_csv(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Json(body): Json<ImportBody>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let handle = state.collection(&collection)?;
    let text = state.fetcher.fetch_text(&body.url).await?;
    import_csv(handle, &text).await?;
    Ok(StatusCode::NO_CONTENT)
}
