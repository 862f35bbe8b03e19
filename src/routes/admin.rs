//! Admin routes over runtime-named collections.
//! Uses parameterized paths so Path extractors receive the collection name
//! and id; handlers resolve the collection from state per request. Static
//! segments (schema, exportToCsv, ...) take priority over the :id match.

use crate::handlers::admin::{
    create, destroy, destroy_multiple, export_to_csv, import_from_csv, list, schema, show, update,
};
use crate::state::AppState;
use axum::{routing::get, routing::post, Router};

pub fn admin_routes(state: AppState) -> Router {
    Router::new()
        .route("/:collection/schema", get(schema))
        .route("/:collection/exportToCsv", get(export_to_csv))
        .route("/:collection/importFromCsv", post(import_from_csv))
        .route("/:collection/deleteMultiple", post(destroy_multiple))
        // Router paths are exact about trailing slashes; admin frontends use
        // both spellings of the collection root.
        .route("/:collection", get(list).post(create))
        .route("/:collection/", get(list).post(create))
        .route(
            "/:collection/:id",
            get(show).put(update).patch(update).delete(destroy),
        )
        .with_state(state)
}
