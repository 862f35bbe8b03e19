//! Backoffice SDK: generic admin CRUD backend over runtime-named document
//! collections, with dynamic filters and CSV import/export. Embedders register
//! collections behind the storage traits and mount [`admin_routes`].

pub mod error;
pub mod schema;
pub mod query;
pub mod csv;
pub mod import;
pub mod fetch;
pub mod response;
pub mod store;
pub mod state;
pub mod extractors;
pub mod handlers;
pub mod routes;

pub use error::AppError;
pub use fetch::{FileFetcher, HttpFetcher};
pub use import::import_csv;
pub use query::{build_search_query, FilterClause, Query};
pub use routes::{admin_routes, common_routes};
pub use schema::{CollectionSchema, FieldDescriptor, FieldKind};
pub use state::AppState;
pub use store::{
    Collection, CollectionResolver, Document, FindOptions, MemoryCollection, MemoryStore, SortSpec,
};
