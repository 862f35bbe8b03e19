//! Demo server: seeds two in-memory collections (users, posts) and mounts
//! the admin routes under /admin.
//!
//! Run from the repo root: `cargo run -p demo-server`
//! Requests need the admin role header, e.g.:
//! `curl -H 'X-User-Role: admin' localhost:3000/admin/posts`

use axum::Router;
use backoffice_sdk::store::doc_id;
use backoffice_sdk::{
    admin_routes, common_routes, AppState, Collection, CollectionSchema, Document, FieldKind,
    HttpFetcher, MemoryStore,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

async fn seed(store: &MemoryStore) -> Result<(), backoffice_sdk::AppError> {
    let users = store.create_collection(
        CollectionSchema::new("users")
            .field("name", FieldKind::String)
            .field("email", FieldKind::String)
            .field("role", FieldKind::String)
            .field("hashedPassword", FieldKind::String)
            .timestamps(),
    );
    let posts = store.create_collection(
        CollectionSchema::new("posts")
            .field("title", FieldKind::String)
            .field("body", FieldKind::String)
            .field("published", FieldKind::Boolean)
            .field("views", FieldKind::Number)
            .reference("author", "users")
            .field("tags", FieldKind::Array)
            .timestamps()
            .populate(&["author"]),
    );

    let ada = users
        .create(doc(json!({
            "name": "Ada",
            "email": "ada@example.com",
            "role": "admin",
            "hashedPassword": "not-a-real-hash"
        })))
        .await?;
    let ada_id = doc_id(&ada).unwrap_or_default().to_string();
    users
        .create(doc(json!({
            "name": "Grace",
            "email": "grace@example.com",
            "role": "editor",
            "hashedPassword": "not-a-real-hash"
        })))
        .await?;

    posts
        .create(doc(json!({
            "title": "Analytical engines",
            "body": "Notes on computation.",
            "published": true,
            "views": 42,
            "author": ada_id,
            "tags": ["history", "computing"]
        })))
        .await?;
    posts
        .create(doc(json!({
            "title": "Drafts",
            "body": "Unfinished.",
            "published": false,
            "views": 0
        })))
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("backoffice_sdk=debug,demo_server=info")),
        )
        .init();

    let store = Arc::new(MemoryStore::new());
    seed(&store).await?;

    let state = AppState::new(store, Arc::new(HttpFetcher::new()));
    let app = Router::new()
        .merge(common_routes())
        .nest("/admin", admin_routes(state));

    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into());
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".into());
    let listener = TcpListener::bind(format!("{host}:{port}")).await?;
    tracing::info!("demo server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
