//! Shared application state for all routes. Collaborators are injected at
//! construction and never swapped afterward.

use crate::error::AppError;
use crate::fetch::FileFetcher;
use crate::store::{resolve_collection, Collection, CollectionResolver};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<dyn CollectionResolver>,
    pub fetcher: Arc<dyn FileFetcher>,
}

impl AppState {
    pub fn new(resolver: Arc<dyn CollectionResolver>, fetcher: Arc<dyn FileFetcher>) -> Self {
        AppState { resolver, fetcher }
    }

    /// Resolve the collection named in the request path.
    pub fn collection(&self, name: &str) -> Result<Arc<dyn Collection>, AppError> {
        resolve_collection(self.resolver.as_ref(), name)
    }
}
