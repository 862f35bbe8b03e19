//! Admin role gate (e.g. X-User-Role header) applied before any admin
//! handler runs.

use crate::error::AppError;
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

/// Header name for the caller's role. Default: `X-User-Role`. Deployments
/// with a real identity layer map their session onto this before routing.
pub const USER_ROLE_HEADER: &str = "X-User-Role";

pub const ADMIN_ROLE: &str = "admin";

/// Extractor that rejects any request whose role is not `admin`.
#[derive(Clone, Debug)]
pub struct RequireAdmin;

#[async_trait]
impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let role = parts
            .headers
            .get(USER_ROLE_HEADER)
            .and_then(|v: &axum::http::HeaderValue| v.to_str().ok())
            .map(|s: &str| s.trim());
        if role == Some(ADMIN_ROLE) {
            Ok(RequireAdmin)
        } else {
            Err(AppError::Forbidden)
        }
    }
}
