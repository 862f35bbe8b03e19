//! Request extractors shared by the admin routes.

pub mod admin;
pub use admin::{RequireAdmin, ADMIN_ROLE, USER_ROLE_HEADER};
