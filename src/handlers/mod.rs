//! HTTP handlers for the admin CRUD surface.

pub mod admin;
pub use admin::*;
