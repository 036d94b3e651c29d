//! Request middleware.

pub mod auth;

pub use auth::{AuthUser, auth_middleware, optional_auth_middleware};
