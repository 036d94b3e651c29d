//! Shared types, errors, and configuration for S3 Link.
//!
//! This crate provides common types used across all other crates:
//! - Cursor pagination types for object listings
//! - Application-wide error types
//! - JWT claims and token service
//! - Configuration management

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;
pub mod types;

pub use auth::Claims;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use jwt::{JwtConfig, JwtError, JwtService};
