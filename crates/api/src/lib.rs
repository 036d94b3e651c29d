//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - The S3 link REST routes under the plugin API base path
//! - Authentication middleware and extractors
//! - Error to response mapping

pub mod middleware;
pub mod routes;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use s3link_core::storage::S3Connector;
use s3link_shared::JwtService;
use s3link_shared::config::StorageSettings;

/// Path all plugin routes are served under.
pub const API_BASE_PATH: &str = "/apis/api.plugin.halo.run/v1alpha1/plugins/S3Link";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// JWT service for token validation.
    pub jwt_service: Arc<JwtService>,
    /// Builds S3 handles per request.
    pub connector: Arc<S3Connector>,
    /// Listing limits and backend timeout.
    pub storage_settings: StorageSettings,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::routes())
        .nest(API_BASE_PATH, routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
