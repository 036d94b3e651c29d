//! API route definitions.

use axum::{Router, middleware};

use crate::AppState;
use crate::middleware::{auth_middleware, optional_auth_middleware};

pub mod health;
pub mod s3link;

/// Creates the plugin API router.
///
/// Listing routes require a valid token. The link route also accepts
/// anonymous requests and leaves the refusal to the link service, so that
/// no key is touched without a caller.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    let protected_routes = s3link::listing_routes().layer(middleware::from_fn_with_state(
        state.clone(),
        auth_middleware,
    ));

    let link_routes = s3link::link_routes().layer(middleware::from_fn_with_state(
        state,
        optional_auth_middleware,
    ));

    Router::new().merge(protected_routes).merge(link_routes)
}
