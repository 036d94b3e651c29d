//! S3 link routes: browse bucket objects and link them as attachments.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};

use crate::{AppState, middleware::AuthUser};
use s3link_core::s3link::{LinkError, LinkRequest, ListObjectsQuery, S3LinkService};
use s3link_core::storage::S3Connector;
use s3link_db::ExtensionRepository;
use s3link_shared::AppError;
use s3link_shared::types::CursorRequest;

/// Routes that require an authenticated caller.
pub fn listing_routes() -> Router<AppState> {
    Router::new()
        .route("/policies/s3", get(list_policies))
        .route("/objects/{policy_name}", get(list_objects))
}

/// Routes whose caller is checked by the link service.
pub fn link_routes() -> Router<AppState> {
    Router::new().route("/attachments/link", post(link_objects))
}

// ============================================================================
// Request Types
// ============================================================================

/// Query string of an object listing.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListObjectsParams {
    /// Key to resume after.
    pub continuation_token: Option<String>,
    /// Requested page size.
    pub page_size: Option<u32>,
    /// Only return objects that are not linked yet.
    #[serde(default)]
    pub unlinked: bool,
}

impl From<ListObjectsParams> for ListObjectsQuery {
    fn from(params: ListObjectsParams) -> Self {
        Self {
            cursor: CursorRequest {
                continuation_token: params.continuation_token,
                page_size: params.page_size,
            },
            unlinked: params.unlinked,
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn link_service(state: &AppState) -> S3LinkService<ExtensionRepository, S3Connector> {
    let repo = ExtensionRepository::new((*state.db).clone());
    S3LinkService::new(
        Arc::new(repo),
        state.connector.clone(),
        state.storage_settings.clone(),
    )
}

/// Convert a link error into a JSON error response.
fn error_response(err: LinkError) -> Response {
    let app_error = AppError::from(err);
    let status =
        StatusCode::from_u16(app_error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    // Store failures are not shown to clients.
    let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!(error = %app_error, "Request failed");
        "An error occurred"
    } else {
        warn!(error = %app_error, "Request rejected");
        app_error.message()
    };

    (
        status,
        Json(json!({
            "error": app_error.error_code(),
            "message": message
        })),
    )
        .into_response()
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/policies/s3`
/// List storage policies backed by S3-compatible buckets.
async fn list_policies(State(state): State<AppState>, _auth: AuthUser) -> Response {
    match link_service(&state).list_policies().await {
        Ok(policies) => (StatusCode::OK, Json(policies)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET `/objects/{policy_name}`
/// List one page of a policy's bucket with link status.
async fn list_objects(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(policy_name): Path<String>,
    Query(params): Query<ListObjectsParams>,
) -> Response {
    match link_service(&state)
        .list_objects(&policy_name, params.into())
        .await
    {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST `/attachments/link`
/// Link bucket objects as attachments owned by the caller.
///
/// Per-key failures are reported in the body; the request itself only fails
/// when there is no caller or the body is not a link request. The caller is
/// checked first.
async fn link_objects(
    State(state): State<AppState>,
    auth: Option<AuthUser>,
    payload: Result<Json<LinkRequest>, JsonRejection>,
) -> Response {
    let Some(caller) = auth.as_ref().map(AuthUser::caller) else {
        return error_response(LinkError::Unauthenticated);
    };
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => {
            warn!(error = %rejection, "Malformed link request");
            return rejection.into_response();
        }
    };

    match link_service(&state)
        .link_objects(Some(&caller), payload)
        .await
    {
        Ok(result) => {
            info!(
                linked = result.succeeded(),
                requested = result.items.len(),
                "Link request completed"
            );
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(e) => error_response(e),
    }
}
