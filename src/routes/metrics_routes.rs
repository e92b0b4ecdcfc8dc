//! Metrics exposition endpoint.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tracing::{error, trace};

use crate::exposition::render;
use crate::state::AppState;

/// Creates the metrics route.
pub fn routes() -> Router<AppState> {
    Router::new().route("/metrics", any(metrics_handler))
}

/// Gathers a fresh snapshot and renders it in the text format.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match render(&state.registry) {
        Ok((body, content_type)) => {
            trace!(bytes = body.len(), "Rendered metrics snapshot");
            (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], body).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
