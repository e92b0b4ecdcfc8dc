//! Liveness endpoint.

use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
    routing::any,
    Router,
};

use super::PLAIN_TEXT;
use crate::state::AppState;

/// Registers the liveness route on `/`.
pub fn routes() -> Router<AppState> {
    Router::new().route("/", any(liveness))
}

/// Always 200 `Ok`, independent of registry state.
async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, [(header::CONTENT_TYPE, PLAIN_TEXT)], "Ok")
}
