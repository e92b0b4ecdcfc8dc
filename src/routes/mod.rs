//! HTTP route table.
//!
//! `/` answers liveness checks, `/metrics` serves the exposition text and
//! every other path gets a plain-text 404.

mod health_routes;
mod metrics_routes;

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use tracing::debug;

use crate::state::AppState;

/// Content type of the plain-text responses.
pub const PLAIN_TEXT: &str = "text/plain; charset=utf-8";

/// Creates the application router with all configured routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health_routes::routes())
        .merge(metrics_routes::routes())
        .fallback(not_found)
        .layer(middleware::from_fn(trace_request))
        .with_state(state)
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, PLAIN_TEXT)],
        "Not found",
    )
}

async fn trace_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let response = next.run(request).await;
    debug!(%method, %path, status = response.status().as_u16(), "Served request");
    response
}
