use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Read-only endpoints reachable without credentials. Credentials are still honoured when
/// present, so a signed-in user listing advertisements also sees their own drafts.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET /advertisements
        // Listing filtered by the visibility rule (no foreign drafts).
        .route("/advertisements", get(handlers::list_advertisements))
        // GET /advertisements/{id}
        // Invisible drafts answer 404, same as unknown ids.
        .route("/advertisements/{id}", get(handlers::get_advertisement))
}
