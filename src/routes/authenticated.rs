use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, patch, post},
};

/// Authenticated Router Module
///
/// Every write and every per-user view. The router layer above guarantees a resolved
/// identity; handlers additionally run the action policy, which adds the
/// owner-or-admin check for updates and deletes.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        .route("/me", get(handlers::get_me))
        // POST /advertisements
        // Creator is forced to the requester; OPEN inserts are subject to the open limit.
        .route("/advertisements", post(handlers::create_advertisement))
        // PUT/PATCH/DELETE /advertisements/{id}
        // Creator or administrator only.
        .route(
            "/advertisements/{id}",
            patch(handlers::partial_update_advertisement)
                .put(handlers::update_advertisement)
                .delete(handlers::delete_advertisement),
        )
        // POST/DELETE /advertisements/{id}/favorite
        // Add is rejected for own and already-favorited advertisements; remove is idempotent.
        .route(
            "/advertisements/{id}/favorite",
            post(handlers::add_favorite).delete(handlers::remove_favorite),
        )
        // GET /favorites
        .route("/favorites", get(handlers::list_favorites))
}
