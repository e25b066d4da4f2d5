use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Member Router Module
///
/// Review endpoints for any signed-in account. The role gate only proves the caller is
/// signed in; ownership (author-only edits, author-or-admin deletes) is checked in the
/// handlers against the loaded review.
pub fn member_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /reviews
        // A `user` may only post as themselves; an admin may post for anyone.
        .route(
            "/reviews",
            post(handlers::create_review).get(handlers::list_reviews),
        )
        // PUT /reviews/{id} is author-only; DELETE /reviews/{id} is author or admin.
        .route(
            "/reviews/{id}",
            get(handlers::get_review)
                .put(handlers::update_review)
                .delete(handlers::delete_review),
        )
}
