use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Admin Router Module
///
/// Catalogue maintenance and account administration. The whole group sits behind the
/// `admin` role gate; handlers here do no further role checks.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // --- Restaurants ---
        .route("/restaurants", post(handlers::create_restaurant))
        // DELETE cascades to the restaurant's reviews.
        .route(
            "/restaurants/{id}",
            put(handlers::update_restaurant).delete(handlers::delete_restaurant),
        )
        // --- Accounts ---
        // POST /users
        // Creates an account with any role.
        .route(
            "/users",
            post(handlers::create_user).get(handlers::list_users),
        )
        .route(
            "/users/{id}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
}
