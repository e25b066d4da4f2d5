use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that need no token. Read access to restaurants and their reviews is public;
/// writes live in the admin and member groups under the same paths.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /auth/login
        // Exchanges credentials for a session token.
        .route("/auth/login", post(handlers::login))
        // POST /auth/signup
        // Registers a `user` account. No token is issued.
        .route("/auth/signup", post(handlers::signup))
        // GET /restaurants?page=&take=
        .route("/restaurants", get(handlers::list_restaurants))
        .route("/restaurants/{id}", get(handlers::get_restaurant))
        // GET /restaurants/{id}/reviews?page=&take=
        .route(
            "/restaurants/{id}/reviews",
            get(handlers::list_restaurant_reviews),
        )
}
