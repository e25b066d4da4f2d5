use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Self-Service Router Module
///
/// `GET/PUT /users/me?id=<account id>`. The self gate admits the request only when `id`
/// equals the token's subject, whatever the caller's role.
pub fn self_service_routes() -> Router<AppState> {
    Router::new().route("/users/me", get(handlers::get_me).put(handlers::update_me))
}
