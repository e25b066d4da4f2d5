/// Router Module Index
///
/// Routes are grouped by who may call them. `create_router` attaches one guard per group
/// as a `route_layer`, so a handler is never reachable without its group's check.

/// Open to anyone: health, login, signup and restaurant browsing.
pub mod public;

/// Any signed-in account (`user` or `admin`).
pub mod member;

/// `admin` only.
pub mod admin;

/// Scoped to the caller's own account via the `id` query parameter.
pub mod self_service;
