use axum::{
    extract::{Query, Request, State},
    http::{HeaderMap, Uri, header},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::AppError,
    models::Role,
    token::{Claims, TokenService, TokenState},
};

// --- Route permission sets ---

/// No token required.
pub const PUBLIC: &[Role] = &[];
/// Any signed-in account.
pub const MEMBERS: &[Role] = &[Role::User, Role::Admin];
pub const ADMINS: &[Role] = &[Role::Admin];

/// bearer_token
///
/// Pulls the token out of `Authorization: Bearer <token>`. Any other scheme, a missing
/// header, or an empty token is `Unauthenticated`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            AppError::Unauthenticated("Missing or invalid authorization header".to_string())
        })?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AppError::Unauthenticated(
            "Missing or invalid authorization header".to_string(),
        )),
    }
}

/// authorize
///
/// The role guard. An empty `required` set admits every request without looking at the
/// headers and yields `None`. Otherwise the bearer token must verify (`Unauthenticated`) and
/// its role must be in `required` (`Forbidden`).
pub fn authorize(
    required: &[Role],
    headers: &HeaderMap,
    tokens: &TokenService,
) -> Result<Option<Claims>, AppError> {
    if required.is_empty() {
        return Ok(None);
    }

    let claims = tokens.verify(bearer_token(headers)?)?;

    if !required.contains(&claims.role) {
        tracing::warn!(sub = claims.sub, role = %claims.role, "role not permitted on route");
        return Err(AppError::Forbidden);
    }

    Ok(Some(claims))
}

/// authorize_self
///
/// The self-ownership guard. The token must verify (`Unauthenticated` otherwise) and its
/// subject must equal `owner_id`. An absent owner id never matches.
pub fn authorize_self(
    owner_id: Option<i32>,
    headers: &HeaderMap,
    tokens: &TokenService,
) -> Result<Claims, AppError> {
    let claims = tokens.verify(bearer_token(headers)?)?;

    match owner_id {
        Some(id) if id == claims.sub => Ok(claims),
        _ => {
            tracing::warn!(sub = claims.sub, owner = ?owner_id, "self-service owner mismatch");
            Err(AppError::Forbidden)
        }
    }
}

/// OwnerQuery
///
/// Self-service routes name the resource owner in exactly one place: the `id` query parameter.
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OwnerQuery {
    /// Account id of the resource owner.
    pub id: Option<i32>,
}

/// A missing or non-numeric `id` yields `None`.
pub fn owner_id_from_uri(uri: &Uri) -> Option<i32> {
    Query::<OwnerQuery>::try_from_uri(uri)
        .ok()
        .and_then(|Query(query)| query.id)
}

// --- Middleware adapters ---

/// RoleGate
///
/// Middleware state: the permitted roles declared for a group of routes plus the token
/// service to check them with.
#[derive(Clone)]
pub struct RoleGate {
    tokens: TokenState,
    roles: &'static [Role],
}

impl RoleGate {
    pub fn new(tokens: TokenState, roles: &'static [Role]) -> Self {
        Self { tokens, roles }
    }
}

/// role_gate
///
/// Runs [`authorize`] before the handler. On success the verified claims are stored in the
/// request extensions for the `AuthUser` extractor; on failure the handler never runs.
pub async fn role_gate(
    State(gate): State<RoleGate>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(claims) = authorize(gate.roles, request.headers(), &gate.tokens)? {
        request.extensions_mut().insert(claims);
    }
    Ok(next.run(request).await)
}

/// self_gate
///
/// Runs [`authorize_self`] against the `id` query parameter before the handler.
pub async fn self_gate(
    State(tokens): State<TokenState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let owner_id = owner_id_from_uri(request.uri());
    let claims = authorize_self(owner_id, request.headers(), &tokens)?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
