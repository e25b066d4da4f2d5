use std::sync::Arc;

use axum::{Router, extract::FromRef, http::HeaderName, middleware};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Session primitives and the guards built on them.
pub mod access;
pub mod auth;
pub mod password;
pub mod token;

// Persistence, request/response shapes and HTTP handlers.
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod pagination;
pub mod repository;

// Route groups, one per permission set.
pub mod routes;
use access::{ADMINS, MEMBERS, RoleGate};
use routes::{admin, member, public, self_service};

// --- Public Re-exports ---

pub use auth::{AuthService, AuthUser};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use password::{BcryptHasher, HasherState, PasswordHasher};
pub use repository::{PostgresRepository, Repository, RepositoryState};
pub use token::{TokenService, TokenState};

/// ApiDoc
///
/// OpenAPI document for every route, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login, handlers::signup,
        handlers::get_me, handlers::update_me,
        handlers::create_user, handlers::list_users, handlers::get_user,
        handlers::update_user, handlers::delete_user,
        handlers::create_restaurant, handlers::list_restaurants, handlers::get_restaurant,
        handlers::update_restaurant, handlers::delete_restaurant, handlers::list_restaurant_reviews,
        handlers::create_review, handlers::list_reviews, handlers::get_review,
        handlers::update_review, handlers::delete_review
    ),
    components(
        schemas(
            models::Role, models::AccountView, models::Restaurant, models::Review,
            models::LoginRequest, models::SignupRequest, models::SessionPayload,
            models::LoginResponse, models::CreateUserRequest, models::UpdateUserRequest,
            models::CreateRestaurantRequest, models::UpdateRestaurantRequest,
            models::CreateReviewRequest, models::UpdateReviewRequest,
            error::ErrorBody,
        )
    ),
    tags(
        (name = "restaurant-reviews", description = "Restaurant Review API")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// Shared, immutable container for the services every request needs. Handlers and
/// extractors pull individual parts out through the `FromRef` impls below.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub hasher: HasherState,
    /// Token issuer/verifier holding the process-wide signing key.
    pub tokens: TokenState,
    pub config: AppConfig,
}

impl AppState {
    /// Builds the token service from `config`. Fails with `Configuration` if the signing key
    /// is empty.
    pub fn new(
        repo: RepositoryState,
        hasher: HasherState,
        config: AppConfig,
    ) -> Result<Self, AppError> {
        let tokens = Arc::new(TokenService::from_config(&config)?);
        Ok(Self {
            repo,
            hasher,
            tokens,
            config,
        })
    }

    pub fn auth(&self) -> AuthService {
        AuthService::new(self.repo.clone(), self.hasher.clone(), self.tokens.clone())
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for HasherState {
    fn from_ref(app_state: &AppState) -> HasherState {
        app_state.hasher.clone()
    }
}

impl FromRef<AppState> for TokenState {
    fn from_ref(app_state: &AppState) -> TokenState {
        app_state.tokens.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for AuthService {
    fn from_ref(app_state: &AppState) -> AuthService {
        app_state.auth()
    }
}

/// create_router
///
/// Assembles the route groups, attaches each group's guard as a `route_layer`, and wraps
/// everything in the request-id, tracing and CORS layers.
///
/// A route that belongs to no guarded group is public. Groups are merged, so one path may
/// carry different guards per method (e.g. `GET /restaurants` public, `POST` admin-only).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let member_gate = RoleGate::new(state.tokens.clone(), MEMBERS);
    let admin_gate = RoleGate::new(state.tokens.clone(), ADMINS);

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            member::member_routes()
                .route_layer(middleware::from_fn_with_state(member_gate, access::role_gate)),
        )
        .merge(
            admin::admin_routes()
                .route_layer(middleware::from_fn_with_state(admin_gate, access::role_gate)),
        )
        .merge(self_service::self_service_routes().route_layer(
            middleware::from_fn_with_state(state.tokens.clone(), access::self_gate),
        ))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for one HTTP request, tagged with its `x-request-id` so every log line of the
/// request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
