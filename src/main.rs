use restaurant_reviews::{
    AppState, BcryptHasher, HasherState,
    config::{AppConfig, Env},
    create_router,
    repository::{PostgresRepository, RepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Boot order: configuration, logging, database (with migrations), shared state, HTTP
/// server. Any failure before the listener is bound aborts startup.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Configuration (fail-fast: no signing key, no server)
    dotenv::dotenv().ok();
    let config = AppConfig::load()?;

    // 2. Logging. RUST_LOG wins over the defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "restaurant_reviews=debug,tower_http=info,axum=trace".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Database
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "failed to connect to Postgres"))?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("database migrations applied");

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;
    let hasher = Arc::new(BcryptHasher::new(config.bcrypt_cost)) as HasherState;

    // 4. Shared state. Builds the token service from the configured key.
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState::new(repo, hasher, config)?;

    // 5. Server
    let app = create_router(app_state);
    let listener = TcpListener::bind(&bind_addr).await?;

    tracing::info!("Listening on {}", listener.local_addr()?);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app).await?;
    Ok(())
}
