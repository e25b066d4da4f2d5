//! Development seeder.
//!
//! Loads a demo user, an admin, two restaurants and two reviews into the configured
//! database. Accounts that already exist are left alone, and catalogue data is only
//! inserted into an empty restaurants table, so running it twice is harmless.

use dotenv::dotenv;
use restaurant_reviews::{
    AppError, AuthService, BcryptHasher, HasherState, Repository, TokenService,
    config::AppConfig,
    models::{Account, CreateRestaurantRequest, CreateReviewRequest, Role},
    repository::{PostgresRepository, RepositoryState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

const SEED_ACCOUNTS: &[(&str, &str, &str, Role)] = &[
    ("john_doe", "john@example.com", "password123", Role::User),
    ("admin", "admin@example.com", "admin", Role::Admin),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seed=info,restaurant_reviews=info".into()),
        )
        .init();

    let config = AppConfig::load()?;
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.db_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;
    let hasher = Arc::new(BcryptHasher::new(config.bcrypt_cost)) as HasherState;
    let tokens = Arc::new(TokenService::from_config(&config)?);
    let auth = AuthService::new(repo.clone(), hasher, tokens);

    let mut accounts = Vec::with_capacity(SEED_ACCOUNTS.len());
    for (username, email, password, role) in SEED_ACCOUNTS {
        accounts.push(seed_account(repo.as_ref(), &auth, username, email, password, *role).await?);
    }

    let (_, restaurant_count) = repo.list_restaurants(0, 1).await?;
    if restaurant_count > 0 {
        tracing::info!(restaurant_count, "restaurants already present, skipping catalogue");
        return Ok(());
    }

    let pizzeria = repo
        .create_restaurant(CreateRestaurantRequest {
            name: "Luigi's Pizzeria".to_string(),
            phone_number: "555-0101".to_string(),
            address: "12 Harbour Street".to_string(),
        })
        .await?;
    let noodle_bar = repo
        .create_restaurant(CreateRestaurantRequest {
            name: "Golden Noodle Bar".to_string(),
            phone_number: "555-0202".to_string(),
            address: "48 Market Lane".to_string(),
        })
        .await?;

    let reviewer = &accounts[0];
    for (restaurant_id, rating, comment) in [
        (pizzeria.id, 5.0, "Best margherita in town."),
        (noodle_bar.id, 4.0, "Great broth, slow service."),
    ] {
        repo.create_review(CreateReviewRequest {
            rating,
            comment: comment.to_string(),
            restaurant_id,
            user_id: reviewer.id,
        })
        .await?;
    }

    tracing::info!("seed data loaded");
    Ok(())
}

async fn seed_account(
    repo: &dyn Repository,
    auth: &AuthService,
    username: &str,
    email: &str,
    password: &str,
    role: Role,
) -> Result<Account, AppError> {
    if let Some(existing) = repo.find_account_by_username(username).await? {
        tracing::info!(username, "account exists, skipping");
        return Ok(existing);
    }

    let account = auth
        .create_account(username.to_string(), Some(email.to_string()), password, role)
        .await?;
    tracing::info!(username, role = %role, "account created");
    Ok(account)
}
