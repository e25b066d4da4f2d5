use crate::{
    error::{AppError, AppResult},
    models::{
        Account, AccountChanges, CreateRestaurantRequest, CreateReviewRequest, NewAccount,
        Restaurant, Review, UpdateRestaurantRequest, UpdateReviewRequest,
    },
};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;

/// Repository Trait
///
/// Abstract contract for all persistence operations, including the credential store the
/// authentication flow depends on. Handlers only ever see `Arc<dyn Repository>`, which lets
/// tests swap in an in-memory implementation.
///
/// List methods take a `skip`/`take` window and return the slice together with the total
/// row count. The two are separate queries and may disagree under concurrent writes.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Accounts (credential store) ---
    async fn find_account_by_username(&self, username: &str) -> AppResult<Option<Account>>;
    async fn find_account(&self, id: i32) -> AppResult<Option<Account>>;
    // Fails with `DuplicateAccount` if the username is taken, including when a concurrent
    // insert wins the race.
    async fn create_account(&self, account: NewAccount) -> AppResult<Account>;
    async fn list_accounts(&self, skip: i64, take: i64) -> AppResult<(Vec<Account>, i64)>;
    async fn update_account(&self, id: i32, changes: AccountChanges) -> AppResult<Option<Account>>;
    // Also removes every review the account authored.
    async fn delete_account(&self, id: i32) -> AppResult<bool>;

    // --- Restaurants ---
    async fn create_restaurant(&self, req: CreateRestaurantRequest) -> AppResult<Restaurant>;
    async fn list_restaurants(&self, skip: i64, take: i64) -> AppResult<(Vec<Restaurant>, i64)>;
    async fn get_restaurant(&self, id: i32) -> AppResult<Option<Restaurant>>;
    async fn update_restaurant(
        &self,
        id: i32,
        req: UpdateRestaurantRequest,
    ) -> AppResult<Option<Restaurant>>;
    async fn delete_restaurant(&self, id: i32) -> AppResult<bool>;

    // --- Reviews ---
    // Review writes keep the parent restaurant's `average_rating` in step.
    async fn create_review(&self, req: CreateReviewRequest) -> AppResult<Review>;
    async fn list_reviews(&self, skip: i64, take: i64) -> AppResult<(Vec<Review>, i64)>;
    async fn list_reviews_for_restaurant(
        &self,
        restaurant_id: i32,
        skip: i64,
        take: i64,
    ) -> AppResult<(Vec<Review>, i64)>;
    async fn get_review(&self, id: i32) -> AppResult<Option<Review>>;
    async fn update_review(&self, id: i32, req: UpdateReviewRequest) -> AppResult<Option<Review>>;
    async fn delete_review(&self, id: i32) -> AppResult<bool>;
}

/// RepositoryState
///
/// Thread-safe shared pointer to the repository implementation, held in `AppState`.
pub type RepositoryState = Arc<dyn Repository>;

const ACCOUNT_COLUMNS: &str = "id, username, email, password_hash, role";
const RESTAURANT_COLUMNS: &str = "id, name, phone_number, address, average_rating";
const REVIEW_COLUMNS: &str = "id, rating, comment, created_at, restaurant_id, user_id";

const REFRESH_AVERAGE_RATING: &str = r#"
    UPDATE restaurants
    SET average_rating = COALESCE((SELECT AVG(rating) FROM reviews WHERE restaurant_id = $1), 0)
    WHERE id = $1
"#;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
#[derive(Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn refresh_average_rating(
        tx: &mut Transaction<'_, Postgres>,
        restaurant_id: i32,
    ) -> AppResult<()> {
        sqlx::query(REFRESH_AVERAGE_RATING)
            .bind(restaurant_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

/// Converts constraint violations into domain errors; everything else stays a database error.
fn map_write_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return AppError::DuplicateAccount;
        }
        if db.is_foreign_key_violation() {
            return AppError::NotFound("Referenced restaurant or user does not exist".to_string());
        }
    }
    AppError::Database(err)
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_account_by_username(&self, username: &str) -> AppResult<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE username = $1");
        Ok(sqlx::query_as::<_, Account>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_account(&self, id: i32) -> AppResult<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        Ok(sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Relies on the `accounts.username` unique index, so two concurrent signups for the same
    /// name cannot both succeed.
    async fn create_account(&self, account: NewAccount) -> AppResult<Account> {
        let sql = format!(
            "INSERT INTO accounts (username, email, password_hash, role) \
             VALUES ($1, $2, $3, $4) RETURNING {ACCOUNT_COLUMNS}"
        );
        sqlx::query_as::<_, Account>(&sql)
            .bind(account.username)
            .bind(account.email)
            .bind(account.password_hash)
            .bind(account.role)
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)
    }

    async fn list_accounts(&self, skip: i64, take: i64) -> AppResult<(Vec<Account>, i64)> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY id LIMIT $1 OFFSET $2");
        let items = sqlx::query_as::<_, Account>(&sql)
            .bind(take)
            .bind(skip)
            .fetch_all(&self.pool)
            .await?;
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM accounts")
            .fetch_one(&self.pool)
            .await?;
        Ok((items, total))
    }

    /// Partial update via COALESCE: absent fields keep their stored value.
    async fn update_account(&self, id: i32, changes: AccountChanges) -> AppResult<Option<Account>> {
        let sql = format!(
            r#"UPDATE accounts SET
                 username = COALESCE($2, username),
                 email = COALESCE($3, email),
                 password_hash = COALESCE($4, password_hash),
                 role = COALESCE($5, role)
               WHERE id = $1
               RETURNING {ACCOUNT_COLUMNS}"#
        );
        sqlx::query_as::<_, Account>(&sql)
            .bind(id)
            .bind(changes.username)
            .bind(changes.email)
            .bind(changes.password_hash)
            .bind(changes.role)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)
    }

    /// Reviews go with the account (ON DELETE CASCADE); the affected restaurants' averages
    /// are recomputed in the same transaction.
    async fn delete_account(&self, id: i32) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let touched: Vec<i32> =
            sqlx::query_scalar("SELECT DISTINCT restaurant_id FROM reviews WHERE user_id = $1")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

        let deleted = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        for restaurant_id in touched {
            Self::refresh_average_rating(&mut tx, restaurant_id).await?;
        }

        tx.commit().await?;
        Ok(deleted)
    }

    async fn create_restaurant(&self, req: CreateRestaurantRequest) -> AppResult<Restaurant> {
        let sql = format!(
            "INSERT INTO restaurants (name, phone_number, address) \
             VALUES ($1, $2, $3) RETURNING {RESTAURANT_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Restaurant>(&sql)
            .bind(req.name)
            .bind(req.phone_number)
            .bind(req.address)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn list_restaurants(&self, skip: i64, take: i64) -> AppResult<(Vec<Restaurant>, i64)> {
        let sql =
            format!("SELECT {RESTAURANT_COLUMNS} FROM restaurants ORDER BY id LIMIT $1 OFFSET $2");
        let items = sqlx::query_as::<_, Restaurant>(&sql)
            .bind(take)
            .bind(skip)
            .fetch_all(&self.pool)
            .await?;
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM restaurants")
            .fetch_one(&self.pool)
            .await?;
        Ok((items, total))
    }

    async fn get_restaurant(&self, id: i32) -> AppResult<Option<Restaurant>> {
        let sql = format!("SELECT {RESTAURANT_COLUMNS} FROM restaurants WHERE id = $1");
        Ok(sqlx::query_as::<_, Restaurant>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_restaurant(
        &self,
        id: i32,
        req: UpdateRestaurantRequest,
    ) -> AppResult<Option<Restaurant>> {
        let sql = format!(
            r#"UPDATE restaurants SET
                 name = COALESCE($2, name),
                 phone_number = COALESCE($3, phone_number),
                 address = COALESCE($4, address)
               WHERE id = $1
               RETURNING {RESTAURANT_COLUMNS}"#
        );
        Ok(sqlx::query_as::<_, Restaurant>(&sql)
            .bind(id)
            .bind(req.name)
            .bind(req.phone_number)
            .bind(req.address)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_restaurant(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM restaurants WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_review(&self, req: CreateReviewRequest) -> AppResult<Review> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO reviews (rating, comment, restaurant_id, user_id) \
             VALUES ($1, $2, $3, $4) RETURNING {REVIEW_COLUMNS}"
        );
        let review = sqlx::query_as::<_, Review>(&sql)
            .bind(req.rating)
            .bind(req.comment)
            .bind(req.restaurant_id)
            .bind(req.user_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_write_error)?;

        Self::refresh_average_rating(&mut tx, review.restaurant_id).await?;
        tx.commit().await?;
        Ok(review)
    }

    async fn list_reviews(&self, skip: i64, take: i64) -> AppResult<(Vec<Review>, i64)> {
        let sql = format!("SELECT {REVIEW_COLUMNS} FROM reviews ORDER BY id LIMIT $1 OFFSET $2");
        let items = sqlx::query_as::<_, Review>(&sql)
            .bind(take)
            .bind(skip)
            .fetch_all(&self.pool)
            .await?;
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reviews")
            .fetch_one(&self.pool)
            .await?;
        Ok((items, total))
    }

    async fn list_reviews_for_restaurant(
        &self,
        restaurant_id: i32,
        skip: i64,
        take: i64,
    ) -> AppResult<(Vec<Review>, i64)> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE restaurant_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3"
        );
        let items = sqlx::query_as::<_, Review>(&sql)
            .bind(restaurant_id)
            .bind(take)
            .bind(skip)
            .fetch_all(&self.pool)
            .await?;
        let total =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reviews WHERE restaurant_id = $1")
                .bind(restaurant_id)
                .fetch_one(&self.pool)
                .await?;
        Ok((items, total))
    }

    async fn get_review(&self, id: i32) -> AppResult<Option<Review>> {
        let sql = format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1");
        Ok(sqlx::query_as::<_, Review>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_review(&self, id: i32, req: UpdateReviewRequest) -> AppResult<Option<Review>> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"UPDATE reviews SET
                 rating = COALESCE($2, rating),
                 comment = COALESCE($3, comment)
               WHERE id = $1
               RETURNING {REVIEW_COLUMNS}"#
        );
        let review = sqlx::query_as::<_, Review>(&sql)
            .bind(id)
            .bind(req.rating)
            .bind(req.comment)
            .fetch_optional(&mut *tx)
            .await?;

        if let Some(review) = &review {
            Self::refresh_average_rating(&mut tx, review.restaurant_id).await?;
        }
        tx.commit().await?;
        Ok(review)
    }

    async fn delete_review(&self, id: i32) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        let restaurant_id: Option<i32> =
            sqlx::query_scalar("DELETE FROM reviews WHERE id = $1 RETURNING restaurant_id")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        if let Some(restaurant_id) = restaurant_id {
            Self::refresh_average_rating(&mut tx, restaurant_id).await?;
        }
        tx.commit().await?;
        Ok(restaurant_id.is_some())
    }
}
