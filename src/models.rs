use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use validator::Validate;

// --- Roles ---

/// Role
///
/// The RBAC field carried both on the stored account and inside every session token.
/// Stored as the Postgres enum `user_role`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Admin => f.write_str("admin"),
        }
    }
}

// --- Core Application Schemas (Mapped to Database) ---

/// Account
///
/// The full stored identity record from the `accounts` table, including the password hash.
/// Never serialized to clients; handlers return [`AccountView`] instead.
#[derive(Debug, Clone, FromRow, Default)]
pub struct Account {
    pub id: i32,
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub role: Role,
}

/// AccountView
///
/// Public-safe projection of an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AccountView {
    pub id: i32,
    pub username: String,
    pub email: Option<String>,
    pub role: Role,
}

impl From<Account> for AccountView {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            username: account.username,
            email: account.email,
            role: account.role,
        }
    }
}

/// NewAccount
///
/// Insert payload for the credential store. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub role: Role,
}

/// AccountChanges
///
/// Partial update for an account. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct AccountChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
}

/// Restaurant
///
/// A reviewed venue. `average_rating` is maintained by the repository whenever one of its
/// reviews changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Restaurant {
    pub id: i32,
    pub name: String,
    pub phone_number: String,
    pub address: String,
    pub average_rating: f64,
}

/// Review
///
/// A rating left by one account for one restaurant. The account owns the review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Review {
    pub id: i32,
    pub rating: f64,
    pub comment: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub restaurant_id: i32,
    pub user_id: i32,
}

// --- Request Payloads (Input Schemas) ---

/// LoginRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "username must not be empty"))]
    pub username: String,
    #[validate(length(min = 1, message = "password must not be empty"))]
    pub password: String,
}

/// SignupRequest
///
/// Public registration payload. Accounts created through signup always get `Role::User`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct SignupRequest {
    #[validate(length(min = 5, message = "username must be at least 5 characters"))]
    pub username: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: Option<String>,
    #[validate(length(min = 5, message = "password must be at least 5 characters"))]
    pub password: String,
}

/// CreateUserRequest
///
/// Admin-only account creation. Unlike signup, the role may be chosen.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[ts(export)]
pub struct CreateUserRequest {
    #[validate(length(min = 5, message = "username must be at least 5 characters"))]
    pub username: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: Option<String>,
    #[validate(length(min = 5, message = "password must be at least 5 characters"))]
    pub password: String,
    pub role: Option<Role>,
}

/// UpdateUserRequest
///
/// Partial update. A present password is re-hashed before it reaches the store.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[ts(export)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 5, message = "username must be at least 5 characters"))]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(email(message = "email must be a valid address"))]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 5, message = "password must be at least 5 characters"))]
    pub password: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// CreateRestaurantRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateRestaurantRequest {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[validate(length(min = 1, message = "phoneNumber must not be empty"))]
    pub phone_number: String,
    #[validate(length(min = 1, message = "address must not be empty"))]
    pub address: String,
}

/// UpdateRestaurantRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateRestaurantRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "phoneNumber must not be empty"))]
    pub phone_number: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "address must not be empty"))]
    pub address: Option<String>,
}

/// CreateReviewRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateReviewRequest {
    #[validate(range(min = 1.0, max = 5.0, message = "rating must be between 1 and 5"))]
    pub rating: f64,
    #[validate(length(min = 1, message = "comment must not be empty"))]
    pub comment: String,
    pub restaurant_id: i32,
    pub user_id: i32,
}

/// UpdateReviewRequest
///
/// Only the rating and the comment of a review can change; its owner and restaurant are fixed.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateReviewRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1.0, max = 5.0, message = "rating must be between 1 and 5"))]
    pub rating: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "comment must not be empty"))]
    pub comment: Option<String>,
}

// --- Session Schemas (Output) ---

/// SessionPayload
///
/// Returned by a successful login: the identity claims plus the signed token that carries them.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SessionPayload {
    pub id: i32,
    pub username: String,
    pub role: Role,
    pub access_token: String,
    /// Expiry as seconds since the Unix epoch.
    pub expires_at: u64,
}

/// LoginResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub payload: SessionPayload,
}
