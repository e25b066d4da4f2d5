use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::{
    access::bearer_token,
    error::{AppError, AppResult},
    models::{Account, AccountView, NewAccount, Role, SessionPayload, SignupRequest},
    password::HasherState,
    repository::RepositoryState,
    token::{Claims, SessionSubject, TokenState},
};

/// AuthUser Extractor Result
///
/// The resolved identity of an authenticated request, taken from verified token claims.
/// Handlers use it to read the caller's id and role for ownership and admin checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i32,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&Claims> for AuthUser {
    fn from(claims: &Claims) -> Self {
        Self {
            id: claims.sub,
            username: claims.username.clone(),
            role: claims.role,
        }
    }
}

/// AuthUser Extractor Implementation
///
/// Routes behind `role_gate` or `self_gate` already carry verified claims in the request
/// extensions, and those are reused. Anywhere else the bearer token is verified here.
/// Sessions are stateless, so the store is not consulted.
///
/// Rejection: `AppError::Unauthenticated` (401).
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    TokenState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(claims) = parts.extensions.get::<Claims>() {
            return Ok(AuthUser::from(claims));
        }

        let tokens = TokenState::from_ref(state);
        let token = bearer_token(&parts.headers)?;
        let claims = tokens.verify(token)?;
        Ok(AuthUser::from(&claims))
    }
}

/// AuthService
///
/// Login and registration. Both are straight-line flows with no retries; a failure at any
/// step ends the request without writing anything.
#[derive(Clone)]
pub struct AuthService {
    repo: RepositoryState,
    hasher: HasherState,
    tokens: TokenState,
}

impl AuthService {
    pub fn new(repo: RepositoryState, hasher: HasherState, tokens: TokenState) -> Self {
        Self {
            repo,
            hasher,
            tokens,
        }
    }

    /// login
    ///
    /// Unknown username and wrong password both fail with `InvalidCredentials`.
    pub async fn login(&self, username: &str, password: &str) -> AppResult<SessionPayload> {
        let Some(account) = self.repo.find_account_by_username(username).await? else {
            tracing::debug!(username, "login rejected: unknown username");
            return Err(AppError::InvalidCredentials);
        };

        if !self.verify_password(password, &account.password_hash).await? {
            tracing::debug!(username, "login rejected: password mismatch");
            return Err(AppError::InvalidCredentials);
        }

        let issued = self.tokens.issue(&SessionSubject::from(&account))?;
        tracing::info!(sub = account.id, "session issued");

        Ok(SessionPayload {
            id: issued.claims.sub,
            username: issued.claims.username,
            role: issued.claims.role,
            access_token: issued.token,
            expires_at: issued.claims.exp,
        })
    }

    /// register
    ///
    /// Public signup. The new account always gets `Role::User`, and no token is issued;
    /// the caller logs in separately.
    pub async fn register(&self, req: SignupRequest) -> AppResult<AccountView> {
        let account = self
            .create_account(req.username, req.email, &req.password, Role::User)
            .await?;
        tracing::info!(id = account.id, "account registered");
        Ok(AccountView::from(account))
    }

    /// create_account
    ///
    /// Uniqueness check, hash, persist. The store's unique index backs up the check, so a
    /// concurrent duplicate still ends in `DuplicateAccount` and never in a second row.
    pub async fn create_account(
        &self,
        username: String,
        email: Option<String>,
        password: &str,
        role: Role,
    ) -> AppResult<Account> {
        if self.repo.find_account_by_username(&username).await?.is_some() {
            return Err(AppError::DuplicateAccount);
        }

        let password_hash = self.hash_password(password).await?;

        self.repo
            .create_account(NewAccount {
                username,
                email,
                password_hash,
                role,
            })
            .await
    }

    /// Bcrypt is CPU-bound, so hashing runs on the blocking pool.
    pub async fn hash_password(&self, password: &str) -> AppResult<String> {
        let hasher = self.hasher.clone();
        let password = password.to_owned();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))?
    }

    async fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool> {
        let hasher = self.hasher.clone();
        let password = password.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))?
    }
}
