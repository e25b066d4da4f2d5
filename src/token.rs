use std::{sync::Arc, time::Duration};

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
    get_current_timestamp,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    config::AppConfig,
    error::AppError,
    models::{Account, Role},
};

/// Claims
///
/// The signed payload of a session token. Validity is fully self-contained: a claim set is
/// trusted only if its HS256 signature recomputes under the server key and `exp` is still
/// in the future.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the account id. Carried as a decimal string on the wire, as JWT expects.
    #[serde(with = "subject_id")]
    pub sub: i32,
    pub username: String,
    pub role: Role,
    /// Issued At (iat), seconds since the Unix epoch.
    pub iat: u64,
    /// Expiration Time (exp), seconds since the Unix epoch.
    pub exp: u64,
}

/// SessionSubject
///
/// The identity a token is issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSubject {
    pub id: i32,
    pub username: String,
    pub role: Role,
}

impl From<&Account> for SessionSubject {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            role: account.role,
        }
    }
}

/// IssuedToken
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("token is invalid")]
    Invalid,
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AppError::Unauthenticated("Token has expired".to_string()),
            TokenError::Invalid => AppError::Unauthenticated("Invalid token".to_string()),
        }
    }
}

/// TokenState
///
/// Shared handle to the token service, held in `AppState` and in the middleware gates.
pub type TokenState = Arc<TokenService>;

/// TokenService
///
/// Issues and verifies HS256 session tokens. Holds the process-wide signing key, which is
/// read-only after construction, so the service is shared behind an `Arc` without locking.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    /// new
    ///
    /// Fails with `Configuration` for an empty or whitespace-only key.
    pub fn new(secret: &str, ttl: Duration) -> Result<Self, AppError> {
        if secret.trim().is_empty() {
            return Err(AppError::Configuration(
                "token signing key must not be empty".to_string(),
            ));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        Self::new(&config.jwt_secret, config.token_ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issues a token for `subject`, valid from now for the configured TTL.
    pub fn issue(&self, subject: &SessionSubject) -> Result<IssuedToken, AppError> {
        self.issue_at(subject, get_current_timestamp())
    }

    /// Issues a token as if the current time were `issued_at`. Identical subjects and
    /// timestamps always produce byte-identical tokens.
    pub fn issue_at(
        &self,
        subject: &SessionSubject,
        issued_at: u64,
    ) -> Result<IssuedToken, AppError> {
        let claims = Claims {
            sub: subject.id,
            username: subject.username.clone(),
            role: subject.role,
            iat: issued_at,
            exp: issued_at.saturating_add(self.ttl.as_secs()),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("failed to sign token: {e}")))?;

        Ok(IssuedToken { token, claims })
    }

    /// Validates signature, structure and expiry. Never returns claims it has not verified.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;

        // The library accepts exp == now; a session is only valid strictly before its expiry.
        if data.claims.exp <= get_current_timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }
}

mod subject_id {
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(id: &i32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&id.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<i32>().map_err(de::Error::custom)
    }
}
