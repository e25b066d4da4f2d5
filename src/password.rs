use std::sync::Arc;

use crate::error::AppError;

/// PasswordHasher
///
/// One-way hash plus verify. Implementations must compare in constant time; the handlers
/// only ever see the resulting hash string.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, AppError>;
    fn verify(&self, password: &str, hash: &str) -> Result<bool, AppError>;
}

pub type HasherState = Arc<dyn PasswordHasher>;

/// BcryptHasher
///
/// Production hasher. The cost is read from `AppConfig::bcrypt_cost`; tests use the
/// bcrypt minimum of 4 to keep them fast.
#[derive(Clone, Debug)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, password: &str) -> Result<String, AppError> {
        Ok(bcrypt::hash(password, self.cost)?)
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        // A stored value that is not a well-formed bcrypt hash can never match.
        Ok(bcrypt::verify(password, hash).unwrap_or(false))
    }
}
