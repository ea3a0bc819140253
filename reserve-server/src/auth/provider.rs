//! Authentication capability used by the managers

use shared::error::AppError;
use thiserror::Error;

use super::jwt::{AuthenticatedPrincipal, IssuedToken, JwtConfig, JwtError, JwtService};
use super::password::PasswordService;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error(transparent)]
    Token(#[from] JwtError),

    #[error("password hashing failed: {0}")]
    Hash(String),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Token(JwtError::ExpiredToken) => AppError::token_expired(),
            AuthError::Token(JwtError::GenerationFailed(msg)) => {
                tracing::error!(error = %msg, "Token generation failed");
                AppError::internal("Failed to issue token")
            }
            AuthError::Token(_) => AppError::invalid_token("Invalid token"),
            AuthError::Hash(msg) => {
                tracing::error!(error = %msg, "Password hashing failed");
                AppError::internal("Failed to process password")
            }
        }
    }
}

/// Password hashing and token issuance
///
/// Methods are synchronous and CPU-bound; callers on the async runtime
/// move hashing onto the blocking pool.
pub trait AuthProvider: Send + Sync {
    fn hash_password(&self, password: &str) -> Result<String, AuthError>;

    fn verify_password(&self, password: &str, hash: &str) -> bool;

    fn issue_token(&self, principal: &AuthenticatedPrincipal) -> Result<IssuedToken, AuthError>;

    fn validate_token(&self, token: &str) -> Result<AuthenticatedPrincipal, AuthError>;
}

/// argon2 passwords plus HS256 JWTs
#[derive(Debug, Clone)]
pub struct TokenAuthProvider {
    passwords: PasswordService,
    jwt: JwtService,
}

impl TokenAuthProvider {
    pub fn new(passwords: PasswordService, jwt_config: JwtConfig) -> Self {
        Self {
            passwords,
            jwt: JwtService::with_config(jwt_config),
        }
    }
}

impl AuthProvider for TokenAuthProvider {
    fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        self.passwords
            .hash_password(password)
            .map_err(|e| AuthError::Hash(e.to_string()))
    }

    fn verify_password(&self, password: &str, hash: &str) -> bool {
        self.passwords.verify_password(password, hash)
    }

    fn issue_token(&self, principal: &AuthenticatedPrincipal) -> Result<IssuedToken, AuthError> {
        Ok(self.jwt.generate_token(principal)?)
    }

    fn validate_token(&self, token: &str) -> Result<AuthenticatedPrincipal, AuthError> {
        let claims = self.jwt.validate_token(token)?;
        Ok(AuthenticatedPrincipal::try_from(claims)?)
    }
}
