//! Authentication and authorization
//!
//! - [`AuthProvider`] - password hashing and token issuance
//! - [`AuthenticatedPrincipal`] - the caller's typed identity
//! - [`require_auth`] / [`require_admin`] - route-group gates

pub mod extractor;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod provider;

pub use jwt::{
    AuthenticatedPrincipal, Claims, IssuedToken, JwtConfig, JwtError, JwtService,
    generate_printable_secret,
};
pub use middleware::{require_admin, require_auth};
pub use password::PasswordService;
pub use provider::{AuthError, AuthProvider, TokenAuthProvider};
