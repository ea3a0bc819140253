//! Data models
//!
//! Shared between the reservation server and its clients (via API).
//! All IDs are `i64` (Postgres BIGSERIAL), all instants are UTC.

pub mod dining_table;
pub mod reservation;
pub mod role;
pub mod user;

// Re-exports
pub use dining_table::*;
pub use reservation::*;
pub use role::*;
pub use user::*;

use thiserror::Error;

/// A string did not name any variant of a closed enum
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind}: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
