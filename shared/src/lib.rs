//! Shared types for the reservation service
//!
//! Error codes, the HTTP envelopes and the domain models used by the
//! server and by anything that talks to its API.

pub mod error;
pub mod models;

// Re-exports
pub use error::{ApiResponse, AppError, AppResult, ErrorBody, ErrorCode};
pub use http;
pub use serde::{Deserialize, Serialize};
