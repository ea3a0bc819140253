//! Configuration, shared state and the server loop
//!
//! - [`Config`] - environment-driven settings
//! - [`ServerState`] - handles shared by every request
//! - [`Server`] - HTTP listener with graceful shutdown
//! - [`ServerError`] - startup failures

pub mod config;
pub mod error;
pub mod server;
pub mod state;

pub use config::Config;
pub use error::{Result, ServerError};
pub use server::Server;
pub use state::ServerState;
