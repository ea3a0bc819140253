//! WeReserve reservation server
//!
//! # Overview
//!
//! Restaurant table booking over HTTP/JSON: accounts with roles, a table
//! inventory and reservations that never double-book a table.
//!
//! - **Store** (`db`): PostgreSQL via sqlx, or in-memory for development
//! - **Auth** (`auth`): Argon2 passwords, HS256 bearer tokens
//! - **Services** (`services`): table, user and reservation managers
//! - **Notifications** (`notify`): booking confirmations by email relay
//! - **HTTP API** (`api`): axum routes
//!
//! # Layout
//!
//! ```text
//! reserve-server/src/
//! ├── core/          # config, state, errors, server loop
//! ├── auth/          # tokens, passwords, principal extraction
//! ├── db/            # Store trait, PgStore, MemoryStore
//! ├── services/      # managers and input validation
//! ├── notify/        # confirmation sinks
//! ├── api/           # HTTP routes and handlers
//! └── utils/         # logging
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod notify;
pub mod services;
pub mod utils;

pub use auth::{AuthenticatedPrincipal, JwtService};
pub use core::{Config, Server, ServerState};
pub use db::{BookingPolicy, MemoryStore, PgStore, Store};
pub use services::{ReservationManager, TableManager, UserManager};
pub use shared::error::{ApiResponse, AppError, AppResult, ErrorCode};

pub use utils::logger::init_logger;

// Security events go to the "security" target
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}
