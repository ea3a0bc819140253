//! Persistence layer
//!
//! [`Store`] is the only way managers touch data. Each method is atomic on
//! its own; the booking methods run check, insert and table status update
//! as one unit so concurrent callers cannot both win a slot.
//!
//! - [`PgStore`] - PostgreSQL via sqlx, constraint and row-lock based
//! - [`MemoryStore`] - single-mutex store for development and tests

pub mod memory;
pub mod postgres;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::error::{AppError, ErrorCode};
use shared::models::{DiningTable, Reservation, ReservationDetail, Role, TableStatus, User};
use thiserror::Error;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Entity kinds, for not-found reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    User,
    Table,
    Reservation,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::User => "user",
            Self::Table => "table",
            Self::Reservation => "reservation",
        })
    }
}

/// Store errors
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{0} not found")]
    NotFound(Entity),

    /// A unique key rejected the write
    #[error("duplicate {0}")]
    Duplicate(String),

    /// A foreign key refused the write
    #[error("conflict: {0}")]
    Conflict(String),

    /// The booking policy turned the table away
    #[error("table {0} is already reserved")]
    TableUnavailable(i64),

    #[error("database error: {0}")]
    Database(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(Entity::User) => AppError::new(ErrorCode::UserNotFound),
            RepoError::NotFound(Entity::Table) => AppError::new(ErrorCode::TableNotFound),
            RepoError::NotFound(Entity::Reservation) => {
                AppError::new(ErrorCode::ReservationNotFound)
            }
            RepoError::Duplicate(what) => AppError::conflict(format!("duplicate {what}")),
            RepoError::Conflict(msg) => AppError::conflict(msg),
            RepoError::TableUnavailable(_) => AppError::new(ErrorCode::TableAlreadyReserved),
            RepoError::Database(msg) => {
                tracing::error!(error = %msg, "Store operation failed");
                AppError::database("Database operation failed")
            }
        }
    }
}

/// How a booking interacts with the table's current status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BookingPolicy {
    /// Conflicts are per (table, instant); a table may hold many future
    /// reservations at different instants.
    #[default]
    ExactSlot,
    /// A table whose status is `reserved` accepts no further booking.
    SingleBooking,
}

impl BookingPolicy {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ExactSlot => "exact_slot",
            Self::SingleBooking => "single_booking",
        }
    }
}

impl FromStr for BookingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "exact_slot" => Ok(Self::ExactSlot),
            "single_booking" => Ok(Self::SingleBooking),
            other => Err(format!("unknown BOOKING_POLICY: {other}")),
        }
    }
}

// ── Write payloads ──

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Clone)]
pub struct NewTable {
    pub name: String,
    pub capacity: i32,
    pub status: TableStatus,
}

#[derive(Debug, Clone, Default)]
pub struct TableChanges {
    pub name: Option<String>,
    pub capacity: Option<i32>,
    pub status: Option<TableStatus>,
}

#[derive(Debug, Clone)]
pub struct NewReservation {
    pub user_id: i64,
    pub table_id: i64,
    pub reservation_datetime: DateTime<Utc>,
    pub number_of_people: i32,
}

#[derive(Debug, Clone, Default)]
pub struct ReservationChanges {
    pub table_id: Option<i64>,
    pub reservation_datetime: Option<DateTime<Utc>>,
    pub number_of_people: Option<i32>,
}

/// Persistence contract
#[async_trait]
pub trait Store: Send + Sync {
    // ── Users ──

    /// `Duplicate` when the email is taken
    async fn insert_user(&self, new: NewUser) -> RepoResult<User>;
    async fn find_user(&self, id: i64) -> RepoResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    async fn list_users(&self) -> RepoResult<Vec<User>>;
    async fn update_user(&self, id: i64, changes: UserChanges) -> RepoResult<User>;
    /// `Conflict` while the user owns reservations
    async fn delete_user(&self, id: i64) -> RepoResult<()>;

    // ── Tables ──

    /// `Duplicate` when the name is taken
    async fn insert_table(&self, new: NewTable) -> RepoResult<DiningTable>;
    async fn find_table(&self, id: i64) -> RepoResult<Option<DiningTable>>;
    async fn list_tables(&self, status: Option<TableStatus>) -> RepoResult<Vec<DiningTable>>;
    async fn update_table(&self, id: i64, changes: TableChanges) -> RepoResult<DiningTable>;
    /// `Conflict` while reservations reference the table
    async fn delete_table(&self, id: i64) -> RepoResult<()>;

    // ── Reservations ──

    /// Insert a reservation and mark its table `reserved`.
    ///
    /// `NotFound` for a missing user or table, `TableUnavailable` when the
    /// policy refuses a reserved table, `Duplicate` when the slot is taken.
    async fn book_reservation(
        &self,
        new: NewReservation,
        policy: BookingPolicy,
    ) -> RepoResult<Reservation>;

    /// Apply changes, excluding the reservation itself from the slot check.
    ///
    /// Moving to another table reserves the new one and releases the old one.
    async fn reschedule_reservation(
        &self,
        id: i64,
        changes: ReservationChanges,
        policy: BookingPolicy,
    ) -> RepoResult<Reservation>;

    /// Delete a reservation and release its table once nothing references it.
    async fn cancel_reservation(&self, id: i64) -> RepoResult<Reservation>;

    async fn find_reservation(&self, id: i64) -> RepoResult<Option<ReservationDetail>>;

    /// All reservations, or one user's, ordered by reservation time
    async fn list_reservations(&self, user_id: Option<i64>)
    -> RepoResult<Vec<ReservationDetail>>;

    /// Connectivity check for the health route
    async fn ping(&self) -> RepoResult<()>;
}
