//! PostgreSQL store
//!
//! Uniqueness (email, table name, table slot) is enforced by constraints, so
//! the insert itself is the arbiter. Booking additionally locks the table row
//! with `FOR UPDATE` so the policy check and the status write see the same
//! state. Table rows are always locked before reservation rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::models::{
    DiningTable, Reservation, ReservationDetail, Role, TableStatus, User, UserResponse,
};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgConnection, PgPool};

use super::{
    BookingPolicy, Entity, NewReservation, NewTable, NewUser, RepoError, RepoResult,
    ReservationChanges, Store, TableChanges, UserChanges,
};

/// Retries when a reservation changes table between read and lock
const RELOCK_ATTEMPTS: usize = 3;

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            let constraint = db.constraint().unwrap_or("unnamed constraint").to_string();
            if db.is_unique_violation() {
                return RepoError::Duplicate(constraint);
            }
            if db.is_foreign_key_violation() {
                return RepoError::Conflict(format!("still referenced ({constraint})"));
            }
        }
        RepoError::Database(err.to_string())
    }
}

fn corrupt(what: &str, err: impl std::fmt::Display) -> RepoError {
    RepoError::Database(format!("corrupt {what} column: {err}"))
}

// ── Rows ──

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepoError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role.parse().map_err(|e| corrupt("role", e))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TableRow {
    id: i64,
    name: String,
    capacity: i32,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TableRow> for DiningTable {
    type Error = RepoError;

    fn try_from(row: TableRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            name: row.name,
            capacity: row.capacity,
            status: row.status.parse().map_err(|e| corrupt("status", e))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ReservationRow {
    id: i64,
    user_id: i64,
    table_id: i64,
    reservation_datetime: DateTime<Utc>,
    number_of_people: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ReservationRow> for Reservation {
    fn from(row: ReservationRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            table_id: row.table_id,
            reservation_datetime: row.reservation_datetime,
            number_of_people: row.number_of_people,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct DetailRow {
    #[sqlx(flatten)]
    reservation: ReservationRow,
    user_name: String,
    user_email: String,
    user_role: String,
    user_created_at: DateTime<Utc>,
    user_updated_at: DateTime<Utc>,
    table_name: String,
    table_capacity: i32,
    table_status: String,
    table_created_at: DateTime<Utc>,
    table_updated_at: DateTime<Utc>,
}

impl TryFrom<DetailRow> for ReservationDetail {
    type Error = RepoError;

    fn try_from(row: DetailRow) -> Result<Self, Self::Error> {
        let reservation = Reservation::from(row.reservation);
        Ok(Self {
            user: UserResponse {
                id: reservation.user_id,
                name: row.user_name,
                email: row.user_email,
                role: row.user_role.parse::<Role>().map_err(|e| corrupt("role", e))?,
                created_at: row.user_created_at,
                updated_at: row.user_updated_at,
            },
            table: DiningTable {
                id: reservation.table_id,
                name: row.table_name,
                capacity: row.table_capacity,
                status: row
                    .table_status
                    .parse::<TableStatus>()
                    .map_err(|e| corrupt("status", e))?,
                created_at: row.table_created_at,
                updated_at: row.table_updated_at,
            },
            reservation,
        })
    }
}

const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at, updated_at";
const TABLE_COLUMNS: &str = "id, name, capacity, status, created_at, updated_at";
const RESERVATION_COLUMNS: &str =
    "id, user_id, table_id, reservation_datetime, number_of_people, created_at, updated_at";
const DETAIL_SELECT: &str = r#"
    SELECT r.id, r.user_id, r.table_id, r.reservation_datetime, r.number_of_people,
           r.created_at, r.updated_at,
           u.name AS user_name, u.email AS user_email, u.role AS user_role,
           u.created_at AS user_created_at, u.updated_at AS user_updated_at,
           t.name AS table_name, t.capacity AS table_capacity, t.status AS table_status,
           t.created_at AS table_created_at, t.updated_at AS table_updated_at
    FROM reservations r
    JOIN users u ON u.id = r.user_id
    JOIN dining_tables t ON t.id = r.table_id
"#;

fn admit(table: &TableRow, policy: BookingPolicy) -> RepoResult<()> {
    if policy == BookingPolicy::SingleBooking && table.status == TableStatus::Reserved.as_str() {
        return Err(RepoError::TableUnavailable(table.id));
    }
    Ok(())
}

async fn mark_reserved(conn: &mut PgConnection, table_id: i64) -> RepoResult<()> {
    sqlx::query("UPDATE dining_tables SET status = 'reserved', updated_at = $2 WHERE id = $1")
        .bind(table_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Back to `available` once a reserved table has no reservation left
async fn release_if_unreferenced(conn: &mut PgConnection, table_id: i64) -> RepoResult<()> {
    sqlx::query(
        r#"
        UPDATE dining_tables SET status = 'available', updated_at = $2
        WHERE id = $1
          AND status = 'reserved'
          AND NOT EXISTS (SELECT 1 FROM reservations WHERE table_id = $1)
        "#,
    )
    .bind(table_id)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Table of a reservation, read without a lock
async fn reservation_table(conn: &mut PgConnection, id: i64) -> RepoResult<i64> {
    sqlx::query_scalar("SELECT table_id FROM reservations WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(RepoError::NotFound(Entity::Reservation))
}

/// Row-lock tables in ascending id order
///
/// Every write path locks tables before any reservation row, so two
/// transactions never wait on each other in opposite orders.
async fn lock_tables(conn: &mut PgConnection, ids: &[i64]) -> RepoResult<Vec<TableRow>> {
    let rows: Vec<TableRow> = sqlx::query_as(&format!(
        "SELECT {TABLE_COLUMNS} FROM dining_tables WHERE id = ANY($1) ORDER BY id FOR UPDATE"
    ))
    .bind(ids)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

/// sqlx-backed store
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and apply embedded migrations
    pub async fn connect(database_url: &str, max_connections: u32) -> RepoResult<Self> {
        let options: PgConnectOptions = database_url.parse()?;
        Self::connect_with(options, max_connections).await
    }

    pub async fn connect_with(options: PgConnectOptions, max_connections: u32) -> RepoResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;
        tracing::info!(max_connections, "Connected to PostgreSQL");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| RepoError::Database(format!("migration failed: {e}")))?;
        tracing::info!("Database migrations applied");

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// One reschedule attempt, `None` when the reservation changed table
    /// between the unlocked read and the row lock.
    async fn try_reschedule(
        &self,
        id: i64,
        changes: &ReservationChanges,
        policy: BookingPolicy,
    ) -> RepoResult<Option<ReservationRow>> {
        let mut tx = self.pool.begin().await?;

        let seen_table = reservation_table(&mut tx, id).await?;
        let table_id = changes.table_id.unwrap_or(seen_table);
        let moved = table_id != seen_table;

        let mut ids = vec![seen_table, table_id];
        ids.sort_unstable();
        ids.dedup();
        let locked = lock_tables(&mut tx, &ids).await?;

        let current: ReservationRow = sqlx::query_as(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepoError::NotFound(Entity::Reservation))?;
        if current.table_id != seen_table {
            tx.rollback().await?;
            return Ok(None);
        }

        if moved {
            let target = locked
                .iter()
                .find(|t| t.id == table_id)
                .ok_or(RepoError::NotFound(Entity::Table))?;
            admit(target, policy)?;
        }

        let row: ReservationRow = sqlx::query_as(&format!(
            "UPDATE reservations SET \
                table_id = $2, reservation_datetime = $3, number_of_people = $4, updated_at = $5 \
             WHERE id = $1 RETURNING {RESERVATION_COLUMNS}"
        ))
        .bind(id)
        .bind(table_id)
        .bind(
            changes
                .reservation_datetime
                .unwrap_or(current.reservation_datetime),
        )
        .bind(changes.number_of_people.unwrap_or(current.number_of_people))
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        if moved {
            mark_reserved(&mut tx, table_id).await?;
            release_if_unreferenced(&mut tx, seen_table).await?;
        }
        tx.commit().await?;

        Ok(Some(row))
    }

    /// One cancel attempt, `None` when the reservation changed table before
    /// its table was locked.
    async fn try_cancel(&self, id: i64) -> RepoResult<Option<ReservationRow>> {
        let mut tx = self.pool.begin().await?;

        let seen_table = reservation_table(&mut tx, id).await?;
        lock_tables(&mut tx, &[seen_table]).await?;

        let row: ReservationRow = sqlx::query_as(&format!(
            "DELETE FROM reservations WHERE id = $1 RETURNING {RESERVATION_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepoError::NotFound(Entity::Reservation))?;
        if row.table_id != seen_table {
            tx.rollback().await?;
            return Ok(None);
        }

        release_if_unreferenced(&mut tx, seen_table).await?;
        tx.commit().await?;

        Ok(Some(row))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, new: NewUser) -> RepoResult<User> {
        let now = Utc::now();
        let row: UserRow = sqlx::query_as(&format!(
            "INSERT INTO users (name, email, password_hash, role, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $5) RETURNING {USER_COLUMNS}"
        ))
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.role.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn find_user(&self, id: i64) -> RepoResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        row.map(User::try_from).transpose()
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        let rows: Vec<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(User::try_from).collect()
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> RepoResult<User> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "UPDATE users SET \
                name = COALESCE($2, name), \
                email = COALESCE($3, email), \
                password_hash = COALESCE($4, password_hash), \
                role = COALESCE($5, role), \
                updated_at = $6 \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.name)
        .bind(changes.email)
        .bind(changes.password_hash)
        .bind(changes.role.map(|r| r.as_str()))
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;
        row.ok_or(RepoError::NotFound(Entity::User))?.try_into()
    }

    async fn delete_user(&self, id: i64) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound(Entity::User));
        }
        Ok(())
    }

    async fn insert_table(&self, new: NewTable) -> RepoResult<DiningTable> {
        let row: TableRow = sqlx::query_as(&format!(
            "INSERT INTO dining_tables (name, capacity, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $4) RETURNING {TABLE_COLUMNS}"
        ))
        .bind(&new.name)
        .bind(new.capacity)
        .bind(new.status.as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn find_table(&self, id: i64) -> RepoResult<Option<DiningTable>> {
        let row: Option<TableRow> = sqlx::query_as(&format!(
            "SELECT {TABLE_COLUMNS} FROM dining_tables WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(DiningTable::try_from).transpose()
    }

    async fn list_tables(&self, status: Option<TableStatus>) -> RepoResult<Vec<DiningTable>> {
        let rows: Vec<TableRow> = sqlx::query_as(&format!(
            "SELECT {TABLE_COLUMNS} FROM dining_tables \
             WHERE ($1::text IS NULL OR status = $1) ORDER BY id"
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(DiningTable::try_from).collect()
    }

    async fn update_table(&self, id: i64, changes: TableChanges) -> RepoResult<DiningTable> {
        let row: Option<TableRow> = sqlx::query_as(&format!(
            "UPDATE dining_tables SET \
                name = COALESCE($2, name), \
                capacity = COALESCE($3, capacity), \
                status = COALESCE($4, status), \
                updated_at = $5 \
             WHERE id = $1 RETURNING {TABLE_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.name)
        .bind(changes.capacity)
        .bind(changes.status.map(|s| s.as_str()))
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;
        row.ok_or(RepoError::NotFound(Entity::Table))?.try_into()
    }

    async fn delete_table(&self, id: i64) -> RepoResult<()> {
        let result = sqlx::query("DELETE FROM dining_tables WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound(Entity::Table));
        }
        Ok(())
    }

    async fn book_reservation(
        &self,
        new: NewReservation,
        policy: BookingPolicy,
    ) -> RepoResult<Reservation> {
        let mut tx = self.pool.begin().await?;

        let user: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = $1")
            .bind(new.user_id)
            .fetch_optional(&mut *tx)
            .await?;
        if user.is_none() {
            return Err(RepoError::NotFound(Entity::User));
        }

        let table: TableRow = sqlx::query_as(&format!(
            "SELECT {TABLE_COLUMNS} FROM dining_tables WHERE id = $1 FOR UPDATE"
        ))
        .bind(new.table_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepoError::NotFound(Entity::Table))?;
        admit(&table, policy)?;

        let now = Utc::now();
        let row: ReservationRow = sqlx::query_as(&format!(
            "INSERT INTO reservations \
                (user_id, table_id, reservation_datetime, number_of_people, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $5) RETURNING {RESERVATION_COLUMNS}"
        ))
        .bind(new.user_id)
        .bind(new.table_id)
        .bind(new.reservation_datetime)
        .bind(new.number_of_people)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        mark_reserved(&mut tx, new.table_id).await?;
        tx.commit().await?;

        Ok(row.into())
    }

    async fn reschedule_reservation(
        &self,
        id: i64,
        changes: ReservationChanges,
        policy: BookingPolicy,
    ) -> RepoResult<Reservation> {
        for _ in 0..RELOCK_ATTEMPTS {
            if let Some(row) = self.try_reschedule(id, &changes, policy).await? {
                return Ok(row.into());
            }
            tracing::debug!(reservation_id = id, "Reservation changed table mid-reschedule, retrying");
        }
        Err(RepoError::Database(format!(
            "reservation {id} kept changing table during reschedule"
        )))
    }

    async fn cancel_reservation(&self, id: i64) -> RepoResult<Reservation> {
        for _ in 0..RELOCK_ATTEMPTS {
            if let Some(row) = self.try_cancel(id).await? {
                return Ok(row.into());
            }
            tracing::debug!(reservation_id = id, "Reservation changed table mid-cancel, retrying");
        }
        Err(RepoError::Database(format!(
            "reservation {id} kept changing table during cancel"
        )))
    }

    async fn find_reservation(&self, id: i64) -> RepoResult<Option<ReservationDetail>> {
        let row: Option<DetailRow> = sqlx::query_as(&format!("{DETAIL_SELECT} WHERE r.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(ReservationDetail::try_from).transpose()
    }

    async fn list_reservations(
        &self,
        user_id: Option<i64>,
    ) -> RepoResult<Vec<ReservationDetail>> {
        let rows: Vec<DetailRow> = sqlx::query_as(&format!(
            "{DETAIL_SELECT} WHERE ($1::bigint IS NULL OR r.user_id = $1) \
             ORDER BY r.reservation_datetime, r.id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(ReservationDetail::try_from).collect()
    }

    async fn ping(&self) -> RepoResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
