//! In-memory store
//!
//! Every collection sits behind one mutex, so each trait method observes and
//! mutates a consistent snapshot. No lock is held across an await point.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use shared::models::{
    DiningTable, Reservation, ReservationDetail, TableStatus, User, UserResponse,
};

use super::{
    BookingPolicy, Entity, NewReservation, NewTable, NewUser, RepoError, RepoResult,
    ReservationChanges, Store, TableChanges, UserChanges,
};

#[derive(Debug, Default)]
struct Inner {
    users: BTreeMap<i64, User>,
    tables: BTreeMap<i64, DiningTable>,
    reservations: BTreeMap<i64, Reservation>,
    last_user_id: i64,
    last_table_id: i64,
    last_reservation_id: i64,
}

impl Inner {
    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }

    fn table_name_taken(&self, name: &str, except: Option<i64>) -> bool {
        self.tables
            .values()
            .any(|t| t.name == name && Some(t.id) != except)
    }

    fn slot_taken(&self, table_id: i64, at: chrono::DateTime<Utc>, except: Option<i64>) -> bool {
        self.reservations.values().any(|r| {
            r.table_id == table_id && r.reservation_datetime == at && Some(r.id) != except
        })
    }

    fn table_referenced(&self, table_id: i64) -> bool {
        self.reservations.values().any(|r| r.table_id == table_id)
    }

    fn table_mut(&mut self, id: i64) -> RepoResult<&mut DiningTable> {
        self.tables
            .get_mut(&id)
            .ok_or(RepoError::NotFound(Entity::Table))
    }

    fn admit(&self, table: &DiningTable, policy: BookingPolicy) -> RepoResult<()> {
        if policy == BookingPolicy::SingleBooking && table.status == TableStatus::Reserved {
            return Err(RepoError::TableUnavailable(table.id));
        }
        Ok(())
    }

    fn mark_reserved(&mut self, table_id: i64) -> RepoResult<()> {
        let table = self.table_mut(table_id)?;
        table.status = TableStatus::Reserved;
        table.updated_at = Utc::now();
        Ok(())
    }

    /// Back to `available` once a reserved table has no reservation left
    fn release_if_unreferenced(&mut self, table_id: i64) {
        if self.table_referenced(table_id) {
            return;
        }
        if let Some(table) = self.tables.get_mut(&table_id)
            && table.status == TableStatus::Reserved
        {
            table.status = TableStatus::Available;
            table.updated_at = Utc::now();
        }
    }

    fn detail(&self, reservation: &Reservation) -> RepoResult<ReservationDetail> {
        let user = self
            .users
            .get(&reservation.user_id)
            .ok_or(RepoError::NotFound(Entity::User))?;
        let table = self
            .tables
            .get(&reservation.table_id)
            .ok_or(RepoError::NotFound(Entity::Table))?;
        Ok(ReservationDetail {
            reservation: reservation.clone(),
            user: UserResponse::from(user),
            table: table.clone(),
        })
    }
}

/// Single-process store used by `STORE_BACKEND=memory` and the tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, new: NewUser) -> RepoResult<User> {
        let mut inner = self.inner.lock();
        if inner.email_taken(&new.email, None) {
            return Err(RepoError::Duplicate(format!("email {}", new.email)));
        }

        inner.last_user_id += 1;
        let now = Utc::now();
        let user = User {
            id: inner.last_user_id,
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            role: new.role,
            created_at: now,
            updated_at: now,
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: i64) -> RepoResult<Option<User>> {
        Ok(self.inner.lock().users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let inner = self.inner.lock();
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        Ok(self.inner.lock().users.values().cloned().collect())
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> RepoResult<User> {
        let mut inner = self.inner.lock();
        if !inner.users.contains_key(&id) {
            return Err(RepoError::NotFound(Entity::User));
        }
        if let Some(email) = &changes.email
            && inner.email_taken(email, Some(id))
        {
            return Err(RepoError::Duplicate(format!("email {email}")));
        }

        let user = inner
            .users
            .get_mut(&id)
            .ok_or(RepoError::NotFound(Entity::User))?;
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn delete_user(&self, id: i64) -> RepoResult<()> {
        let mut inner = self.inner.lock();
        if !inner.users.contains_key(&id) {
            return Err(RepoError::NotFound(Entity::User));
        }
        if inner.reservations.values().any(|r| r.user_id == id) {
            return Err(RepoError::Conflict(format!("user {id} still has reservations")));
        }
        inner.users.remove(&id);
        Ok(())
    }

    async fn insert_table(&self, new: NewTable) -> RepoResult<DiningTable> {
        let mut inner = self.inner.lock();
        if inner.table_name_taken(&new.name, None) {
            return Err(RepoError::Duplicate(format!("table name {}", new.name)));
        }

        inner.last_table_id += 1;
        let now = Utc::now();
        let table = DiningTable {
            id: inner.last_table_id,
            name: new.name,
            capacity: new.capacity,
            status: new.status,
            created_at: now,
            updated_at: now,
        };
        inner.tables.insert(table.id, table.clone());
        Ok(table)
    }

    async fn find_table(&self, id: i64) -> RepoResult<Option<DiningTable>> {
        Ok(self.inner.lock().tables.get(&id).cloned())
    }

    async fn list_tables(&self, status: Option<TableStatus>) -> RepoResult<Vec<DiningTable>> {
        let inner = self.inner.lock();
        Ok(inner
            .tables
            .values()
            .filter(|t| status.is_none_or(|s| t.status == s))
            .cloned()
            .collect())
    }

    async fn update_table(&self, id: i64, changes: TableChanges) -> RepoResult<DiningTable> {
        let mut inner = self.inner.lock();
        if !inner.tables.contains_key(&id) {
            return Err(RepoError::NotFound(Entity::Table));
        }
        if let Some(name) = &changes.name
            && inner.table_name_taken(name, Some(id))
        {
            return Err(RepoError::Duplicate(format!("table name {name}")));
        }

        let table = inner.table_mut(id)?;
        if let Some(name) = changes.name {
            table.name = name;
        }
        if let Some(capacity) = changes.capacity {
            table.capacity = capacity;
        }
        if let Some(status) = changes.status {
            table.status = status;
        }
        table.updated_at = Utc::now();
        Ok(table.clone())
    }

    async fn delete_table(&self, id: i64) -> RepoResult<()> {
        let mut inner = self.inner.lock();
        if !inner.tables.contains_key(&id) {
            return Err(RepoError::NotFound(Entity::Table));
        }
        if inner.table_referenced(id) {
            return Err(RepoError::Conflict(format!("table {id} still has reservations")));
        }
        inner.tables.remove(&id);
        Ok(())
    }

    async fn book_reservation(
        &self,
        new: NewReservation,
        policy: BookingPolicy,
    ) -> RepoResult<Reservation> {
        let mut inner = self.inner.lock();
        if !inner.users.contains_key(&new.user_id) {
            return Err(RepoError::NotFound(Entity::User));
        }
        let table = inner
            .tables
            .get(&new.table_id)
            .ok_or(RepoError::NotFound(Entity::Table))?;
        inner.admit(table, policy)?;
        if inner.slot_taken(new.table_id, new.reservation_datetime, None) {
            return Err(RepoError::Duplicate(format!(
                "reservation slot for table {} at {}",
                new.table_id, new.reservation_datetime
            )));
        }

        inner.last_reservation_id += 1;
        let now = Utc::now();
        let reservation = Reservation {
            id: inner.last_reservation_id,
            user_id: new.user_id,
            table_id: new.table_id,
            reservation_datetime: new.reservation_datetime,
            number_of_people: new.number_of_people,
            created_at: now,
            updated_at: now,
        };
        inner.reservations.insert(reservation.id, reservation.clone());
        inner.mark_reserved(reservation.table_id)?;
        Ok(reservation)
    }

    async fn reschedule_reservation(
        &self,
        id: i64,
        changes: ReservationChanges,
        policy: BookingPolicy,
    ) -> RepoResult<Reservation> {
        let mut inner = self.inner.lock();
        let current = inner
            .reservations
            .get(&id)
            .cloned()
            .ok_or(RepoError::NotFound(Entity::Reservation))?;

        let table_id = changes.table_id.unwrap_or(current.table_id);
        let at = changes
            .reservation_datetime
            .unwrap_or(current.reservation_datetime);
        let moved = table_id != current.table_id;

        if moved {
            let target = inner
                .tables
                .get(&table_id)
                .ok_or(RepoError::NotFound(Entity::Table))?;
            inner.admit(target, policy)?;
        }
        if inner.slot_taken(table_id, at, Some(id)) {
            return Err(RepoError::Duplicate(format!(
                "reservation slot for table {table_id} at {at}"
            )));
        }

        let updated = Reservation {
            table_id,
            reservation_datetime: at,
            number_of_people: changes.number_of_people.unwrap_or(current.number_of_people),
            updated_at: Utc::now(),
            ..current
        };
        inner.reservations.insert(id, updated.clone());

        if moved {
            inner.mark_reserved(table_id)?;
            inner.release_if_unreferenced(current.table_id);
        }
        Ok(updated)
    }

    async fn cancel_reservation(&self, id: i64) -> RepoResult<Reservation> {
        let mut inner = self.inner.lock();
        let removed = inner
            .reservations
            .remove(&id)
            .ok_or(RepoError::NotFound(Entity::Reservation))?;
        inner.release_if_unreferenced(removed.table_id);
        Ok(removed)
    }

    async fn find_reservation(&self, id: i64) -> RepoResult<Option<ReservationDetail>> {
        let inner = self.inner.lock();
        inner
            .reservations
            .get(&id)
            .map(|r| inner.detail(r))
            .transpose()
    }

    async fn list_reservations(
        &self,
        user_id: Option<i64>,
    ) -> RepoResult<Vec<ReservationDetail>> {
        let inner = self.inner.lock();
        let mut selected: Vec<&Reservation> = inner
            .reservations
            .values()
            .filter(|r| user_id.is_none_or(|uid| r.user_id == uid))
            .collect();
        selected.sort_by_key(|r| (r.reservation_datetime, r.id));
        selected.into_iter().map(|r| inner.detail(r)).collect()
    }

    async fn ping(&self) -> RepoResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use shared::models::Role;

    async fn seeded() -> (MemoryStore, User, DiningTable) {
        let store = MemoryStore::new();
        let user = store
            .insert_user(NewUser {
                name: "alice".into(),
                email: "alice@example.com".into(),
                password_hash: "hash".into(),
                role: Role::Customer,
            })
            .await
            .unwrap();
        let table = store
            .insert_table(NewTable {
                name: "T1".into(),
                capacity: 4,
                status: TableStatus::Available,
            })
            .await
            .unwrap();
        (store, user, table)
    }

    fn at(hour: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap()
    }

    fn booking(user: &User, table: &DiningTable, hour: u32) -> NewReservation {
        NewReservation {
            user_id: user.id,
            table_id: table.id,
            reservation_datetime: at(hour),
            number_of_people: 2,
        }
    }

    #[tokio::test]
    async fn test_unique_email_and_table_name() {
        let (store, _, _) = seeded().await;

        let dup = store
            .insert_user(NewUser {
                name: "other".into(),
                email: "alice@example.com".into(),
                password_hash: "hash".into(),
                role: Role::Customer,
            })
            .await;
        assert!(matches!(dup, Err(RepoError::Duplicate(_))));

        let dup = store
            .insert_table(NewTable {
                name: "T1".into(),
                capacity: 2,
                status: TableStatus::Available,
            })
            .await;
        assert!(matches!(dup, Err(RepoError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_book_marks_table_reserved() {
        let (store, user, table) = seeded().await;
        store
            .book_reservation(booking(&user, &table, 19), BookingPolicy::ExactSlot)
            .await
            .unwrap();

        let table = store.find_table(table.id).await.unwrap().unwrap();
        assert_eq!(table.status, TableStatus::Reserved);
    }

    #[tokio::test]
    async fn test_same_slot_is_duplicate() {
        let (store, user, table) = seeded().await;
        store
            .book_reservation(booking(&user, &table, 19), BookingPolicy::ExactSlot)
            .await
            .unwrap();

        let second = store
            .book_reservation(booking(&user, &table, 19), BookingPolicy::ExactSlot)
            .await;
        assert!(matches!(second, Err(RepoError::Duplicate(_))));
        assert_eq!(store.list_reservations(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_single_booking_refuses_reserved_table() {
        let (store, user, table) = seeded().await;
        store
            .book_reservation(booking(&user, &table, 19), BookingPolicy::SingleBooking)
            .await
            .unwrap();

        let later = store
            .book_reservation(booking(&user, &table, 20), BookingPolicy::SingleBooking)
            .await;
        assert!(matches!(later, Err(RepoError::TableUnavailable(id)) if id == table.id));
    }

    #[tokio::test]
    async fn test_cancel_releases_only_when_unreferenced() {
        let (store, user, table) = seeded().await;
        let first = store
            .book_reservation(booking(&user, &table, 19), BookingPolicy::ExactSlot)
            .await
            .unwrap();
        let second = store
            .book_reservation(booking(&user, &table, 20), BookingPolicy::ExactSlot)
            .await
            .unwrap();

        store.cancel_reservation(first.id).await.unwrap();
        let status = store.find_table(table.id).await.unwrap().unwrap().status;
        assert_eq!(status, TableStatus::Reserved);

        store.cancel_reservation(second.id).await.unwrap();
        let status = store.find_table(table.id).await.unwrap().unwrap().status;
        assert_eq!(status, TableStatus::Available);

        assert!(matches!(
            store.cancel_reservation(second.id).await,
            Err(RepoError::NotFound(Entity::Reservation))
        ));
    }

    #[tokio::test]
    async fn test_cancel_keeps_occupied_table() {
        let (store, user, table) = seeded().await;
        let booked = store
            .book_reservation(booking(&user, &table, 19), BookingPolicy::ExactSlot)
            .await
            .unwrap();
        store
            .update_table(
                table.id,
                TableChanges {
                    status: Some(TableStatus::Occupied),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        store.cancel_reservation(booked.id).await.unwrap();
        let status = store.find_table(table.id).await.unwrap().unwrap().status;
        assert_eq!(status, TableStatus::Occupied);
    }

    #[tokio::test]
    async fn test_reschedule_moves_between_tables() {
        let (store, user, t1) = seeded().await;
        let t2 = store
            .insert_table(NewTable {
                name: "T2".into(),
                capacity: 2,
                status: TableStatus::Available,
            })
            .await
            .unwrap();
        let booked = store
            .book_reservation(booking(&user, &t1, 19), BookingPolicy::ExactSlot)
            .await
            .unwrap();

        let moved = store
            .reschedule_reservation(
                booked.id,
                ReservationChanges {
                    table_id: Some(t2.id),
                    ..Default::default()
                },
                BookingPolicy::ExactSlot,
            )
            .await
            .unwrap();
        assert_eq!(moved.table_id, t2.id);
        assert_eq!(moved.reservation_datetime, at(19));

        let t1 = store.find_table(t1.id).await.unwrap().unwrap();
        let t2 = store.find_table(t2.id).await.unwrap().unwrap();
        assert_eq!(t1.status, TableStatus::Available);
        assert_eq!(t2.status, TableStatus::Reserved);
    }

    #[tokio::test]
    async fn test_reschedule_ignores_own_slot() {
        let (store, user, table) = seeded().await;
        let booked = store
            .book_reservation(booking(&user, &table, 19), BookingPolicy::ExactSlot)
            .await
            .unwrap();

        let updated = store
            .reschedule_reservation(
                booked.id,
                ReservationChanges {
                    reservation_datetime: Some(at(19)),
                    number_of_people: Some(3),
                    ..Default::default()
                },
                BookingPolicy::SingleBooking,
            )
            .await
            .unwrap();
        assert_eq!(updated.number_of_people, 3);
    }

    #[tokio::test]
    async fn test_delete_table_with_reservations_conflicts() {
        let (store, user, table) = seeded().await;
        store
            .book_reservation(booking(&user, &table, 19), BookingPolicy::ExactSlot)
            .await
            .unwrap();

        assert!(matches!(
            store.delete_table(table.id).await,
            Err(RepoError::Conflict(_))
        ));
        assert!(matches!(
            store.delete_user(user.id).await,
            Err(RepoError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_list_filters() {
        let (store, user, table) = seeded().await;
        store
            .book_reservation(booking(&user, &table, 21), BookingPolicy::ExactSlot)
            .await
            .unwrap();
        store
            .book_reservation(booking(&user, &table, 18), BookingPolicy::ExactSlot)
            .await
            .unwrap();

        let mine = store.list_reservations(Some(user.id)).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].reservation.reservation_datetime, at(18));
        assert!(store.list_reservations(Some(999)).await.unwrap().is_empty());

        let reserved = store
            .list_tables(Some(TableStatus::Reserved))
            .await
            .unwrap();
        assert_eq!(reserved.len(), 1);
        assert!(
            store
                .list_tables(Some(TableStatus::Occupied))
                .await
                .unwrap()
                .is_empty()
        );
    }
}
