//! Reservation booking
//!
//! Admission runs inside the store (see [`Store::book_reservation`]); this
//! layer resolves who is booking, validates the request, maps store outcomes
//! to API errors and sends the confirmation.
//!
//! Instants are kept to microsecond precision, which is what PostgreSQL
//! stores, so slot equality is the same on every backend. The confirmation
//! goes out on its own task once the booking is committed.
//!
//! Under [`BookingPolicy::ExactSlot`] a table takes any number of bookings at
//! distinct instants. Under [`BookingPolicy::SingleBooking`] a `reserved`
//! table takes none until its reservations are cancelled. Either way a
//! successful booking leaves the table `reserved`.

use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{Reservation, ReservationCreate, ReservationDetail, ReservationUpdate};

use super::{InputValidator, TableManager};
use crate::auth::AuthenticatedPrincipal;
use crate::db::{BookingPolicy, NewReservation, RepoError, ReservationChanges, Store};
use crate::notify::{NotificationSink, ReservationNotice};

/// Drop sub-microsecond digits
fn slot_instant(at: DateTime<Utc>) -> DateTime<Utc> {
    at.trunc_subsecs(6)
}

fn booking_error(err: RepoError) -> AppError {
    match err {
        RepoError::Duplicate(_) => AppError::new(ErrorCode::ReservationConflict),
        RepoError::TableUnavailable(_) => AppError::new(ErrorCode::TableAlreadyReserved),
        other => other.into(),
    }
}

#[derive(Clone)]
pub struct ReservationManager {
    store: Arc<dyn Store>,
    tables: TableManager,
    notifier: Arc<dyn NotificationSink>,
    validator: InputValidator,
    policy: BookingPolicy,
}

impl ReservationManager {
    pub fn new(
        store: Arc<dyn Store>,
        tables: TableManager,
        notifier: Arc<dyn NotificationSink>,
        validator: InputValidator,
        policy: BookingPolicy,
    ) -> Self {
        Self {
            store,
            tables,
            notifier,
            validator,
            policy,
        }
    }

    pub fn policy(&self) -> BookingPolicy {
        self.policy
    }

    /// Book a table. Customers book for themselves; admins may pass `user_id`.
    pub async fn create_reservation(
        &self,
        principal: &AuthenticatedPrincipal,
        req: ReservationCreate,
    ) -> AppResult<Reservation> {
        self.validator.check(&req)?;
        self.validator.check_party_size(req.number_of_people)?;

        let user_id = match req.user_id {
            Some(id) if id != principal.id && !principal.is_admin() => {
                return Err(AppError::forbidden(
                    "You can only book reservations for yourself",
                ));
            }
            Some(id) => id,
            None => principal.id,
        };

        // 404 before any write
        self.tables.get_table(req.table_id).await?;

        let reservation = self
            .store
            .book_reservation(
                NewReservation {
                    user_id,
                    table_id: req.table_id,
                    reservation_datetime: slot_instant(req.reservation_datetime),
                    number_of_people: req.number_of_people,
                },
                self.policy,
            )
            .await
            .map_err(booking_error)?;

        tracing::info!(
            reservation_id = reservation.id,
            table_id = reservation.table_id,
            user_id,
            at = %reservation.reservation_datetime,
            policy = self.policy.as_str(),
            "Reservation created"
        );

        let manager = self.clone();
        let reservation_id = reservation.id;
        tokio::spawn(async move { manager.send_confirmation(reservation_id).await });
        Ok(reservation)
    }

    /// Change table, time or party size. An empty update never touches the store.
    pub async fn update_reservation(
        &self,
        principal: &AuthenticatedPrincipal,
        id: i64,
        req: ReservationUpdate,
    ) -> AppResult<Reservation> {
        if req.is_empty() {
            return Err(AppError::new(ErrorCode::EmptyUpdate));
        }
        self.validator.check(&req)?;
        if let Some(people) = req.number_of_people {
            self.validator.check_party_size(people)?;
        }

        let current = self.owned(principal, id).await?;
        if let Some(table_id) = req.table_id
            && table_id != current.reservation.table_id
        {
            self.tables.get_table(table_id).await?;
        }

        let reservation = self
            .store
            .reschedule_reservation(
                id,
                ReservationChanges {
                    table_id: req.table_id,
                    reservation_datetime: req.reservation_datetime.map(slot_instant),
                    number_of_people: req.number_of_people,
                },
                self.policy,
            )
            .await
            .map_err(booking_error)?;

        tracing::info!(reservation_id = id, by = principal.id, "Reservation updated");
        Ok(reservation)
    }

    /// Cancel and release the table when nothing else holds it
    pub async fn delete_reservation(
        &self,
        principal: &AuthenticatedPrincipal,
        id: i64,
    ) -> AppResult<Reservation> {
        self.owned(principal, id).await?;
        let removed = self.store.cancel_reservation(id).await?;
        tracing::info!(
            reservation_id = id,
            table_id = removed.table_id,
            by = principal.id,
            "Reservation cancelled"
        );
        Ok(removed)
    }

    /// Every reservation; empty when there are none
    pub async fn get_all_reservations(&self) -> AppResult<Vec<ReservationDetail>> {
        Ok(self.store.list_reservations(None).await?)
    }

    pub async fn get_reservation_detail(
        &self,
        principal: &AuthenticatedPrincipal,
        id: i64,
    ) -> AppResult<ReservationDetail> {
        self.owned(principal, id).await
    }

    pub async fn get_reservations_by_user(&self, user_id: i64) -> AppResult<Vec<ReservationDetail>> {
        Ok(self.store.list_reservations(Some(user_id)).await?)
    }

    async fn owned(
        &self,
        principal: &AuthenticatedPrincipal,
        id: i64,
    ) -> AppResult<ReservationDetail> {
        let detail = self
            .store
            .find_reservation(id)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::ReservationNotFound))?;
        if !principal.can_access(detail.reservation.user_id) {
            return Err(AppError::forbidden(
                "You can only access your own reservations",
            ));
        }
        Ok(detail)
    }

    async fn send_confirmation(&self, reservation_id: i64) {
        let detail = match self.store.find_reservation(reservation_id).await {
            Ok(Some(detail)) => detail,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(reservation_id, error = %e, "Confirmation skipped, lookup failed");
                return;
            }
        };

        let notice = ReservationNotice::from(&detail);
        if let Err(e) = self.notifier.reservation_confirmed(&notice).await {
            tracing::warn!(
                reservation_id,
                to = %notice.recipient_email,
                error = %e,
                "Failed to send reservation confirmation"
            );
        }
    }
}
