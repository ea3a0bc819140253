//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use reserve_server::core::config::StoreBackend;
use reserve_server::notify::{LogNotifier, NotificationSink, NotifyError, ReservationNotice};
use reserve_server::{AuthenticatedPrincipal, BookingPolicy, Config, MemoryStore, ServerState};
use shared::models::{DiningTable, DiningTableCreate, RegisterRequest, UserResponse};

/// Memory store, cheap password hashing
pub fn test_config(policy: BookingPolicy) -> Config {
    let mut config = Config::with_overrides(StoreBackend::Memory, policy);
    config.password_hash_cost = 1;
    config.password_hash_memory_kib = 1024;
    config
}

pub fn state_with(policy: BookingPolicy, notifier: Arc<dyn NotificationSink>) -> ServerState {
    ServerState::with_store(test_config(policy), Arc::new(MemoryStore::new()), notifier)
        .expect("test state")
}

pub fn state(policy: BookingPolicy) -> ServerState {
    state_with(policy, Arc::new(LogNotifier))
}

/// Keeps every notice it is given
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<ReservationNotice>>,
}

impl RecordingNotifier {
    /// Wait for `count` notices; confirmations are sent from a spawned task
    pub async fn wait_for(&self, count: usize) -> Vec<ReservationNotice> {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                {
                    let sent = self.sent.lock();
                    if sent.len() >= count {
                        return sent.clone();
                    }
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("confirmation not sent in time")
    }
}

#[async_trait]
impl NotificationSink for RecordingNotifier {
    async fn reservation_confirmed(&self, notice: &ReservationNotice) -> Result<(), NotifyError> {
        self.sent.lock().push(notice.clone());
        Ok(())
    }
}

/// Relay that always refuses
pub struct FailingNotifier;

#[async_trait]
impl NotificationSink for FailingNotifier {
    async fn reservation_confirmed(&self, _notice: &ReservationNotice) -> Result<(), NotifyError> {
        Err(NotifyError::Rejected {
            status: 503,
            body: "relay down".into(),
        })
    }
}

pub fn principal_of(user: &UserResponse) -> AuthenticatedPrincipal {
    AuthenticatedPrincipal {
        id: user.id,
        email: user.email.clone(),
        role: user.role,
    }
}

pub fn register_request(name: &str, email: &str, role: Option<&str>) -> RegisterRequest {
    RegisterRequest {
        name: name.into(),
        email: email.into(),
        password: "password123".into(),
        role: role.map(String::from),
    }
}

pub async fn customer(state: &ServerState, email: &str) -> AuthenticatedPrincipal {
    let user = state
        .users
        .register(register_request("Guest", email, None))
        .await
        .expect("register customer");
    principal_of(&user)
}

pub async fn admin(state: &ServerState) -> AuthenticatedPrincipal {
    let user = state
        .users
        .register(register_request("Manager", "admin@wereserve.com", Some("admin")))
        .await
        .expect("register admin");
    principal_of(&user)
}

pub async fn table(state: &ServerState, name: &str) -> DiningTable {
    state
        .tables
        .create_table(DiningTableCreate {
            name: name.into(),
            capacity: 4,
            status: Some("available".into()),
        })
        .await
        .expect("create table")
}

/// 2024-06-01 at the given hour, UTC
pub fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap()
}
