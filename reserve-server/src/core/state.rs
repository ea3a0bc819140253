use std::sync::Arc;

use crate::auth::{AuthProvider, PasswordService, TokenAuthProvider};
use crate::core::config::StoreBackend;
use crate::core::{Config, Result, ServerError};
use crate::db::{MemoryStore, PgStore, Store};
use crate::notify::{HttpEmailNotifier, LogNotifier, NotificationSink};
use crate::services::{InputValidator, ReservationManager, TableManager, UserManager};

/// Shared handles for every request
///
/// Cloning is cheap: everything sits behind an `Arc` or is itself an
/// `Arc`-holding manager.
///
/// | Field | Purpose |
/// |-------|---------|
/// | config | immutable settings |
/// | store | persistence backend |
/// | auth | password hashing and tokens |
/// | users / tables / reservations | business rules |
#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub auth: Arc<dyn AuthProvider>,
    pub users: UserManager,
    pub tables: TableManager,
    pub reservations: ReservationManager,
}

impl ServerState {
    /// Connect the configured store and notifier, then wire the managers
    pub async fn initialize(config: &Config) -> Result<Self> {
        let store: Arc<dyn Store> = match config.store {
            StoreBackend::Postgres => {
                let url = config.database_url.as_deref().ok_or_else(|| {
                    ServerError::Config("DATABASE_URL is required for the postgres backend".into())
                })?;
                Arc::new(PgStore::connect(url, config.db_max_connections).await?)
            }
            StoreBackend::Memory => {
                tracing::warn!("Using the in-memory store; data is lost on restart");
                Arc::new(MemoryStore::new())
            }
        };

        let notifier: Arc<dyn NotificationSink> = match &config.notify {
            Some(notify) => {
                tracing::info!(relay = %notify.url, "Email confirmations enabled");
                let relay = HttpEmailNotifier::new(notify.clone())
                    .map_err(|e| ServerError::Config(format!("mail relay client: {e}")))?;
                Arc::new(relay)
            }
            None => Arc::new(LogNotifier),
        };

        Self::with_store(config.clone(), store, notifier)
    }

    /// Wire managers around an existing store
    pub fn with_store(
        config: Config,
        store: Arc<dyn Store>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Result<Self> {
        let passwords =
            PasswordService::new(config.password_hash_cost, config.password_hash_memory_kib)
                .map_err(|e| ServerError::Hasher(e.to_string()))?;
        let auth: Arc<dyn AuthProvider> =
            Arc::new(TokenAuthProvider::new(passwords, config.jwt.clone()));

        let validator = InputValidator::new(config.max_table_capacity, config.max_party_size);
        let tables = TableManager::new(Arc::clone(&store), validator);
        let users = UserManager::new(
            Arc::clone(&store),
            Arc::clone(&auth),
            validator,
            config.allow_admin_registration,
        );
        let reservations = ReservationManager::new(
            Arc::clone(&store),
            tables.clone(),
            notifier,
            validator,
            config.booking_policy,
        );

        Ok(Self {
            config: Arc::new(config),
            store,
            auth,
            users,
            tables,
            reservations,
        })
    }

    /// Create the `ADMIN_EMAIL` account when configured
    pub async fn seed_admin(&self) -> Result<()> {
        if let Some(seed) = &self.config.admin_seed {
            self.users.ensure_admin(seed).await?;
        }
        Ok(())
    }
}
