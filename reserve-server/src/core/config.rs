use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::auth::{JwtConfig, generate_printable_secret};
use crate::db::BookingPolicy;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Minimum accepted JWT secret length outside development
const MIN_SECRET_LEN: usize = 32;

/// Longest accepted token lifetime (30 days)
const MAX_TOKEN_MINUTES: i64 = 30 * 24 * 60;

/// Default mail relay request timeout
const DEFAULT_NOTIFY_TIMEOUT_SECS: u64 = 10;

/// Persistence backend selected by `STORE_BACKEND`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown STORE_BACKEND: {other}")),
        }
    }
}

/// HTTP mail relay used for booking confirmations
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub url: String,
    pub api_key: String,
    pub from: String,
    /// Upper bound for one relay request, connect included
    pub timeout: Duration,
}

/// Admin account created at startup when missing
#[derive(Debug, Clone)]
pub struct AdminSeed {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Server configuration
///
/// # Environment variables
///
/// | Variable | Default | Notes |
/// |----------|---------|-------|
/// | ENVIRONMENT | development | development, staging or production |
/// | HTTP_PORT | 8080 | |
/// | STORE_BACKEND | postgres | `postgres` or `memory` |
/// | DATABASE_URL | - | required for postgres |
/// | DB_MAX_CONNECTIONS | 10 | |
/// | JWT_SECRET | generated in development | at least 32 bytes elsewhere |
/// | JWT_EXPIRATION_MINUTES | 180 | 1 to 43200 |
/// | JWT_ISSUER / JWT_AUDIENCE | reserve-server / reserve-clients | |
/// | PASSWORD_HASH_COST | 2 | argon2 iterations |
/// | PASSWORD_HASH_MEMORY_KIB | 19456 | argon2 memory |
/// | BOOKING_POLICY | exact_slot | or `single_booking` |
/// | MAX_TABLE_CAPACITY | 20 | |
/// | MAX_PARTY_SIZE | 20 | |
/// | NOTIFY_URL / NOTIFY_API_KEY / NOTIFY_FROM | - | mail relay, log only when unset |
/// | NOTIFY_TIMEOUT_SECS | 10 | per relay request |
/// | ADMIN_EMAIL / ADMIN_PASSWORD / ADMIN_NAME | - | admin seed |
/// | ALLOW_ADMIN_REGISTRATION | true outside production | |
/// | LOG_LEVEL / LOG_JSON / LOG_DIR | info / false / - | |
#[derive(Debug, Clone)]
pub struct Config {
    /// Environment: development | staging | production
    pub environment: String,
    pub http_port: u16,
    pub store: StoreBackend,
    /// PostgreSQL connection URL
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt: JwtConfig,
    /// argon2 time cost (iterations)
    pub password_hash_cost: u32,
    /// argon2 memory cost in KiB
    pub password_hash_memory_kib: u32,
    pub booking_policy: BookingPolicy,
    pub max_table_capacity: i32,
    pub max_party_size: i32,
    pub notify: Option<NotifyConfig>,
    pub admin_seed: Option<AdminSeed>,
    /// Whether `POST /api/register` may create admins
    pub allow_admin_registration: bool,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
}

fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse `JWT_EXPIRATION_MINUTES`, bounded to `1..=MAX_TOKEN_MINUTES`
fn token_lifetime(raw: Option<&str>, default: i64) -> Result<i64, BoxError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    let minutes: i64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("JWT_EXPIRATION_MINUTES is not a number: {raw}"))?;
    if !(1..=MAX_TOKEN_MINUTES).contains(&minutes) {
        return Err(
            format!("JWT_EXPIRATION_MINUTES must be between 1 and {MAX_TOKEN_MINUTES}").into(),
        );
    }
    Ok(minutes)
}

/// Load variables from `path`, or from `.env` when no path is given
///
/// An explicit file must exist; a missing `.env` is fine. Returns the file
/// that was read.
pub fn load_env_file(path: Option<&Path>) -> Result<Option<PathBuf>, BoxError> {
    match path {
        Some(path) => {
            dotenvy::from_path(path)
                .map_err(|e| format!("cannot read config file {}: {e}", path.display()))?;
            Ok(Some(path.to_path_buf()))
        }
        None => Ok(dotenvy::dotenv().ok()),
    }
}

impl Config {
    /// Require the JWT secret outside development; generate one otherwise.
    fn require_jwt_secret(environment: &str) -> Result<String, BoxError> {
        match env_non_empty("JWT_SECRET") {
            Some(secret) => {
                if secret.len() < MIN_SECRET_LEN {
                    if environment != "development" {
                        return Err(format!(
                            "JWT_SECRET must be at least {MIN_SECRET_LEN} bytes in {environment}"
                        )
                        .into());
                    }
                    tracing::warn!("JWT_SECRET shorter than {MIN_SECRET_LEN} bytes");
                }
                Ok(secret)
            }
            None if environment == "development" => {
                tracing::warn!("JWT_SECRET not set, generated a temporary development secret");
                Ok(generate_printable_secret())
            }
            None => Err(format!("JWT_SECRET must be set in {environment} environment").into()),
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());
        let defaults = Self::development();

        let store = match env_non_empty("STORE_BACKEND") {
            Some(raw) => raw.parse::<StoreBackend>()?,
            None => StoreBackend::Postgres,
        };
        let database_url = env_non_empty("DATABASE_URL");
        if store == StoreBackend::Postgres && database_url.is_none() {
            return Err("DATABASE_URL must be set when STORE_BACKEND=postgres".into());
        }

        let booking_policy = match env_non_empty("BOOKING_POLICY") {
            Some(raw) => raw.parse::<BookingPolicy>()?,
            None => defaults.booking_policy,
        };

        let notify = env_non_empty("NOTIFY_URL").map(|url| NotifyConfig {
            url,
            api_key: std::env::var("NOTIFY_API_KEY").unwrap_or_default(),
            from: std::env::var("NOTIFY_FROM").unwrap_or_else(|_| "noreply@wereserve.com".into()),
            timeout: Duration::from_secs(env_parse(
                "NOTIFY_TIMEOUT_SECS",
                DEFAULT_NOTIFY_TIMEOUT_SECS,
            )),
        });

        let admin_seed = match (env_non_empty("ADMIN_EMAIL"), env_non_empty("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed {
                name: std::env::var("ADMIN_NAME").unwrap_or_else(|_| "admin".into()),
                email,
                password,
            }),
            _ => None,
        };

        let jwt = JwtConfig {
            secret: Self::require_jwt_secret(&environment)?,
            expiration_minutes: token_lifetime(
                env_non_empty("JWT_EXPIRATION_MINUTES").as_deref(),
                defaults.jwt.expiration_minutes,
            )?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or(defaults.jwt.issuer),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or(defaults.jwt.audience),
        };

        Ok(Self {
            allow_admin_registration: env_parse(
                "ALLOW_ADMIN_REGISTRATION",
                environment != "production",
            ),
            environment,
            http_port: env_parse("HTTP_PORT", defaults.http_port),
            store,
            database_url,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", defaults.db_max_connections),
            jwt,
            password_hash_cost: env_parse("PASSWORD_HASH_COST", defaults.password_hash_cost),
            password_hash_memory_kib: env_parse(
                "PASSWORD_HASH_MEMORY_KIB",
                defaults.password_hash_memory_kib,
            ),
            booking_policy,
            max_table_capacity: env_parse("MAX_TABLE_CAPACITY", defaults.max_table_capacity),
            max_party_size: env_parse("MAX_PARTY_SIZE", defaults.max_party_size),
            notify,
            admin_seed,
            log_level: std::env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_json: env_parse("LOG_JSON", defaults.log_json),
            log_dir: env_non_empty("LOG_DIR"),
        })
    }

    /// Development defaults without reading the environment
    ///
    /// In-memory store, generated JWT secret, no notifier.
    pub fn development() -> Self {
        Self {
            environment: "development".into(),
            http_port: 8080,
            store: StoreBackend::Memory,
            database_url: None,
            db_max_connections: 10,
            jwt: JwtConfig {
                secret: generate_printable_secret(),
                expiration_minutes: 180,
                issuer: "reserve-server".into(),
                audience: "reserve-clients".into(),
            },
            password_hash_cost: 2,
            password_hash_memory_kib: 19 * 1024,
            booking_policy: BookingPolicy::ExactSlot,
            max_table_capacity: 20,
            max_party_size: 20,
            notify: None,
            admin_seed: None,
            allow_admin_registration: true,
            log_level: "info".into(),
            log_json: false,
            log_dir: None,
        }
    }

    /// Development config with the given backend and booking policy
    ///
    /// Commonly used in tests.
    pub fn with_overrides(store: StoreBackend, booking_policy: BookingPolicy) -> Self {
        Self {
            store,
            booking_policy,
            ..Self::development()
        }
    }

    /// Whether this is the production environment
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::development()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_backend_parse() {
        assert_eq!("memory".parse::<StoreBackend>(), Ok(StoreBackend::Memory));
        assert_eq!("Postgres".parse::<StoreBackend>(), Ok(StoreBackend::Postgres));
        assert!("sqlite".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn test_development_defaults() {
        let config = Config::default();
        assert!(!config.is_production());
        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.booking_policy, BookingPolicy::ExactSlot);
        assert_eq!(config.jwt.expiration_minutes, 180);
        assert!(config.jwt.secret.len() >= MIN_SECRET_LEN);
    }

    #[test]
    fn test_with_overrides() {
        let config = Config::with_overrides(StoreBackend::Memory, BookingPolicy::SingleBooking);
        assert_eq!(config.booking_policy, BookingPolicy::SingleBooking);
        assert_eq!(config.http_port, 8080);
    }

    #[test]
    fn test_token_lifetime_bounds() {
        assert_eq!(token_lifetime(None, 180).unwrap(), 180);
        assert_eq!(token_lifetime(Some(" 60 "), 180).unwrap(), 60);
        assert_eq!(
            token_lifetime(Some("43200"), 180).unwrap(),
            MAX_TOKEN_MINUTES
        );

        assert!(token_lifetime(Some("0"), 180).is_err());
        assert!(token_lifetime(Some("-5"), 180).is_err());
        assert!(token_lifetime(Some("43201"), 180).is_err());
        assert!(token_lifetime(Some("9223372036854775807"), 180).is_err());
        assert!(token_lifetime(Some("soon"), 180).is_err());
    }

    #[test]
    fn test_load_env_file() {
        let missing = std::env::temp_dir().join("reserve-server-no-such-file.env");
        assert!(load_env_file(Some(&missing)).is_err());

        let path = std::env::temp_dir().join(format!(
            "reserve-server-{}.env",
            uuid::Uuid::new_v4().simple()
        ));
        std::fs::write(&path, "RESERVE_SERVER_ENV_FILE_MARKER=loaded\n").unwrap();
        let loaded = load_env_file(Some(&path)).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded.as_deref(), Some(path.as_path()));
        assert_eq!(
            std::env::var("RESERVE_SERVER_ENV_FILE_MARKER").as_deref(),
            Ok("loaded")
        );
    }
}
