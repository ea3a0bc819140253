use shared::error::AppError;
use thiserror::Error;

use crate::db::RepoError;

/// Startup and serving failures
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("store unavailable: {0}")]
    Store(#[from] RepoError),

    #[error("password hasher setup failed: {0}")]
    Hasher(String),

    #[error("admin seeding failed: {0}")]
    Seed(#[from] AppError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
