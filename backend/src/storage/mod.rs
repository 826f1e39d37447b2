//! Persistence boundary.
//!
//! Each ledger is its own trait so handlers only name what they touch;
//! [`Storage`] bundles them for the application state. Two backends exist:
//! [`postgres::PgStorage`] for deployment and [`memory::MemoryStorage`] for
//! tests and local experiments.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    access_request::NewAccessRequest,
    mood::MoodMap,
    task::{NewTask, TaskEntry},
    user::User,
};

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

/// Identity records. Emails are expected already normalized.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fails with [`StorageError::Conflict`] when the email is taken.
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<Uuid>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>>;
}

#[async_trait]
pub trait MoodLedger: Send + Sync {
    async fn moods(&self, user_id: Uuid) -> Result<MoodMap>;

    /// Make the stored map equal to `moods`: upsert every entry and drop
    /// every day not present. All or nothing.
    async fn replace_moods(&self, user_id: Uuid, moods: &MoodMap) -> Result<()>;
}

#[async_trait]
pub trait TaskLedger: Send + Sync {
    /// Newest first.
    async fn tasks(&self, user_id: Uuid) -> Result<Vec<TaskEntry>>;

    /// Swap the whole task list for `tasks`. All or nothing.
    async fn replace_tasks(&self, user_id: Uuid, tasks: &[NewTask]) -> Result<()>;
}

#[async_trait]
pub trait AccessRequestRegistry: Send + Sync {
    /// Insert unless a request for the same email exists. Returns whether a
    /// row was written. A phone number owned by another email is a conflict.
    async fn register_access_request(&self, request: &NewAccessRequest) -> Result<bool>;
}

#[async_trait]
pub trait Storage: CredentialStore + MoodLedger + TaskLedger + AccessRequestRegistry {
    /// Cheap liveness check used by `/readyz`.
    async fn ping(&self) -> Result<()>;
}
