//! Repositories for database operations
//!
//! [`AccountStore`] is the persistence seam used by the workflows. The
//! PostgreSQL implementation lives in [`account`]; tests run against an
//! in-memory store with the same uniqueness and atomicity guarantees.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Account, ApprovalStatus, InfluencerProfile, NewAccount, NewProfile, StatusChange};

pub mod account;
#[cfg(test)]
pub mod memory;

pub use account::PgAccountStore;

pub const PHONE_NUMBER_TAKEN: &str = "User with this phone number already exists.";
pub const USERNAME_TAKEN: &str = "A user with that username already exists.";

/// Errors reported by an [`AccountStore`]
#[derive(Error, Debug)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write
    #[error("Conflict on {field}: {message}")]
    Conflict {
        field: &'static str,
        message: String,
    },

    #[error("Record not found")]
    NotFound,

    /// A data-model invariant would be broken by the write
    #[error("{0}")]
    Invariant(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistent storage for accounts and their profiles
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn phone_number_exists(&self, phone_number: &str) -> StoreResult<bool>;

    async fn username_exists(&self, username: &str) -> StoreResult<bool>;

    /// Create an account and its role profile atomically: either both rows
    /// become visible or neither does.
    async fn create_account(&self, account: NewAccount, profile: NewProfile) -> StoreResult<Account>;

    async fn find_by_phone_number(&self, phone_number: &str) -> StoreResult<Option<Account>>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Account>>;

    async fn find_influencer_profile(&self, account_id: Uuid) -> StoreResult<Option<InfluencerProfile>>;

    async fn set_profile_picture(&self, account_id: Uuid, path: &str) -> StoreResult<InfluencerProfile>;

    /// Partial update: `None` leaves the stored value untouched.
    async fn update_bank_details(
        &self,
        account_id: Uuid,
        bank_name: Option<&str>,
        iban: Option<&str>,
    ) -> StoreResult<InfluencerProfile>;

    /// Append to the bio-video list, failing with [`StoreError::Invariant`]
    /// when the list would exceed its cap.
    async fn append_bio_videos(&self, account_id: Uuid, videos: &[String]) -> StoreResult<InfluencerProfile>;

    /// Write a new approval status and report the previous one.
    async fn set_influencer_status(
        &self,
        account_id: Uuid,
        status: ApprovalStatus,
    ) -> StoreResult<StatusChange>;
}
