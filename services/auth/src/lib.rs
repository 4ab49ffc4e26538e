//! Account and onboarding service for the Hear Me platform
//!
//! Clients and influencers register and log in here. Influencers
//! additionally manage their profile picture, bank details and bio videos,
//! and are notified when an administrator approves or rejects them.

use std::path::PathBuf;
use std::sync::Arc;

use sqlx::PgPool;

pub mod assets;
pub mod credentials;
pub mod database;
pub mod error;
pub mod file_validators;
pub mod iban;
pub mod jwt;
pub mod login;
pub mod middleware;
pub mod models;
pub mod moderation;
pub mod notifications;
pub mod registration;
pub mod repositories;
pub mod routes;
pub mod storage;
pub mod validation;

use crate::{
    jwt::JwtService, notifications::Notifier, repositories::AccountStore, storage::ContentStore,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Pool backing `store`, used for health reporting; absent in tests
    pub db_pool: Option<PgPool>,
    pub store: Arc<dyn AccountStore>,
    pub jwt_service: JwtService,
    pub content_store: Arc<dyn ContentStore>,
    /// Directory served under `/media`
    pub media_root: PathBuf,
    pub notifier: Arc<dyn Notifier>,
    /// Sender address for outgoing notifications
    pub notification_sender: String,
    /// Token expected in `X-Admin-Token`; the admin routes answer 404 without one
    pub admin_token: Option<String>,
}
