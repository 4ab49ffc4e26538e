//! Account model and related functionality

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Role;

/// Account entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub phone_number: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

/// New account creation payload, already validated and hashed
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub phone_number: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Public view of an account returned after registration
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AccountSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub phone_number: String,
    pub role: Role,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
            phone_number: account.phone_number.clone(),
            role: account.role,
        }
    }
}
