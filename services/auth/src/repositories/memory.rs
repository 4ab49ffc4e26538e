//! In-memory account store for tests

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{AccountStore, PHONE_NUMBER_TAKEN, StoreError, StoreResult, USERNAME_TAKEN};
use crate::models::{
    Account, ApprovalStatus, ClientProfile, InfluencerProfile, NewAccount, NewProfile, StatusChange,
};

#[derive(Default)]
struct State {
    accounts: Vec<Account>,
    clients: Vec<ClientProfile>,
    influencers: Vec<InfluencerProfile>,
}

/// Account store keeping everything behind one lock, so each call is atomic
#[derive(Default)]
pub struct MemoryAccountStore {
    state: Mutex<State>,
    fail_profile_insert: AtomicBool,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next profile insert fail after the account row was prepared
    pub fn fail_next_profile_insert(&self) {
        self.fail_profile_insert.store(true, Ordering::SeqCst);
    }

    pub async fn account_count(&self) -> usize {
        self.state.lock().await.accounts.len()
    }

    pub async fn profile_count(&self) -> usize {
        let state = self.state.lock().await;
        state.clients.len() + state.influencers.len()
    }

    pub async fn set_active(&self, account_id: Uuid, active: bool) {
        let mut state = self.state.lock().await;
        if let Some(account) = state.accounts.iter_mut().find(|a| a.id == account_id) {
            account.is_active = active;
        }
    }

    fn influencer_mut(state: &mut State, account_id: Uuid) -> StoreResult<&mut InfluencerProfile> {
        state
            .influencers
            .iter_mut()
            .find(|p| p.account_id == account_id)
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn phone_number_exists(&self, phone_number: &str) -> StoreResult<bool> {
        let state = self.state.lock().await;
        Ok(state.accounts.iter().any(|a| a.phone_number == phone_number))
    }

    async fn username_exists(&self, username: &str) -> StoreResult<bool> {
        let state = self.state.lock().await;
        Ok(state.accounts.iter().any(|a| a.username == username))
    }

    async fn create_account(&self, new_account: NewAccount, profile: NewProfile) -> StoreResult<Account> {
        let mut state = self.state.lock().await;

        if state.accounts.iter().any(|a| a.phone_number == new_account.phone_number) {
            return Err(StoreError::Conflict {
                field: "phone_number",
                message: PHONE_NUMBER_TAKEN.to_string(),
            });
        }
        if state.accounts.iter().any(|a| a.username == new_account.username) {
            return Err(StoreError::Conflict {
                field: "username",
                message: USERNAME_TAKEN.to_string(),
            });
        }

        let account = Account {
            id: Uuid::new_v4(),
            phone_number: new_account.phone_number,
            username: new_account.username,
            email: new_account.email,
            password_hash: new_account.password_hash,
            role: new_account.role,
            is_active: true,
            date_joined: Utc::now(),
        };

        if self.fail_profile_insert.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }

        match profile {
            NewProfile::Client => state.clients.push(ClientProfile {
                id: Uuid::new_v4(),
                account_id: account.id,
                created_at: Utc::now(),
            }),
            NewProfile::Influencer(new_profile) => {
                let profile = new_profile
                    .into_profile(Uuid::new_v4(), account.id)
                    .map_err(|e| StoreError::Invariant(e.to_string()))?;
                state.influencers.push(profile);
            }
        }

        state.accounts.push(account.clone());
        Ok(account)
    }

    async fn find_by_phone_number(&self, phone_number: &str) -> StoreResult<Option<Account>> {
        let state = self.state.lock().await;
        Ok(state
            .accounts
            .iter()
            .find(|a| a.phone_number == phone_number)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Account>> {
        let state = self.state.lock().await;
        Ok(state.accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn find_influencer_profile(&self, account_id: Uuid) -> StoreResult<Option<InfluencerProfile>> {
        let state = self.state.lock().await;
        Ok(state
            .influencers
            .iter()
            .find(|p| p.account_id == account_id)
            .cloned())
    }

    async fn set_profile_picture(&self, account_id: Uuid, path: &str) -> StoreResult<InfluencerProfile> {
        let mut state = self.state.lock().await;
        let profile = Self::influencer_mut(&mut state, account_id)?;
        profile.profile_picture = Some(path.to_string());
        Ok(profile.clone())
    }

    async fn update_bank_details(
        &self,
        account_id: Uuid,
        bank_name: Option<&str>,
        iban: Option<&str>,
    ) -> StoreResult<InfluencerProfile> {
        let mut state = self.state.lock().await;
        let profile = Self::influencer_mut(&mut state, account_id)?;
        if let Some(bank_name) = bank_name {
            profile.bank_name = Some(bank_name.to_string());
        }
        if let Some(iban) = iban {
            profile.iban = Some(iban.to_string());
        }
        Ok(profile.clone())
    }

    async fn append_bio_videos(&self, account_id: Uuid, videos: &[String]) -> StoreResult<InfluencerProfile> {
        let mut state = self.state.lock().await;
        let profile = Self::influencer_mut(&mut state, account_id)?;
        profile
            .append_bio_videos(videos)
            .map_err(|e| StoreError::Invariant(e.to_string()))?;
        Ok(profile.clone())
    }

    async fn set_influencer_status(
        &self,
        account_id: Uuid,
        status: ApprovalStatus,
    ) -> StoreResult<StatusChange> {
        let mut state = self.state.lock().await;
        let email = state
            .accounts
            .iter()
            .find(|a| a.id == account_id)
            .map(|a| a.email.clone())
            .ok_or(StoreError::NotFound)?;
        let profile = Self::influencer_mut(&mut state, account_id)?;
        let previous = profile.status;
        profile.status = status;

        Ok(StatusChange {
            account_id,
            email,
            previous,
            current: status,
        })
    }
}
