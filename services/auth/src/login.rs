//! Login with phone number, password and claimed role

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, info};

use crate::{
    credentials,
    error::{ApiError, ApiResult},
    jwt::JwtService,
    models::{ApprovalStatus, Role},
    repositories::AccountStore,
    validation,
};

pub const LOGIN_SUCCESSFUL: &str = "Login successful";

/// Response body for a successful login
#[derive(Debug, Serialize)]
pub struct LoggedIn {
    pub message: &'static str,
    pub access_token: String,
    pub refresh_token: String,
}

/// Authenticate and issue a token pair.
///
/// Unknown phone numbers and wrong passwords produce the same error. The
/// claimed role must match the account's role, and influencers may only log
/// in once approved.
pub async fn login(
    store: &dyn AccountStore,
    jwt_service: &JwtService,
    payload: &Map<String, Value>,
) -> ApiResult<LoggedIn> {
    let input = validation::validate_login(payload).map_err(ApiError::Validation)?;

    let account = credentials::authenticate(store, &input.phone_number, &input.password)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if account.role != input.role {
        info!("Login refused for account {}: role mismatch", account.id);
        return Err(ApiError::RoleMismatch);
    }

    if account.role == Role::Influencer {
        let status = store
            .find_influencer_profile(account.id)
            .await?
            .map(|profile| profile.status);
        if status != Some(ApprovalStatus::Approved) {
            info!("Login refused for influencer {}: status {:?}", account.id, status);
            return Err(ApiError::NotApproved);
        }
    }

    let tokens = jwt_service.issue_pair(&account).map_err(|e| {
        error!("Failed to issue tokens for account {}: {}", account.id, e);
        ApiError::InternalServerError
    })?;

    info!("Account {} logged in", account.id);

    Ok(LoggedIn {
        message: LOGIN_SUCCESSFUL,
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    })
}
