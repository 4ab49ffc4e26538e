//! Account registration
//!
//! A registration payload is one flat JSON object. The `role` key decides
//! its shape: the payload is decoded into a [`RegistrationRequest`] right
//! away, with account fields split from profile fields using the static
//! field lists in [`crate::validation`].
//!
//! Validation runs in two passes. The account pass (formats, then
//! uniqueness) is reported on its own when it fails; only then does the
//! profile pass run. Nothing is written before both passes succeed, and the
//! account and its profile are created in one store call.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::{
    credentials,
    error::{ApiError, ApiResult, FieldErrors, NON_FIELD_ERRORS},
    iban,
    jwt::JwtService,
    models::{AccountSummary, NewAccount, NewProfile, Role},
    repositories::{AccountStore, PHONE_NUMBER_TAKEN, USERNAME_TAKEN},
    validation::{self, ACCOUNT_FIELDS, AccountInput, BANK_NAME_MAX_LENGTH, INVALID_IBAN},
};

pub const ROLE_REQUIRED: &str = "Role is required.";

/// Client registration: account fields plus whatever else was sent
#[derive(Debug, Clone, PartialEq)]
pub struct ClientRegistration {
    pub account: Map<String, Value>,
    pub profile: Map<String, Value>,
}

/// Influencer registration: account fields plus profile fields
#[derive(Debug, Clone, PartialEq)]
pub struct InfluencerRegistration {
    pub account: Map<String, Value>,
    pub profile: Map<String, Value>,
}

/// Registration payload after reading the role discriminator
#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationRequest {
    Client(ClientRegistration),
    Influencer(InfluencerRegistration),
}

/// Response body for a successful registration
#[derive(Debug, Serialize)]
pub struct Registered {
    pub user: AccountSummary,
    pub access_token: String,
    pub refresh_token: String,
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

impl RegistrationRequest {
    /// Read the role and split the payload into account and profile fields.
    pub fn decode(payload: Value) -> Result<Self, FieldErrors> {
        let mut map = match payload {
            Value::Object(map) => map,
            other => {
                return Err(FieldErrors::single(
                    NON_FIELD_ERRORS,
                    format!(
                        "Invalid data. Expected a dictionary, but got {}.",
                        json_type_name(&other)
                    ),
                ));
            }
        };

        let role = match map.remove("role") {
            Some(Value::String(role)) if !role.trim().is_empty() => role
                .parse::<Role>()
                .map_err(|message| FieldErrors::single("role", message))?,
            _ => return Err(FieldErrors::single("role", ROLE_REQUIRED)),
        };

        let mut account = Map::new();
        let mut profile = Map::new();
        for (key, value) in map {
            if ACCOUNT_FIELDS.contains(&key.as_str()) {
                account.insert(key, value);
            } else {
                profile.insert(key, value);
            }
        }

        Ok(match role {
            Role::Client => RegistrationRequest::Client(ClientRegistration { account, profile }),
            Role::Influencer => {
                RegistrationRequest::Influencer(InfluencerRegistration { account, profile })
            }
        })
    }

    pub fn role(&self) -> Role {
        match self {
            RegistrationRequest::Client(_) => Role::Client,
            RegistrationRequest::Influencer(_) => Role::Influencer,
        }
    }

    fn account_fields(&self) -> &Map<String, Value> {
        match self {
            RegistrationRequest::Client(r) => &r.account,
            RegistrationRequest::Influencer(r) => &r.account,
        }
    }
}

/// Account pass: field formats first, then uniqueness against the store.
async fn validate_account_pass(
    store: &dyn AccountStore,
    fields: &Map<String, Value>,
) -> ApiResult<AccountInput> {
    let input = validation::validate_account(fields).map_err(ApiError::Validation)?;

    let mut errors = FieldErrors::new();
    if store.phone_number_exists(&input.phone_number).await? {
        errors.add("phone_number", PHONE_NUMBER_TAKEN);
    }
    if store.username_exists(&input.username).await? {
        errors.add("username", USERNAME_TAKEN);
    }
    errors.into_result()?;

    Ok(input)
}

/// Bank checks that run ahead of the influencer profile pass. Each failure is
/// reported alone; on success the IBAN is replaced by its normalised form.
fn check_influencer_bank_fields(profile: &mut Map<String, Value>) -> ApiResult<()> {
    if let Some(Value::String(raw)) = profile.get("iban") {
        if !raw.trim().is_empty() && !iban::is_valid(raw) {
            return Err(ApiError::Validation(FieldErrors::single("iban", INVALID_IBAN)));
        }
    }

    if let Some(Value::String(bank_name)) = profile.get("bank_name") {
        if bank_name.chars().count() > BANK_NAME_MAX_LENGTH {
            return Err(ApiError::Validation(FieldErrors::single(
                "bank_name",
                format!(
                    "Ensure this field has no more than {} characters.",
                    BANK_NAME_MAX_LENGTH
                ),
            )));
        }
    }

    if let Some(Value::String(raw)) = profile.get_mut("iban") {
        *raw = iban::normalize(raw);
    }

    Ok(())
}

/// Profile pass for either role
fn validate_profile_pass(request: &mut RegistrationRequest) -> ApiResult<NewProfile> {
    match request {
        RegistrationRequest::Client(r) => {
            validation::validate_client_profile(&r.profile).map_err(ApiError::Validation)?;
            Ok(NewProfile::Client)
        }
        RegistrationRequest::Influencer(r) => {
            check_influencer_bank_fields(&mut r.profile)?;
            let profile =
                validation::validate_influencer_profile(&r.profile).map_err(ApiError::Validation)?;
            Ok(NewProfile::Influencer(profile))
        }
    }
}

/// Validate, provision and issue tokens for a new account
pub async fn register(
    store: &dyn AccountStore,
    jwt_service: &JwtService,
    mut request: RegistrationRequest,
) -> ApiResult<Registered> {
    let role = request.role();

    let input = validate_account_pass(store, request.account_fields()).await?;
    let profile = validate_profile_pass(&mut request)?;

    let password_hash = credentials::hash_password_async(&input.password).await.map_err(|e| {
        error!("Failed to hash password: {}", e);
        ApiError::InternalServerError
    })?;

    let new_account = NewAccount {
        phone_number: input.phone_number,
        username: input.username,
        email: input.email,
        password_hash,
        role,
    };

    let account = store
        .create_account(new_account, profile)
        .await
        .inspect_err(|e| warn!("Account provisioning failed: {}", e))?;

    let tokens = jwt_service.issue_pair(&account).map_err(|e| {
        error!("Failed to issue tokens for account {}: {}", account.id, e);
        ApiError::InternalServerError
    })?;

    info!("Registered {} account {}", account.role, account.id);

    Ok(Registered {
        user: AccountSummary::from(&account),
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    })
}
