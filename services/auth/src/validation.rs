//! Input validation utilities
//!
//! Single-value checks return `Result<(), String>` with the message shown to
//! the caller. The `read_*` helpers pull typed values out of a JSON object and
//! record every problem in a [`FieldErrors`] map instead of stopping at the
//! first one.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

use crate::{
    error::FieldErrors,
    iban,
    models::{Category, MAX_BIO_VIDEOS, NewInfluencerProfile, Price, Role},
};

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const NOT_A_STRING: &str = "Not a valid string.";
pub const UNKNOWN_FIELD: &str = "Unknown field.";
pub const INVALID_IBAN: &str = "Invalid IBAN.";

pub const PHONE_NUMBER_MAX_LENGTH: usize = 15;
pub const USERNAME_MAX_LENGTH: usize = 150;
pub const EMAIL_MAX_LENGTH: usize = 254;
pub const PASSWORD_MIN_LENGTH: usize = 8;
pub const PASSWORD_MAX_LENGTH: usize = 128;
pub const FULL_NAME_MAX_LENGTH: usize = 255;
pub const PROFILE_PICTURE_MAX_LENGTH: usize = 255;
pub const URL_MAX_LENGTH: usize = 200;
pub const BANK_NAME_MAX_LENGTH: usize = 150;
pub const IBAN_MAX_LENGTH: usize = 34;
pub const PRICE_MAX_DIGITS: usize = 10;
pub const PRICE_DECIMAL_PLACES: usize = 2;

/// Fields accepted for the base account, in addition to `role`
pub const ACCOUNT_FIELDS: &[&str] = &["phone_number", "username", "email", "password"];

/// Fields accepted for an influencer profile at registration
pub const INFLUENCER_PROFILE_FIELDS: &[&str] = &[
    "full_name",
    "biography",
    "category",
    "profile_picture",
    "bio_videos",
    "daily_price",
    "weekly_price",
    "instagram_acc_link",
    "tiktok_acc_link",
    "snapchat_acc_link",
    "youtube_acc_link",
    "bank_name",
    "iban",
];

const SOCIAL_LINK_FIELDS: &[&str] = &[
    "instagram_acc_link",
    "tiktok_acc_link",
    "snapchat_acc_link",
    "youtube_acc_link",
];

fn max_length_message(max: usize, actual: usize) -> String {
    format!(
        "Ensure this value has at most {} characters (it has {}).",
        max, actual
    )
}

fn check_max_length(value: &str, max: usize) -> Result<(), String> {
    let length = value.chars().count();
    if length > max {
        return Err(max_length_message(max, length));
    }
    Ok(())
}

/// Validate phone number
pub fn validate_phone_number(phone_number: &str) -> Result<(), String> {
    check_max_length(phone_number, PHONE_NUMBER_MAX_LENGTH)?;

    static PHONE_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = PHONE_REGEX
        .get_or_init(|| Regex::new(r"^\+?[0-9]{4,14}$").expect("Failed to compile phone regex"));

    if !regex.is_match(phone_number) {
        return Err("Enter a valid phone number.".to_string());
    }

    Ok(())
}

/// Validate username
pub fn validate_username(username: &str) -> Result<(), String> {
    check_max_length(username, USERNAME_MAX_LENGTH)?;

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX
        .get_or_init(|| Regex::new(r"^[\w.@+-]+$").expect("Failed to compile username regex"));

    if !regex.is_match(username) {
        return Err(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                .to_string(),
        );
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    check_max_length(email, EMAIL_MAX_LENGTH)?;

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Enter a valid email address.".to_string());
    }

    Ok(())
}

/// Validate password
pub fn validate_password(password: &str) -> Result<(), String> {
    let length = password.chars().count();

    if length < PASSWORD_MIN_LENGTH {
        return Err(format!(
            "This password is too short. It must contain at least {} characters.",
            PASSWORD_MIN_LENGTH
        ));
    }

    if length > PASSWORD_MAX_LENGTH {
        return Err(max_length_message(PASSWORD_MAX_LENGTH, length));
    }

    Ok(())
}

/// Validate an http(s) URL
pub fn validate_url(url: &str) -> Result<(), String> {
    check_max_length(url, URL_MAX_LENGTH)?;

    static URL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = URL_REGEX.get_or_init(|| {
        Regex::new(r"^(?i)https?://[a-z0-9](?:[a-z0-9-]*[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]*[a-z0-9])?)+(?::\d{1,5})?(?:[/?#]\S*)?$")
            .expect("Failed to compile URL regex")
    });

    if !regex.is_match(url) {
        return Err("Enter a valid URL.".to_string());
    }

    Ok(())
}

/// Validate a non-negative decimal with at most 10 digits, 2 of them after the point
pub fn validate_price(price: &str) -> Result<(), String> {
    static PRICE_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = PRICE_REGEX.get_or_init(|| {
        Regex::new(r"^(-?)([0-9]+)(?:\.([0-9]+))?$").expect("Failed to compile price regex")
    });

    let captures = regex
        .captures(price)
        .ok_or_else(|| "A valid number is required.".to_string())?;

    if !captures[1].is_empty() {
        return Err("Ensure this value is greater than or equal to 0.".to_string());
    }

    let whole = captures[2].trim_start_matches('0');
    let fraction = captures.get(3).map(|m| m.as_str()).unwrap_or("");

    if whole.len() + fraction.len() > PRICE_MAX_DIGITS {
        return Err(format!(
            "Ensure that there are no more than {} digits in total.",
            PRICE_MAX_DIGITS
        ));
    }

    if fraction.len() > PRICE_DECIMAL_PLACES {
        return Err(format!(
            "Ensure that there are no more than {} decimal places.",
            PRICE_DECIMAL_PLACES
        ));
    }

    Ok(())
}

/// Validate a bank name as accepted from the owner
pub fn validate_bank_name(bank_name: &str) -> Result<(), String> {
    if bank_name.trim().is_empty() {
        return Err(BLANK.to_string());
    }

    let length = bank_name.chars().count();
    if length > BANK_NAME_MAX_LENGTH {
        return Err(format!(
            "Ensure this field has no more than {} characters.",
            BANK_NAME_MAX_LENGTH
        ));
    }

    Ok(())
}

/// Normalise and validate an IBAN, returning its stored form
pub fn validate_iban(raw: &str) -> Result<String, String> {
    let normalized = iban::normalize(raw);
    if normalized.is_empty() {
        return Err(BLANK.to_string());
    }
    if !iban::is_valid(&normalized) {
        return Err(INVALID_IBAN.to_string());
    }
    Ok(normalized)
}

/// Read an optional string; `null` and `""` count as absent.
pub fn read_optional_string(
    map: &Map<String, Value>,
    field: &str,
    errors: &mut FieldErrors,
) -> Option<String> {
    match map.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.add(field, NOT_A_STRING);
            None
        }
    }
}

/// Read a string that must be present and non-blank.
pub fn read_required_string(
    map: &Map<String, Value>,
    field: &str,
    errors: &mut FieldErrors,
) -> Option<String> {
    match map.get(field) {
        None | Some(Value::Null) => {
            errors.add(field, REQUIRED);
            None
        }
        Some(Value::String(s)) if s.trim().is_empty() => {
            errors.add(field, BLANK);
            None
        }
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.add(field, NOT_A_STRING);
            None
        }
    }
}

/// Run a single-value check and record its message under `field`.
fn check(field: &str, result: Result<(), String>, errors: &mut FieldErrors) -> bool {
    match result {
        Ok(()) => true,
        Err(message) => {
            errors.add(field, message);
            false
        }
    }
}

/// Account attributes after field-level validation
#[derive(Debug, Clone, PartialEq)]
pub struct AccountInput {
    pub phone_number: String,
    /// Effective username: the supplied one, or the phone number when absent
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Validate the account part of a registration payload.
///
/// Collects every field error before returning. Uniqueness is not checked
/// here since it needs the store.
pub fn validate_account(map: &Map<String, Value>) -> Result<AccountInput, FieldErrors> {
    let mut errors = FieldErrors::new();

    let phone_number = read_required_string(map, "phone_number", &mut errors)
        .filter(|v| check("phone_number", validate_phone_number(v), &mut errors));

    let username = read_optional_string(map, "username", &mut errors)
        .filter(|v| !v.trim().is_empty())
        .map(|v| {
            let valid = check("username", validate_username(&v), &mut errors);
            (v, valid)
        });

    let email = read_required_string(map, "email", &mut errors)
        .filter(|v| check("email", validate_email(v), &mut errors));

    let password = read_required_string(map, "password", &mut errors)
        .filter(|v| check("password", validate_password(v), &mut errors));

    if !errors.is_empty() {
        return Err(errors);
    }

    match (phone_number, email, password) {
        (Some(phone_number), Some(email), Some(password)) => {
            let username = username
                .map(|(v, _)| v)
                .unwrap_or_else(|| phone_number.clone());
            Ok(AccountInput {
                phone_number,
                username,
                email,
                password,
            })
        }
        _ => Err(errors),
    }
}

/// Validate the fields left over for a client profile. Clients carry no extra data.
pub fn validate_client_profile(map: &Map<String, Value>) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    for key in map.keys() {
        errors.add(key, UNKNOWN_FIELD);
    }
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

fn read_price(map: &Map<String, Value>, field: &str, errors: &mut FieldErrors) -> Option<Price> {
    let raw = match map.get(field) {
        None | Some(Value::Null) => return None,
        Some(Value::String(s)) if s.trim().is_empty() => return None,
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(_) => {
            errors.add(field, "A valid number is required.");
            return None;
        }
    };

    check(field, validate_price(&raw), errors).then(|| Price::new_unchecked(raw))
}

fn read_bio_videos(map: &Map<String, Value>, errors: &mut FieldErrors) -> Vec<String> {
    let items = match map.get("bio_videos") {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items,
        Some(_) => {
            errors.add("bio_videos", "Expected a list of items.");
            return Vec::new();
        }
    };

    if items.len() > MAX_BIO_VIDEOS {
        errors.add(
            "bio_videos",
            format!("Ensure this field has no more than {} elements.", MAX_BIO_VIDEOS),
        );
        return Vec::new();
    }

    let mut videos = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(s) if !s.trim().is_empty() => videos.push(s.clone()),
            _ => {
                errors.add("bio_videos", "Each entry must be a non-empty string.");
                return Vec::new();
            }
        }
    }
    videos
}

/// Validate the fields left over for an influencer profile.
///
/// Expects `iban` to have been normalised already; `status` is not accepted.
pub fn validate_influencer_profile(
    map: &Map<String, Value>,
) -> Result<NewInfluencerProfile, FieldErrors> {
    let mut errors = FieldErrors::new();

    for key in map.keys() {
        if !INFLUENCER_PROFILE_FIELDS.contains(&key.as_str()) {
            errors.add(key, UNKNOWN_FIELD);
        }
    }

    let full_name = read_optional_string(map, "full_name", &mut errors)
        .filter(|v| check("full_name", check_max_length(v, FULL_NAME_MAX_LENGTH), &mut errors));

    let biography = read_optional_string(map, "biography", &mut errors);

    let category = read_optional_string(map, "category", &mut errors).and_then(|v| {
        v.parse::<Category>()
            .map_err(|message| errors.add("category", message))
            .ok()
    });

    let profile_picture = read_optional_string(map, "profile_picture", &mut errors).filter(|v| {
        check(
            "profile_picture",
            check_max_length(v, PROFILE_PICTURE_MAX_LENGTH),
            &mut errors,
        )
    });

    let bio_videos = read_bio_videos(map, &mut errors);
    let daily_price = read_price(map, "daily_price", &mut errors);
    let weekly_price = read_price(map, "weekly_price", &mut errors);

    let mut links: Vec<Option<String>> = SOCIAL_LINK_FIELDS
        .iter()
        .map(|field| {
            read_optional_string(map, field, &mut errors)
                .filter(|v| check(field, validate_url(v), &mut errors))
        })
        .collect();

    let bank_name = read_optional_string(map, "bank_name", &mut errors)
        .filter(|v| check("bank_name", validate_bank_name(v), &mut errors));

    let iban = read_optional_string(map, "iban", &mut errors)
        .filter(|v| check("iban", check_max_length(v, IBAN_MAX_LENGTH), &mut errors));

    if !errors.is_empty() {
        return Err(errors);
    }

    let youtube_acc_link = links.pop().flatten();
    let snapchat_acc_link = links.pop().flatten();
    let tiktok_acc_link = links.pop().flatten();
    let instagram_acc_link = links.pop().flatten();

    Ok(NewInfluencerProfile {
        full_name,
        biography,
        category,
        profile_picture,
        bio_videos,
        daily_price,
        weekly_price,
        instagram_acc_link,
        tiktok_acc_link,
        snapchat_acc_link,
        youtube_acc_link,
        bank_name,
        iban,
    })
}

/// Login payload after field-level validation
#[derive(Debug, Clone, PartialEq)]
pub struct LoginInput {
    pub phone_number: String,
    pub password: String,
    pub role: Role,
}

/// Validate a login payload, collecting every field error.
pub fn validate_login(map: &Map<String, Value>) -> Result<LoginInput, FieldErrors> {
    let mut errors = FieldErrors::new();

    let phone_number = read_required_string(map, "phone_number", &mut errors).filter(|v| {
        check(
            "phone_number",
            check_max_length(v, PHONE_NUMBER_MAX_LENGTH),
            &mut errors,
        )
    });
    let password = read_required_string(map, "password", &mut errors);
    let role = read_required_string(map, "role", &mut errors)
        .and_then(|v| v.parse::<Role>().map_err(|m| errors.add("role", m)).ok());

    match (phone_number, password, role) {
        (Some(phone_number), Some(password), Some(role)) if errors.is_empty() => Ok(LoginInput {
            phone_number,
            password,
            role,
        }),
        _ => Err(errors),
    }
}

/// Partial bank-details update after validation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BankDetailsInput {
    pub bank_name: Option<String>,
    /// Normalised IBAN
    pub iban: Option<String>,
}

/// Validate a partial bank-details update. At least one of the two fields is needed.
pub fn validate_bank_details(map: &Map<String, Value>) -> Result<BankDetailsInput, FieldErrors> {
    let mut errors = FieldErrors::new();

    let bank_name = match map.get("bank_name") {
        None => None,
        Some(_) => read_required_string(map, "bank_name", &mut errors)
            .filter(|v| check("bank_name", validate_bank_name(v), &mut errors)),
    };

    let iban = match map.get("iban") {
        None => None,
        Some(_) => read_required_string(map, "iban", &mut errors).and_then(|v| {
            validate_iban(&v)
                .map_err(|message| errors.add("iban", message))
                .ok()
        }),
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    if bank_name.is_none() && iban.is_none() {
        return Err(FieldErrors::single(
            crate::error::NON_FIELD_ERRORS,
            "Provide bank_name and/or iban.",
        ));
    }

    Ok(BankDetailsInput { bank_name, iban })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_validate_phone_number() {
        assert!(validate_phone_number("+966501234567").is_ok());
        assert!(validate_phone_number("0501234567").is_ok());
        assert!(validate_phone_number("05-0123").is_err());
        assert_eq!(
            validate_phone_number("1234567890123456").unwrap_err(),
            "Ensure this value has at most 15 characters (it has 16)."
        );
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("sara.k+1@x").is_ok());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"a".repeat(151)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("test@example.com").is_ok());
        assert!(validate_email("test.user+tag@example.co.uk").is_ok());
        assert!(validate_email("invalid-email").is_err());
        assert!(validate_email("@example.com").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("longenough").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password(&"p".repeat(129)).is_err());
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://instagram.com/someone").is_ok());
        assert!(validate_url("http://www.tiktok.com/@someone?lang=en").is_ok());
        assert!(validate_url("ftp://example.com").is_err());
        assert!(validate_url("instagram.com/someone").is_err());
        assert!(validate_url(&format!("https://example.com/{}", "a".repeat(200))).is_err());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price("150").is_ok());
        assert!(validate_price("99.99").is_ok());
        assert!(validate_price("12345678.90").is_ok());
        assert_eq!(
            validate_price("1.999").unwrap_err(),
            "Ensure that there are no more than 2 decimal places."
        );
        assert_eq!(
            validate_price("123456789.01").unwrap_err(),
            "Ensure that there are no more than 10 digits in total."
        );
        assert!(validate_price("-5").is_err());
        assert!(validate_price("ten").is_err());
    }

    #[test]
    fn test_validate_account_collects_all_errors() {
        let map = object(json!({
            "phone_number": "abc",
            "email": "nope",
            "password": "short"
        }));
        let errors = validate_account(&map).unwrap_err();
        assert!(errors.contains("phone_number"));
        assert!(errors.contains("email"));
        assert!(errors.contains("password"));
        assert!(!errors.contains("username"));
    }

    #[test]
    fn test_validate_account_requires_fields() {
        let errors = validate_account(&Map::new()).unwrap_err();
        assert_eq!(errors.get("phone_number").unwrap(), &[REQUIRED.to_string()]);
        assert_eq!(errors.get("email").unwrap(), &[REQUIRED.to_string()]);
        assert_eq!(errors.get("password").unwrap(), &[REQUIRED.to_string()]);
    }

    #[test]
    fn test_username_defaults_to_phone_number() {
        let map = object(json!({
            "phone_number": "0501234567",
            "username": "",
            "email": "a@b.co",
            "password": "password123"
        }));
        let account = validate_account(&map).unwrap();
        assert_eq!(account.username, "0501234567");
    }

    #[test]
    fn test_client_profile_rejects_unknown_fields() {
        assert!(validate_client_profile(&Map::new()).is_ok());
        let errors = validate_client_profile(&object(json!({"full_name": "x"}))).unwrap_err();
        assert_eq!(errors.get("full_name").unwrap(), &[UNKNOWN_FIELD.to_string()]);
    }

    #[test]
    fn test_influencer_profile_happy_path() {
        let map = object(json!({
            "full_name": "Sara K",
            "category": "Travel",
            "daily_price": 100.5,
            "weekly_price": "600",
            "instagram_acc_link": "https://instagram.com/sara",
            "bio_videos": ["a.mp4", "b.mp4"],
            "bank_name": "Bank",
            "iban": "GB82WEST12345698765432"
        }));
        let profile = validate_influencer_profile(&map).unwrap();
        assert_eq!(profile.category, Some(Category::Travel));
        assert_eq!(profile.daily_price.unwrap().as_str(), "100.5");
        assert_eq!(profile.weekly_price.unwrap().as_str(), "600");
        assert_eq!(profile.instagram_acc_link.as_deref(), Some("https://instagram.com/sara"));
        assert_eq!(profile.tiktok_acc_link, None);
        assert_eq!(profile.bio_videos.len(), 2);
    }

    #[test]
    fn test_influencer_profile_collects_errors_and_refuses_status() {
        let map = object(json!({
            "category": "Cooking",
            "daily_price": "1.234",
            "youtube_acc_link": "not a url",
            "bio_videos": ["1", "2", "3", "4", "5", "6"],
            "status": "approved"
        }));
        let errors = validate_influencer_profile(&map).unwrap_err();
        for field in ["category", "daily_price", "youtube_acc_link", "bio_videos", "status"] {
            assert!(errors.contains(field), "expected error for {}", field);
        }
    }

    #[test]
    fn test_validate_login() {
        let input = validate_login(&object(json!({
            "phone_number": "0501234567",
            "password": "pw",
            "role": "client"
        })))
        .unwrap();
        assert_eq!(input.role, Role::Client);

        let errors = validate_login(&object(json!({"role": "admin"}))).unwrap_err();
        assert!(errors.contains("phone_number"));
        assert!(errors.contains("password"));
        assert!(errors.contains("role"));
    }

    #[test]
    fn test_validate_bank_details() {
        let input = validate_bank_details(&object(json!({"iban": "gb82 west 1234 5698 7654 32"})))
            .unwrap();
        assert_eq!(input.iban.as_deref(), Some("GB82WEST12345698765432"));
        assert_eq!(input.bank_name, None);

        let errors = validate_bank_details(&object(json!({
            "iban": "GB82WEST12345698765433",
            "bank_name": "x".repeat(151)
        })))
        .unwrap_err();
        assert_eq!(errors.get("iban").unwrap(), &[INVALID_IBAN.to_string()]);
        assert!(errors.contains("bank_name"));

        let errors = validate_bank_details(&Map::new()).unwrap_err();
        assert!(errors.contains(crate::error::NON_FIELD_ERRORS));
    }
}
