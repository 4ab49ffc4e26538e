//! Error types for the account service and their HTTP mapping

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::error;

use crate::{file_validators::AssetRejected, repositories::StoreError};

/// Key used for messages that do not belong to a single field
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// Validation messages grouped by field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an error map holding a single message for one field
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was recorded, the collected errors otherwise
    pub fn into_result(self) -> Result<(), ApiError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self))
        }
    }
}

/// Custom error type for the account service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Client-correctable input errors, keyed by field
    #[error("Validation failed: {0:?}")]
    Validation(FieldErrors),

    #[error("Invalid credentials.")]
    InvalidCredentials,

    #[error("Role mismatch.")]
    RoleMismatch,

    #[error("Influencer account not approved.")]
    NotApproved,

    /// File or batch rejected by the upload policy
    #[error("{0}")]
    Rejected(String),

    #[error("Unauthorized")]
    Unauthorized,

    /// Caller is authenticated but lacks the required profile or role
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error")]
    InternalServerError,
}

impl From<AssetRejected> for ApiError {
    fn from(rejection: AssetRejected) -> Self {
        ApiError::Rejected(rejection.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { field, message } => {
                ApiError::Validation(FieldErrors::single(field, message))
            }
            StoreError::NotFound => ApiError::NotFound("Resource not found".to_string()),
            StoreError::Invariant(message) => ApiError::Rejected(message),
            StoreError::Database(e) => {
                error!("Unexpected database error: {}", e);
                ApiError::InternalServerError
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(errors) => (StatusCode::BAD_REQUEST, json!(errors)),
            ApiError::InvalidCredentials | ApiError::RoleMismatch | ApiError::NotApproved => (
                StatusCode::BAD_REQUEST,
                json!({ "non_field_errors": [self.to_string()] }),
            ),
            ApiError::Rejected(message) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, json!({ "error": "Unauthorized" })),
            ApiError::Forbidden(message) => (StatusCode::FORBIDDEN, json!({ "detail": message })),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, json!({ "error": message })),
            ApiError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": "Internal server error" }),
            ),
        };

        (status, Json(body)).into_response()
    }
}

/// Type alias for service results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_field_errors_aggregate_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("email", "Enter a valid email address.");
        errors.add("email", "Ensure this field has no more than 254 characters.");
        errors.add("password", "This field is required.");

        assert_eq!(errors.get("email").unwrap().len(), 2);
        assert!(errors.contains("password"));
        assert!(errors.into_result().is_err());
        assert!(FieldErrors::new().into_result().is_ok());
    }

    #[tokio::test]
    async fn test_validation_error_renders_field_map() {
        let response =
            ApiError::Validation(FieldErrors::single("iban", "Invalid IBAN.")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await, json!({"iban": ["Invalid IBAN."]}));
    }

    #[tokio::test]
    async fn test_login_failures_are_non_field_errors() {
        let response = ApiError::RoleMismatch.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"non_field_errors": ["Role mismatch."]})
        );
    }

    #[tokio::test]
    async fn test_store_conflict_becomes_field_error() {
        let err: ApiError = StoreError::Conflict {
            field: "phone_number",
            message: "User with this phone number already exists.".to_string(),
        }
        .into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"phone_number": ["User with this phone number already exists."]})
        );
    }

    #[tokio::test]
    async fn test_forbidden_uses_detail_key() {
        let response =
            ApiError::Forbidden("Only influencers can set bank details.".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_json(response).await,
            json!({"detail": "Only influencers can set bank details."})
        );
    }
}
