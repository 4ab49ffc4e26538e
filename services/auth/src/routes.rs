//! Account service routes

use axum::{
    Extension, Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    AppState, assets,
    error::{ApiError, ApiResult, FieldErrors, NON_FIELD_ERRORS},
    file_validators::{MAX_IMAGE_SIZE, MAX_VIDEO_SIZE, UploadedFile},
    login,
    middleware::{AuthUser, admin_middleware, auth_middleware},
    models::MAX_BIO_VIDEOS,
    moderation,
    registration::{self, RegistrationRequest},
    validation,
};

const MULTIPART_OVERHEAD: usize = 1024 * 1024;
const PROFILE_PICTURE_BODY_LIMIT: usize = MAX_IMAGE_SIZE as usize + MULTIPART_OVERHEAD;
const BIO_VIDEOS_BODY_LIMIT: usize = MAX_BIO_VIDEOS * MAX_VIDEO_SIZE as usize + MULTIPART_OVERHEAD;

/// Response for token refresh
#[derive(Serialize)]
pub struct RefreshTokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

/// Create the router for the account service
pub fn create_router(state: AppState) -> Router {
    let influencer = Router::new()
        .route(
            "/api/influencer/upload/profile-picture/",
            post(upload_profile_picture).layer(DefaultBodyLimit::max(PROFILE_PICTURE_BODY_LIMIT)),
        )
        .route("/influencer/bank/", post(update_bank_details))
        .route(
            "/api/influencer/upload/bio-videos/",
            post(upload_bio_videos).layer(DefaultBodyLimit::max(BIO_VIDEOS_BODY_LIMIT)),
        )
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    let admin = Router::new()
        .route(
            "/api/admin/influencers/:account_id/status/",
            post(update_influencer_status),
        )
        .route_layer(from_fn_with_state(state.clone(), admin_middleware));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/register/", post(register))
        .route("/api/login/", post(login))
        .route("/api/token/refresh/", post(refresh_token))
        .merge(influencer)
        .merge(admin)
        .nest_service("/media", ServeDir::new(&state.media_root))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// JSON request bodies must be objects
fn into_object(payload: Value) -> ApiResult<Map<String, Value>> {
    match payload {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::Validation(FieldErrors::single(
            NON_FIELD_ERRORS,
            "Invalid data. Expected a dictionary.",
        ))),
    }
}

fn multipart_rejected(e: MultipartError) -> ApiError {
    warn!("Malformed multipart body: {}", e);
    ApiError::Rejected(e.body_text())
}

/// Collect every file sent under `field_name`.
///
/// Bodies are read chunk by chunk. Only the first `max_files` files are kept,
/// and a file stops being kept once it grows past `max_size`. Anything not
/// kept is drained and recorded by name and size, so the upload policy still
/// rejects it.
async fn read_files(
    multipart: &mut Multipart,
    field_name: &str,
    max_size: u64,
    max_files: usize,
) -> ApiResult<Vec<UploadedFile>> {
    let mut files = Vec::new();
    while let Some(mut field) = multipart.next_field().await.map_err(multipart_rejected)? {
        if field.name() != Some(field_name) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);

        let mut kept = (files.len() < max_files).then(Vec::new);
        let mut size: u64 = 0;
        while let Some(chunk) = field.chunk().await.map_err(multipart_rejected)? {
            size += chunk.len() as u64;
            if size > max_size {
                kept = None;
            }
            if let Some(buffer) = kept.as_mut() {
                buffer.extend_from_slice(&chunk);
            }
        }

        files.push(match kept {
            Some(buffer) => UploadedFile::new(filename, content_type, Bytes::from(buffer)),
            None => {
                debug!("Drained {} ({} bytes) without buffering", filename, size);
                UploadedFile::metadata_only(filename, content_type, size)
            }
        });
    }
    Ok(files)
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match &state.db_pool {
        Some(pool) => match common::database::health_check(pool).await {
            Ok(true) => "up",
            _ => "down",
        },
        None => "not configured",
    };

    Json(json!({
        "status": if database == "down" { "degraded" } else { "ok" },
        "service": "auth-service",
        "database": database,
    }))
}

/// Account registration endpoint
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> ApiResult<impl IntoResponse> {
    let request = RegistrationRequest::decode(payload).map_err(ApiError::Validation)?;
    info!("Registration attempt for role {}", request.role());

    let registered =
        registration::register(state.store.as_ref(), &state.jwt_service, request).await?;

    Ok((StatusCode::CREATED, Json(registered)))
}

/// Login endpoint
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> ApiResult<impl IntoResponse> {
    let payload = into_object(payload)?;
    let logged_in = login::login(state.store.as_ref(), &state.jwt_service, &payload).await?;

    Ok((StatusCode::OK, Json(logged_in)))
}

/// Refresh token endpoint
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> ApiResult<impl IntoResponse> {
    let payload = into_object(payload)?;
    let mut errors = FieldErrors::new();
    let token = validation::read_required_string(&payload, "refresh_token", &mut errors);
    errors.into_result()?;
    let token = token.ok_or(ApiError::Unauthorized)?;

    let claims = state
        .jwt_service
        .validate_refresh_token(&token)
        .map_err(|_| ApiError::Unauthorized)?;

    let account = state
        .store
        .find_by_id(claims.sub)
        .await?
        .filter(|account| account.is_active)
        .ok_or(ApiError::Unauthorized)?;

    let access_token = state
        .jwt_service
        .generate_access_token(account.id, account.role)
        .map_err(|e| {
            error!("Failed to generate access token: {}", e);
            ApiError::InternalServerError
        })?;

    Ok((
        StatusCode::OK,
        Json(RefreshTokenResponse {
            access_token,
            token_type: "Bearer",
            expires_in: state.jwt_service.access_token_expiry(),
        }),
    ))
}

/// Profile picture upload endpoint (multipart field `profile_picture`)
pub async fn upload_profile_picture(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let file = read_files(&mut multipart, "profile_picture", MAX_IMAGE_SIZE, 1)
        .await?
        .into_iter()
        .next();

    let uploaded = assets::upload_profile_picture(
        state.store.as_ref(),
        state.content_store.as_ref(),
        user.id,
        file,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(uploaded)))
}

/// Bank details endpoint
pub async fn update_bank_details(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<Value>,
) -> ApiResult<impl IntoResponse> {
    let payload = into_object(payload)?;
    let updated = assets::update_bank_details(state.store.as_ref(), user.id, &payload).await?;

    Ok((StatusCode::OK, Json(updated)))
}

/// Bio video batch upload endpoint (repeated multipart field `bio_videos`)
pub async fn upload_bio_videos(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let files = read_files(&mut multipart, "bio_videos", MAX_VIDEO_SIZE, MAX_BIO_VIDEOS).await?;

    let uploaded = assets::upload_bio_videos(
        state.store.as_ref(),
        state.content_store.as_ref(),
        user.id,
        files,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(uploaded)))
}

/// Administrative approval status update
pub async fn update_influencer_status(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
    Json(payload): Json<Value>,
) -> ApiResult<impl IntoResponse> {
    let payload = into_object(payload)?;
    let status = moderation::parse_status(&payload)?;

    let updated = moderation::update_status(
        state.store.as_ref(),
        state.notifier.as_ref(),
        &state.notification_sender,
        account_id,
        status,
    )
    .await?;

    Ok((StatusCode::OK, Json(updated)))
}
