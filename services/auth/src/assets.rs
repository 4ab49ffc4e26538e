//! Influencer profile assets: profile picture, bank details and bio videos
//!
//! Every operation acts on the caller's own influencer profile. Callers
//! without one are refused before any input is looked at.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    file_validators::{self, UploadedFile},
    iban,
    models::{BioVideoLimitExceeded, InfluencerProfile, MAX_BIO_VIDEOS, check_bio_video_count},
    repositories::AccountStore,
    storage::ContentStore,
    validation,
};

pub const PROFILE_PICTURE_PREFIX: &str = "influencer_profiles";
pub const BIO_VIDEO_PREFIX: &str = "influencer_bio_videos";
pub const BANK_DETAILS_UPDATED: &str = "Bank details updated.";

#[derive(Debug, Serialize)]
pub struct ProfilePictureUploaded {
    pub profile_picture_url: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct BankDetailsUpdated {
    pub message: &'static str,
    pub iban_masked: Option<String>,
    pub bank_name: Option<String>,
}

/// Metadata for one stored bio video
#[derive(Debug, Serialize, PartialEq)]
pub struct StoredVideo {
    pub filename: String,
    pub path: String,
    pub url: String,
    pub size: u64,
}

#[derive(Debug, Serialize)]
pub struct BioVideosUploaded {
    pub uploaded: Vec<StoredVideo>,
}

async fn require_influencer(
    store: &dyn AccountStore,
    account_id: Uuid,
    refusal: &str,
) -> ApiResult<InfluencerProfile> {
    store
        .find_influencer_profile(account_id)
        .await?
        .ok_or_else(|| ApiError::Forbidden(refusal.to_string()))
}

/// Base name of an uploaded file with anything outside `[A-Za-z0-9._-]` replaced by `_`
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    base.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Storage key for a bio video: a random identifier plus the lowercased extension
pub fn bio_video_key(filename: &str) -> String {
    let extension = file_validators::video_extension(filename)
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default();
    format!("{}/{}{}", BIO_VIDEO_PREFIX, Uuid::new_v4().simple(), extension)
}

/// Store a new profile picture for the caller and point the profile at it
pub async fn upload_profile_picture(
    store: &dyn AccountStore,
    content: &dyn ContentStore,
    account_id: Uuid,
    file: Option<UploadedFile>,
) -> ApiResult<ProfilePictureUploaded> {
    require_influencer(store, account_id, "Only influencers can upload a profile picture.").await?;

    let file = file.ok_or_else(|| ApiError::Rejected("No file provided.".to_string()))?;
    file_validators::validate_image(&file.meta())?;

    let key = format!(
        "{}/{}/{}",
        PROFILE_PICTURE_PREFIX,
        account_id,
        sanitize_filename(&file.filename)
    );

    content.save(&key, &file.data).await.map_err(|e| {
        error!("Failed to store profile picture {}: {}", key, e);
        ApiError::InternalServerError
    })?;

    store.set_profile_picture(account_id, &key).await?;

    info!("Profile picture updated for influencer {}", account_id);
    Ok(ProfilePictureUploaded {
        profile_picture_url: content.url(&key),
    })
}

/// Partially update the caller's bank name and IBAN
pub async fn update_bank_details(
    store: &dyn AccountStore,
    account_id: Uuid,
    payload: &Map<String, Value>,
) -> ApiResult<BankDetailsUpdated> {
    require_influencer(store, account_id, "Only influencers can set bank details.").await?;

    let input = validation::validate_bank_details(payload).map_err(ApiError::Validation)?;

    let profile = store
        .update_bank_details(account_id, input.bank_name.as_deref(), input.iban.as_deref())
        .await?;

    let iban_masked = profile.iban.as_deref().map(iban::mask);
    info!(
        "Bank details updated for influencer {} (iban {})",
        account_id,
        iban_masked.as_deref().unwrap_or("unset")
    );

    Ok(BankDetailsUpdated {
        message: BANK_DETAILS_UPDATED,
        iban_masked,
        bank_name: profile.bank_name,
    })
}

async fn discard(content: &dyn ContentStore, keys: &[String]) {
    for key in keys {
        if let Err(e) = content.delete(key).await {
            warn!("Failed to remove {} after aborted upload: {}", key, e);
        }
    }
}

/// Store a batch of bio videos and append them to the caller's profile.
///
/// The batch is all-or-nothing: every file is validated before the first
/// write, and files already written are removed if a later step fails.
pub async fn upload_bio_videos(
    store: &dyn AccountStore,
    content: &dyn ContentStore,
    account_id: Uuid,
    files: Vec<UploadedFile>,
) -> ApiResult<BioVideosUploaded> {
    let profile =
        require_influencer(store, account_id, "Only influencers can upload bio videos.").await?;

    if files.is_empty() {
        return Err(ApiError::Rejected("No files provided.".to_string()));
    }
    if files.len() > MAX_BIO_VIDEOS {
        return Err(ApiError::Rejected(format!(
            "Max {} videos allowed.",
            MAX_BIO_VIDEOS
        )));
    }

    for file in &files {
        file_validators::validate_video(&file.meta()).map_err(|e| {
            ApiError::Rejected(format!("File validation failed for {}: {}", file.filename, e))
        })?;
    }

    check_bio_video_count(profile.bio_videos.len() + files.len())
        .map_err(|e: BioVideoLimitExceeded| ApiError::Rejected(e.to_string()))?;

    let mut keys = Vec::with_capacity(files.len());
    let mut uploaded = Vec::with_capacity(files.len());
    for file in &files {
        let key = bio_video_key(&file.filename);
        if let Err(e) = content.save(&key, &file.data).await {
            error!("Failed to store bio video {}: {}", key, e);
            discard(content, &keys).await;
            return Err(ApiError::InternalServerError);
        }

        uploaded.push(StoredVideo {
            filename: file.filename.clone(),
            path: key.clone(),
            url: content.url(&key),
            size: file.size(),
        });
        keys.push(key);
    }

    if let Err(e) = store.append_bio_videos(account_id, &keys).await {
        discard(content, &keys).await;
        return Err(e.into());
    }

    info!("Stored {} bio videos for influencer {}", keys.len(), account_id);
    Ok(BioVideosUploaded { uploaded })
}
