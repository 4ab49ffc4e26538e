//! Upload policy checks for influencer media
//!
//! Both validators only look at file metadata (name, size, declared content
//! type), so they can run before a single byte is written to storage.

use axum::body::Bytes;
use thiserror::Error;

pub const MAX_VIDEO_SIZE: u64 = 150 * 1024 * 1024;
pub const ALLOWED_VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "mkv"];
pub const ALLOWED_VIDEO_CONTENT_TYPES: &[&str] = &[
    "video/mp4",
    "video/webm",
    "video/quicktime",
    "video/x-matroska",
];

pub const MAX_IMAGE_SIZE: u64 = 5 * 1024 * 1024;
pub const ALLOWED_IMAGE_SUFFIXES: &[&str] = &[".jpg", ".jpeg", ".png", ".webp"];

/// A file policy violation; the message is surfaced to the uploader verbatim
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetRejected {
    #[error("File too large. Max size is {} MB", MAX_VIDEO_SIZE / (1024 * 1024))]
    VideoTooLarge,

    #[error("Unsupported file extension.")]
    UnsupportedVideoExtension,

    #[error("Unsupported content type.")]
    UnsupportedVideoContentType,

    #[error("Profile picture size should not exceed 5MB.")]
    ImageTooLarge,

    #[error("Unsupported file type. Allowed types: JPG, JPEG, PNG, WEBP.")]
    UnsupportedImageType,
}

/// What the validators need to know about an upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta<'a> {
    pub filename: &'a str,
    pub size: u64,
    pub content_type: Option<&'a str>,
}

/// A file received from a multipart request
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
    size: u64,
}

impl UploadedFile {
    pub fn new(filename: String, content_type: Option<String>, data: Bytes) -> Self {
        let size = data.len() as u64;
        Self {
            filename,
            content_type,
            data,
            size,
        }
    }

    /// A file whose body was drained without being kept; only its size is known
    pub fn metadata_only(filename: String, content_type: Option<String>, size: u64) -> Self {
        Self {
            filename,
            content_type,
            data: Bytes::new(),
            size,
        }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn meta(&self) -> FileMeta<'_> {
        FileMeta {
            filename: &self.filename,
            size: self.size(),
            content_type: self.content_type.as_deref(),
        }
    }
}

/// Extension of a file name: the segment after the last dot, if any.
///
/// `my.video.mp4` yields `mp4`, and `clip.mp4.exe` yields `exe`.
pub fn video_extension(filename: &str) -> Option<&str> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
}

/// Validate a bio video against the size, extension and content-type policy.
pub fn validate_video(file: &FileMeta<'_>) -> Result<(), AssetRejected> {
    if file.size > MAX_VIDEO_SIZE {
        return Err(AssetRejected::VideoTooLarge);
    }

    let extension_allowed = video_extension(file.filename)
        .map(|ext| {
            ALLOWED_VIDEO_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false);
    if !extension_allowed {
        return Err(AssetRejected::UnsupportedVideoExtension);
    }

    if let Some(content_type) = file.content_type.filter(|ct| !ct.is_empty()) {
        if !ALLOWED_VIDEO_CONTENT_TYPES.contains(&content_type) {
            return Err(AssetRejected::UnsupportedVideoContentType);
        }
    }

    Ok(())
}

/// Validate a profile picture against the size and suffix policy.
pub fn validate_image(file: &FileMeta<'_>) -> Result<(), AssetRejected> {
    if file.size > MAX_IMAGE_SIZE {
        return Err(AssetRejected::ImageTooLarge);
    }

    let name = file.filename.to_ascii_lowercase();
    if !ALLOWED_IMAGE_SUFFIXES
        .iter()
        .any(|suffix| name.ends_with(suffix))
    {
        return Err(AssetRejected::UnsupportedImageType);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta<'a>(filename: &'a str, size: u64, content_type: Option<&'a str>) -> FileMeta<'a> {
        FileMeta {
            filename,
            size,
            content_type,
        }
    }

    #[test]
    fn test_video_size_ceiling_is_inclusive() {
        assert_eq!(validate_video(&meta("clip.mp4", MAX_VIDEO_SIZE, None)), Ok(()));
        assert_eq!(
            validate_video(&meta("clip.mp4", MAX_VIDEO_SIZE + 1, None)),
            Err(AssetRejected::VideoTooLarge)
        );
    }

    #[test]
    fn test_video_extension_is_case_insensitive() {
        assert_eq!(validate_video(&meta("clip.MP4", 10, None)), Ok(()));
        assert_eq!(validate_video(&meta("clip.Mkv", 10, None)), Ok(()));
        assert_eq!(
            validate_video(&meta("clip.exe", 10, None)),
            Err(AssetRejected::UnsupportedVideoExtension)
        );
    }

    #[test]
    fn test_video_extension_uses_last_dot() {
        assert_eq!(validate_video(&meta("my.video.mp4", 10, None)), Ok(()));
        assert_eq!(
            validate_video(&meta("clip.mp4.exe", 10, None)),
            Err(AssetRejected::UnsupportedVideoExtension)
        );
        assert_eq!(
            validate_video(&meta("noextension", 10, None)),
            Err(AssetRejected::UnsupportedVideoExtension)
        );
        assert_eq!(
            validate_video(&meta("trailingdot.", 10, None)),
            Err(AssetRejected::UnsupportedVideoExtension)
        );
    }

    #[test]
    fn test_video_content_type_checked_only_when_declared() {
        assert_eq!(validate_video(&meta("clip.mov", 10, Some("video/quicktime"))), Ok(()));
        assert_eq!(validate_video(&meta("clip.mov", 10, Some(""))), Ok(()));
        assert_eq!(
            validate_video(&meta("clip.mp4", 10, Some("application/octet-stream"))),
            Err(AssetRejected::UnsupportedVideoContentType)
        );
    }

    #[test]
    fn test_size_is_checked_before_extension() {
        assert_eq!(
            validate_video(&meta("clip.exe", MAX_VIDEO_SIZE + 1, None)),
            Err(AssetRejected::VideoTooLarge)
        );
    }

    #[test]
    fn test_image_limits() {
        assert_eq!(validate_image(&meta("me.JPEG", MAX_IMAGE_SIZE, None)), Ok(()));
        assert_eq!(validate_image(&meta("me.webp", 1, None)), Ok(()));
        assert_eq!(
            validate_image(&meta("me.png", MAX_IMAGE_SIZE + 1, None)),
            Err(AssetRejected::ImageTooLarge)
        );
        assert_eq!(
            validate_image(&meta("me.gif", 1, None)),
            Err(AssetRejected::UnsupportedImageType)
        );
        assert_eq!(
            validate_image(&meta("png", 1, None)),
            Err(AssetRejected::UnsupportedImageType)
        );
    }

    #[test]
    fn test_rejection_messages() {
        assert_eq!(
            AssetRejected::VideoTooLarge.to_string(),
            "File too large. Max size is 150 MB"
        );
        assert_eq!(
            AssetRejected::ImageTooLarge.to_string(),
            "Profile picture size should not exceed 5MB."
        );
    }

    #[test]
    fn test_drained_file_keeps_its_size() {
        let file = UploadedFile::metadata_only(
            "huge.mp4".to_string(),
            Some("video/mp4".to_string()),
            MAX_VIDEO_SIZE + 1,
        );
        assert!(file.data.is_empty());
        assert_eq!(validate_video(&file.meta()), Err(AssetRejected::VideoTooLarge));
    }
}
