//! Content storage for uploaded media

use anyhow::Result;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Byte storage addressed by relative keys such as `influencer_bio_videos/<id>.mp4`
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `data` under `key`, replacing anything already there
    async fn save(&self, key: &str, data: &[u8]) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Public URL at which `key` can be fetched
    fn url(&self, key: &str) -> String;
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory holding stored files
    pub media_root: PathBuf,
    /// URL prefix under which `media_root` is served
    pub media_base_url: String,
}

impl StorageConfig {
    /// Create a new StorageConfig from environment variables
    ///
    /// # Environment Variables
    /// - `MEDIA_ROOT`: Directory for stored files (default: media)
    /// - `MEDIA_BASE_URL`: Public URL prefix for stored files (default: http://localhost:3000/media)
    pub fn from_env() -> Self {
        let media_root = std::env::var("MEDIA_ROOT").unwrap_or_else(|_| "media".to_string());
        let media_base_url = std::env::var("MEDIA_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3000/media".to_string());

        StorageConfig {
            media_root: PathBuf::from(media_root),
            media_base_url: media_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn build(&self) -> Arc<dyn ContentStore> {
        Arc::new(LocalContentStore::new(
            self.media_root.clone(),
            self.media_base_url.clone(),
        ))
    }
}

/// Stores content as files below a root directory
pub struct LocalContentStore {
    root: PathBuf,
    base_url: String,
}

impl LocalContentStore {
    pub fn new(root: PathBuf, base_url: String) -> Self {
        Self { root, base_url }
    }

    /// Resolve a key to a path that stays inside the root
    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let contained = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if key.is_empty() || !contained {
            anyhow::bail!("Invalid storage key: {}", key);
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ContentStore for LocalContentStore {
    async fn save(&self, key: &str, data: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await?;
        info!("Stored {} ({} bytes)", key, data.len());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }
}

/// In-memory content store that can be told to fail after a number of saves
#[cfg(test)]
#[derive(Default)]
pub(crate) struct MemoryContentStore {
    pub files: tokio::sync::Mutex<std::collections::BTreeMap<String, Vec<u8>>>,
    pub fail_after: Option<usize>,
    saves: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MemoryContentStore {
    pub fn failing_after(saves: usize) -> Self {
        Self {
            fail_after: Some(saves),
            ..Default::default()
        }
    }
}

#[cfg(test)]
#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn save(&self, key: &str, data: &[u8]) -> Result<()> {
        let done = self.saves.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.fail_after.is_some_and(|limit| done >= limit) {
            anyhow::bail!("disk full");
        }
        self.files.lock().await.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.files.lock().await.remove(key);
        Ok(())
    }

    fn url(&self, key: &str) -> String {
        format!("http://testserver/media/{}", key)
    }
}
