//! Filesystem object storage for listing images.
//!
//! Objects live at `{base}/{bucket}/{key}` where a key is one or more
//! `/`-separated segments (`{user}/{millis}-{rand}.jpg`). Uploads never
//! overwrite an existing object.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::{debug, info};

use secondserve_shared::backend::{BackendResult, ObjectStorage};
use secondserve_shared::BackendError;

use crate::error::{Result, StoreError};

/// Verify that a resolved path stays within the expected base directory.
fn ensure_within(base: &Path, target: &Path) -> Result<PathBuf> {
    let mut resolved = base.to_path_buf();
    for component in target.strip_prefix(base).unwrap_or(target).components() {
        match component {
            Component::Normal(c) => resolved.push(c),
            _ => {
                return Err(StoreError::InvalidKey(target.display().to_string()));
            }
        }
    }
    if !resolved.starts_with(base) {
        return Err(StoreError::InvalidKey(target.display().to_string()));
    }
    Ok(resolved)
}

fn check_segment(segment: &str) -> Result<()> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains('\\')
        || segment.contains('\0')
    {
        return Err(StoreError::InvalidKey(segment.to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct BlobStore {
    base_path: PathBuf,
    public_base: String,
}

impl BlobStore {
    /// Create the store rooted at `base_path`. Public URLs are `file://`
    /// URLs into that directory.
    pub async fn new(base_path: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_path).await?;
        let base_path = base_path.canonicalize().unwrap_or(base_path);
        let public_base = format!("file://{}", base_path.display());

        info!(path = %base_path.display(), "Blob store initialized");

        Ok(Self {
            base_path,
            public_base,
        })
    }

    /// Serve public URLs from `public_base` instead of `file://`.
    pub fn with_public_base(mut self, public_base: impl Into<String>) -> Self {
        self.public_base = public_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub async fn read(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let path = self.object_path(bucket, key)?;
        if !path.exists() {
            return Err(StoreError::NotFound);
        }
        Ok(fs::read(&path).await?)
    }

    async fn write_new(&self, bucket: &str, key: &str, data: &[u8]) -> BackendResult<()> {
        if data.is_empty() {
            return Err(BackendError::api(400, "Empty object"));
        }

        let path = self.object_path(bucket, key)?;
        if path.exists() {
            return Err(BackendError::api(409, "The resource already exists"));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(StoreError::from)?;
        }
        fs::write(&path, data).await.map_err(StoreError::from)?;

        debug!(bucket, key, size = data.len(), "Stored object");
        Ok(())
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        check_segment(bucket)?;
        let mut raw = self.base_path.join(bucket);
        for segment in key.split('/') {
            check_segment(segment)?;
            raw.push(segment);
        }
        ensure_within(&self.base_path, &raw)
    }
}

#[async_trait]
impl ObjectStorage for BlobStore {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> BackendResult<()> {
        debug!(bucket, key, content_type, "Uploading object");
        self.write_new(bucket, key, &bytes).await
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/{}/{}", self.public_base, bucket, key)
    }
}
