use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;
use tracing::debug;

use secondserve_shared::backend::{BackendResult, ObjectStorage};

use super::Project;

/// Object storage under `/storage/v1`.
pub struct RemoteStorage {
    project: Project,
}

impl RemoteStorage {
    pub fn new(project: Project) -> Self {
        Self { project }
    }
}

#[async_trait]
impl ObjectStorage for RemoteStorage {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> BackendResult<()> {
        let size = bytes.len();
        let resp = self
            .project
            .request(Method::POST, &format!("/storage/v1/object/{bucket}/{key}"))
            .header("content-type", content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await
            .map_err(super::transport)?;
        super::check(resp).await?;
        debug!(bucket, key, size, "Uploaded object");
        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{bucket}/{key}",
            self.project.base_url()
        )
    }
}
