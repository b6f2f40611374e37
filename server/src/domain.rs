use std::path::{Path, PathBuf};

use async_trait::async_trait;
use client::{
    ClarifaiClient, ClientError, EscClient, PcloudClient, Secrets, StorageCredentials,
};

/// Image accepted by the upload receiver and stored on local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    /// Where the image bytes were written
    pub path: PathBuf,
    /// Sanitized file name the image was stored under
    pub file_name: String,
}

#[async_trait]
pub trait SecretsSource: Send + Sync {
    async fn resolve(&self) -> Result<Secrets, ClientError>;
}

#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, image: &[u8], api_key: &str) -> Result<Vec<String>, ClientError>;
}

#[async_trait]
pub trait ResultArchive: Send + Sync {
    async fn upload(
        &self,
        file: &Path,
        folder: &str,
        credentials: &StorageCredentials,
    ) -> Result<(), ClientError>;
}

#[async_trait]
impl SecretsSource for EscClient {
    async fn resolve(&self) -> Result<Secrets, ClientError> {
        EscClient::resolve(self).await
    }
}

#[async_trait]
impl Classifier for ClarifaiClient {
    async fn classify(&self, image: &[u8], api_key: &str) -> Result<Vec<String>, ClientError> {
        ClarifaiClient::classify(self, image, api_key).await
    }
}

#[async_trait]
impl ResultArchive for PcloudClient {
    async fn upload(
        &self,
        file: &Path,
        folder: &str,
        credentials: &StorageCredentials,
    ) -> Result<(), ClientError> {
        let uploaded = PcloudClient::upload(self, credentials, file, folder).await?;
        for f in uploaded {
            tracing::debug!("stored {} as file id {}", f.name, f.fileid);
        }
        Ok(())
    }
}
