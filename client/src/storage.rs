use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response};
use serde::Deserialize;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use crate::resource::Resource;
use crate::secrets::StorageCredentials;
use crate::{http_client, remote_error, ClientError, PCLOUD_SERVICE};

#[derive(Deserialize)]
struct Reply {
    result: u32,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    auth: Option<String>,
    #[serde(default)]
    metadata: Vec<FileMetadata>,
}

/// Remote file description returned after an upload.
#[derive(Deserialize, Debug, Clone)]
pub struct FileMetadata {
    pub name: String,
    #[serde(default)]
    pub fileid: u64,
}

/// Client for the pCloud HTTP JSON API.
pub struct PcloudClient {
    http: Client,
    api: Resource,
}

impl PcloudClient {
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        Ok(Self {
            http: http_client(PCLOUD_SERVICE, timeout)?,
            api: Resource::new(api_url)?,
        })
    }

    /// Logs in and returns an auth token.
    pub async fn login(&self, credentials: &StorageCredentials) -> Result<String, ClientError> {
        let response = self
            .http
            .post(self.method("userinfo").to_url())
            .form(&[
                ("getauth", "1"),
                ("logout", "1"),
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
            ])
            .send()
            .await
            .map_err(ClientError::transport(PCLOUD_SERVICE))?;

        read_reply(response).await?.auth.ok_or(ClientError::Decode {
            service: PCLOUD_SERVICE,
            message: "login reply has no auth token".to_owned(),
        })
    }

    /// Uploads one local file into `folder`, streaming it from disk.
    pub async fn upload_file(
        &self,
        auth: &str,
        file: &Path,
        folder: &str,
    ) -> Result<Vec<FileMetadata>, ClientError> {
        let file_name = file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_owned();

        let f = File::open(file).await?;
        let len = f.metadata().await?.len();
        let stream = Body::wrap_stream(ReaderStream::new(f));
        let part = Part::stream_with_length(stream, len).file_name(file_name);
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(self.method("uploadfile").to_url())
            .query(&[("auth", auth), ("path", folder), ("nopartial", "1")])
            .multipart(form)
            .send()
            .await
            .map_err(ClientError::transport(PCLOUD_SERVICE))?;

        Ok(read_reply(response).await?.metadata)
    }

    pub async fn logout(&self, auth: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .get(self.method("logout").to_url())
            .query(&[("auth", auth)])
            .send()
            .await
            .map_err(ClientError::transport(PCLOUD_SERVICE))?;
        read_reply(response).await.map(|_| ())
    }

    /// Authenticates, uploads `file` into `folder` and releases the token.
    pub async fn upload(
        &self,
        credentials: &StorageCredentials,
        file: &Path,
        folder: &str,
    ) -> Result<Vec<FileMetadata>, ClientError> {
        let auth = self.login(credentials).await?;
        let uploaded = self.upload_file(&auth, file, folder).await;
        if let Err(e) = self.logout(&auth).await {
            tracing::warn!("pCloud logout failed: {e}");
        }
        uploaded
    }

    fn method(&self, name: &str) -> Resource {
        let mut r = self.api.clone();
        r.append_path(name);
        r
    }
}

async fn read_reply(response: Response) -> Result<Reply, ClientError> {
    if !response.status().is_success() {
        return Err(remote_error(PCLOUD_SERVICE, response).await);
    }
    let reply: Reply = response.json().await.map_err(|e| ClientError::Decode {
        service: PCLOUD_SERVICE,
        message: e.to_string(),
    })?;
    if reply.result != 0 {
        let message = reply
            .error
            .unwrap_or_else(|| format!("result code {}", reply.result));
        return Err(ClientError::Remote {
            service: PCLOUD_SERVICE,
            message,
        });
    }
    Ok(reply)
}
