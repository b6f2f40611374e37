#![warn(clippy::unwrap_used)]

use std::time::Duration;

use reqwest::{Client, Response};
use serde::Deserialize;
use thiserror::Error;

pub mod classifier;
pub mod resource;
pub mod secrets;
pub mod storage;

pub use classifier::ClarifaiClient;
pub use secrets::{EnvironmentRef, EscClient, Secrets, StorageCredentials};
pub use storage::PcloudClient;

pub const ESC_SERVICE: &str = "Pulumi ESC";
pub const CLARIFAI_SERVICE: &str = "Clarifai";
pub const PCLOUD_SERVICE: &str = "pCloud";

#[derive(Error, Debug)]
pub enum ClientError {
    /// Connection, timeout or body transfer failure
    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The remote service answered but reported a failure
    #[error("{service} API error: {message}")]
    Remote {
        service: &'static str,
        message: String,
    },

    /// The remote answer could not be understood
    #[error("{service} returned an unexpected response: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },

    #[error("secret '{0}' is not defined in the environment")]
    MissingSecret(String),

    #[error("secrets access token is not configured")]
    MissingToken,

    #[error("invalid endpoint '{0}'")]
    InvalidEndpoint(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ClientError {
    fn transport(service: &'static str) -> impl FnOnce(reqwest::Error) -> ClientError {
        move |source| ClientError::Transport { service, source }
    }
}

pub(crate) fn http_client(service: &'static str, timeout: Duration) -> Result<Client, ClientError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("labeler/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(ClientError::transport(service))
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// Turns a non-success HTTP response into [`ClientError::Remote`], preferring
/// the `message`/`error` field of a JSON body over the raw text.
pub(crate) async fn remote_error(service: &'static str, response: Response) -> ClientError {
    let status = response.status();
    let text = match response.text().await {
        Ok(t) => t,
        Err(e) => return ClientError::transport(service)(e),
    };
    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .unwrap_or_else(|| {
            if text.is_empty() {
                status.to_string()
            } else {
                format!("{status}: {text}")
            }
        });
    ClientError::Remote { service, message }
}
