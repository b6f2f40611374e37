use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::resource::Resource;
use crate::{http_client, ClientError, CLARIFAI_SERVICE};

/// General image recognition model.
pub const GENERAL_MODEL_ID: &str = "aaa03c23b3724a16a56b629203edc62c";

/// Status code of a successful prediction.
pub const SUCCESS: u32 = 10000;

#[derive(Serialize)]
struct PostModelOutputsRequest<'a> {
    inputs: [Input<'a>; 1],
}

#[derive(Serialize)]
struct Input<'a> {
    data: InputData<'a>,
}

#[derive(Serialize)]
struct InputData<'a> {
    image: Image<'a>,
}

#[derive(Serialize)]
struct Image<'a> {
    base64: &'a str,
}

#[derive(Deserialize)]
struct MultiOutputResponse {
    status: Status,
    #[serde(default)]
    outputs: Vec<Output>,
}

#[derive(Deserialize)]
struct Status {
    code: u32,
    #[serde(default)]
    description: String,
}

#[derive(Deserialize)]
struct Output {
    #[serde(default)]
    data: OutputData,
}

#[derive(Deserialize, Default)]
struct OutputData {
    #[serde(default)]
    concepts: Vec<Concept>,
}

#[derive(Deserialize)]
struct Concept {
    name: String,
    #[serde(default)]
    value: f32,
}

/// Client for the Clarifai model outputs API.
pub struct ClarifaiClient {
    http: Client,
    outputs: Resource,
}

impl ClarifaiClient {
    pub fn new(api_url: &str, model_id: &str, timeout: Duration) -> Result<Self, ClientError> {
        let mut outputs = Resource::new(api_url)?;
        outputs
            .append_path("v2/models")
            .append_segment(model_id)
            .append_path("outputs");
        Ok(Self {
            http: http_client(CLARIFAI_SERVICE, timeout)?,
            outputs,
        })
    }

    /// Sends one image and returns the concept names of the first output,
    /// in the order the model ranked them.
    pub async fn classify(&self, image: &[u8], api_key: &str) -> Result<Vec<String>, ClientError> {
        let encoded = STANDARD.encode(image);
        let request = PostModelOutputsRequest {
            inputs: [Input {
                data: InputData {
                    image: Image { base64: &encoded },
                },
            }],
        };

        let response = self
            .http
            .post(self.outputs.to_url())
            .header(AUTHORIZATION, format!("Key {api_key}"))
            .json(&request)
            .send()
            .await
            .map_err(ClientError::transport(CLARIFAI_SERVICE))?;

        let http_status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(ClientError::transport(CLARIFAI_SERVICE))?;

        // Failed predictions still carry a status object, whatever the HTTP code.
        let reply: MultiOutputResponse = match serde_json::from_slice(&body) {
            Ok(r) => r,
            Err(_) if !http_status.is_success() => {
                return Err(ClientError::Remote {
                    service: CLARIFAI_SERVICE,
                    message: http_status.to_string(),
                });
            }
            Err(e) => {
                return Err(ClientError::Decode {
                    service: CLARIFAI_SERVICE,
                    message: e.to_string(),
                });
            }
        };

        if reply.status.code != SUCCESS {
            return Err(ClientError::Remote {
                service: CLARIFAI_SERVICE,
                message: reply.status.description,
            });
        }

        let Some(output) = reply.outputs.into_iter().next() else {
            return Err(ClientError::Remote {
                service: CLARIFAI_SERVICE,
                message: "response contained no outputs".to_owned(),
            });
        };

        for concept in &output.data.concepts {
            tracing::debug!("concept {} score {:.4}", concept.name, concept.value);
        }
        Ok(output.data.concepts.into_iter().map(|c| c.name).collect())
    }
}
