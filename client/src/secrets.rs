use std::fmt;
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::resource::Resource;
use crate::{http_client, remote_error, ClientError, ESC_SERVICE};

pub const STORAGE_USERNAME_KEY: &str = "pcloud:username";
pub const STORAGE_PASSWORD_KEY: &str = "pcloud:password";
pub const STORAGE_FOLDER_KEY: &str = "pcloud:folderPath";
pub const CLASSIFIER_API_KEY: &str = "clarifai:apiKey";

const ACCEPT_ESC: &str = "application/vnd.pulumi+8";
const PULUMI_CONFIG: &str = "pulumiConfig";

/// Cloud storage login.
#[derive(Clone)]
pub struct StorageCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for StorageCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// The four values every labeling run needs.
#[derive(Clone)]
pub struct Secrets {
    pub storage: StorageCredentials,
    pub storage_folder: String,
    pub classifier_api_key: String,
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("storage", &self.storage)
            .field("storage_folder", &self.storage_folder)
            .field("classifier_api_key", &"***")
            .finish()
    }
}

impl Secrets {
    /// Picks the required keys out of resolved environment values.
    pub fn from_values(values: &Map<String, Value>) -> Result<Self, ClientError> {
        Ok(Self {
            storage: StorageCredentials {
                username: required(values, STORAGE_USERNAME_KEY)?,
                password: required(values, STORAGE_PASSWORD_KEY)?,
            },
            storage_folder: required(values, STORAGE_FOLDER_KEY)?,
            classifier_api_key: required(values, CLASSIFIER_API_KEY)?,
        })
    }
}

/// Fully qualified name of a secrets environment.
#[derive(Clone, Debug)]
pub struct EnvironmentRef {
    pub org: String,
    pub project: String,
    pub environment: String,
}

#[derive(Deserialize)]
struct OpenSession {
    id: String,
}

#[derive(Deserialize)]
struct OpenEnvironment {
    #[serde(default)]
    properties: Map<String, Value>,
}

/// Client for the Pulumi ESC environments API.
pub struct EscClient {
    http: Client,
    api: Resource,
    token: Option<String>,
    environment: EnvironmentRef,
}

impl EscClient {
    pub fn new(
        api_url: &str,
        token: Option<String>,
        environment: EnvironmentRef,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            http: http_client(ESC_SERVICE, timeout)?,
            api: Resource::new(api_url)?,
            token,
            environment,
        })
    }

    /// Opens a session on the configured environment and returns its values
    /// with the property wrappers removed.
    pub async fn open_and_read_environment(&self) -> Result<Map<String, Value>, ClientError> {
        let token = self
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(ClientError::MissingToken)?;
        let authorization = format!("token {token}");

        let mut open = self.environment_resource();
        open.append_path("open");

        let response = self
            .http
            .post(open.to_url())
            .header(AUTHORIZATION, &authorization)
            .header(ACCEPT, ACCEPT_ESC)
            .send()
            .await
            .map_err(ClientError::transport(ESC_SERVICE))?;
        if !response.status().is_success() {
            return Err(remote_error(ESC_SERVICE, response).await);
        }
        let session: OpenSession = response
            .json()
            .await
            .map_err(|e| decode_error(&e))?;
        tracing::debug!(
            "opened {}/{}/{} session {}",
            self.environment.org,
            self.environment.project,
            self.environment.environment,
            session.id
        );

        let mut read = open;
        read.append_segment(&session.id);

        let response = self
            .http
            .get(read.to_url())
            .header(AUTHORIZATION, &authorization)
            .header(ACCEPT, ACCEPT_ESC)
            .send()
            .await
            .map_err(ClientError::transport(ESC_SERVICE))?;
        if !response.status().is_success() {
            return Err(remote_error(ESC_SERVICE, response).await);
        }
        let env: OpenEnvironment = response
            .json()
            .await
            .map_err(|e| decode_error(&e))?;

        Ok(env
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), unwrap_property(v)))
            .collect())
    }

    pub async fn resolve(&self) -> Result<Secrets, ClientError> {
        let values = self.open_and_read_environment().await?;
        Secrets::from_values(&values)
    }

    fn environment_resource(&self) -> Resource {
        let mut r = self.api.clone();
        r.append_path("api/esc/environments")
            .append_segment(&self.environment.org)
            .append_segment(&self.environment.project)
            .append_segment(&self.environment.environment);
        r
    }
}

fn decode_error(e: &reqwest::Error) -> ClientError {
    ClientError::Decode {
        service: ESC_SERVICE,
        message: e.to_string(),
    }
}

/// Strips `{"value": ..}` wrappers recursively from an evaluated property.
fn unwrap_property(property: &Value) -> Value {
    match property.get("value") {
        Some(Value::Object(fields)) => Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), unwrap_property(v)))
                .collect(),
        ),
        Some(Value::Array(items)) => Value::Array(items.iter().map(unwrap_property).collect()),
        Some(other) => other.clone(),
        None => Value::Null,
    }
}

/// Finds `key` as a top-level value, under `pulumiConfig`, or as a `:` separated path.
fn lookup<'a>(values: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    values
        .get(key)
        .or_else(|| values.get(PULUMI_CONFIG).and_then(|c| c.get(key)))
        .or_else(|| {
            let mut parts = key.split(':');
            let first = values.get(parts.next()?)?;
            parts.try_fold(first, |v, p| v.get(p))
        })
}

fn required(values: &Map<String, Value>, key: &str) -> Result<String, ClientError> {
    lookup(values, key)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| ClientError::MissingSecret(key.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ENV_PATH: &str = "/api/esc/environments/kihuni/Multi%20Cloud/dev-environment/open";

    fn environment() -> EnvironmentRef {
        EnvironmentRef {
            org: "kihuni".to_owned(),
            project: "Multi Cloud".to_owned(),
            environment: "dev-environment".to_owned(),
        }
    }

    fn wrapped(value: &str) -> Value {
        json!({ "value": value, "secret": true })
    }

    fn flat_properties() -> Value {
        json!({
            "pcloud:username": wrapped("user@example.com"),
            "pcloud:password": wrapped("hunter2"),
            "pcloud:folderPath": wrapped("/backups"),
            "clarifai:apiKey": wrapped("clarifai-key"),
        })
    }

    async fn mount_environment(server: &MockServer, properties: Value) {
        Mock::given(method("POST"))
            .and(path(ENV_PATH))
            .and(header("authorization", "token pul-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "42" })))
            .expect(1)
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{ENV_PATH}/42")))
            .and(header("authorization", "token pul-123"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "properties": properties })),
            )
            .expect(1)
            .mount(server)
            .await;
    }

    fn client(server: &MockServer, token: Option<&str>) -> EscClient {
        EscClient::new(
            &server.uri(),
            token.map(String::from),
            environment(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn resolve_flat_keys() {
        // Arrange
        let server = MockServer::start().await;
        mount_environment(&server, flat_properties()).await;
        let esc = client(&server, Some("pul-123"));

        // Act
        let secrets = esc.resolve().await.unwrap();

        // Assert
        assert_eq!(secrets.storage.username, "user@example.com");
        assert_eq!(secrets.storage.password, "hunter2");
        assert_eq!(secrets.storage_folder, "/backups");
        assert_eq!(secrets.classifier_api_key, "clarifai-key");
    }

    #[tokio::test]
    async fn resolve_nested_keys() {
        // Arrange
        let server = MockServer::start().await;
        let properties = json!({
            "pcloud": { "value": {
                "username": wrapped("user@example.com"),
                "password": wrapped("hunter2"),
                "folderPath": wrapped("/backups"),
            }},
            "clarifai": { "value": { "apiKey": wrapped("clarifai-key") } },
        });
        mount_environment(&server, properties).await;
        let esc = client(&server, Some("pul-123"));

        // Act
        let secrets = esc.resolve().await.unwrap();

        // Assert
        assert_eq!(secrets.storage_folder, "/backups");
        assert_eq!(secrets.classifier_api_key, "clarifai-key");
    }

    #[tokio::test]
    async fn resolve_missing_key() {
        // Arrange
        let server = MockServer::start().await;
        let properties = json!({
            "pcloud:username": wrapped("user@example.com"),
            "pcloud:password": wrapped("hunter2"),
            "pcloud:folderPath": wrapped("/backups"),
        });
        mount_environment(&server, properties).await;
        let esc = client(&server, Some("pul-123"));

        // Act
        let result = esc.resolve().await;

        // Assert
        assert!(matches!(result, Err(ClientError::MissingSecret(k)) if k == CLASSIFIER_API_KEY));
    }

    #[tokio::test]
    async fn open_environment_not_found() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENV_PATH))
            .respond_with(ResponseTemplate::new(404).set_body_json(
                json!({ "code": 404, "message": "Environment 'dev-environment' not found" }),
            ))
            .mount(&server)
            .await;
        let esc = client(&server, Some("pul-123"));

        // Act
        let result = esc.resolve().await;

        // Assert
        let err = result.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Pulumi ESC API error: Environment 'dev-environment' not found"
        );
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    #[trace]
    #[tokio::test]
    async fn resolve_without_token(#[case] token: Option<&str>) {
        // Arrange
        let server = MockServer::start().await;
        let esc = client(&server, token);

        // Act
        let result = esc.resolve().await;

        // Assert
        assert!(matches!(result, Err(ClientError::MissingToken)));
    }

    #[test]
    fn lookup_under_pulumi_config() {
        // Arrange
        let values = json!({ "pulumiConfig": { "clarifai:apiKey": "k" } });
        let values = values.as_object().unwrap();

        // Act
        let found = lookup(values, CLASSIFIER_API_KEY);

        // Assert
        assert_eq!(found, Some(&json!("k")));
    }

    #[test]
    fn unwrap_property_arrays() {
        // Arrange
        let property = json!({ "value": [ { "value": 1 }, { "value": "two" } ] });

        // Act
        let value = unwrap_property(&property);

        // Assert
        assert_eq!(value, json!([1, "two"]));
    }

    #[test]
    fn secrets_debug_is_redacted() {
        // Arrange
        let values = flat_properties();
        let values: Map<String, Value> = values
            .as_object()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), unwrap_property(v)))
            .collect();

        // Act
        let secrets = Secrets::from_values(&values).unwrap();
        let printed = format!("{secrets:?}");

        // Assert
        assert!(!printed.contains("hunter2"));
        assert!(!printed.contains("clarifai-key"));
        assert!(printed.contains("user@example.com"));
    }
}
