use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use client::classifier::GENERAL_MODEL_ID;
use client::EnvironmentRef;
use thiserror::Error;

use crate::results::ResultNaming;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_RESULTS_DIR: &str = "results";
const DEFAULT_BODY_LIMIT_MB: usize = 16;
const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 30;

const DEFAULT_ESC_API_URL: &str = "https://api.pulumi.com";
const DEFAULT_ESC_ORG: &str = "kihuni";
const DEFAULT_ESC_PROJECT: &str = "Secure-Multi-Cloud-Backup-Orchestrator";
const DEFAULT_ESC_ENVIRONMENT: &str = "dev-environment";
const DEFAULT_CLARIFAI_API_URL: &str = "https://api.clarifai.com";
const DEFAULT_PCLOUD_API_URL: &str = "https://api.pcloud.com";

#[derive(Error, Debug)]
#[error("{name} has invalid value '{value}': {reason}")]
pub struct ConfigError {
    pub name: &'static str,
    pub value: String,
    pub reason: String,
}

/// Service settings, passed to handlers through the application state.
#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub upload_dir: PathBuf,
    pub results_dir: PathBuf,
    pub body_limit_bytes: usize,
    pub remote_timeout: Duration,
    pub result_naming: ResultNaming,
    pub esc_api_url: String,
    pub esc_access_token: Option<String>,
    pub environment: EnvironmentRef,
    pub clarifai_api_url: String,
    pub clarifai_model_id: String,
    pub pcloud_api_url: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("upload_dir", &self.upload_dir)
            .field("results_dir", &self.results_dir)
            .field("result_naming", &self.result_naming)
            .field("environment", &self.environment)
            .field("esc_access_token", &self.esc_access_token.as_ref().map(|_| "***"))
            .finish_non_exhaustive()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
            body_limit_bytes: DEFAULT_BODY_LIMIT_MB * 1024 * 1024,
            remote_timeout: Duration::from_secs(DEFAULT_REMOTE_TIMEOUT_SECS),
            result_naming: ResultNaming::default(),
            esc_api_url: DEFAULT_ESC_API_URL.to_owned(),
            esc_access_token: None,
            environment: EnvironmentRef {
                org: DEFAULT_ESC_ORG.to_owned(),
                project: DEFAULT_ESC_PROJECT.to_owned(),
                environment: DEFAULT_ESC_ENVIRONMENT.to_owned(),
            },
            clarifai_api_url: DEFAULT_CLARIFAI_API_URL.to_owned(),
            clarifai_model_id: GENERAL_MODEL_ID.to_owned(),
            pcloud_api_url: DEFAULT_PCLOUD_API_URL.to_owned(),
        }
    }
}

impl Config {
    /// Configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Configuration from any variable source; unset variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |name: &str, default: String| {
            lookup(name)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
        };

        let body_limit_mb: usize = parse(&lookup, "LABELER_BODY_LIMIT_MB", DEFAULT_BODY_LIMIT_MB)?;
        let timeout_secs: u64 = parse(
            &lookup,
            "LABELER_REMOTE_TIMEOUT_SECS",
            DEFAULT_REMOTE_TIMEOUT_SECS,
        )?;
        let per_upload: bool = parse(&lookup, "LABELER_PER_UPLOAD_RESULTS", false)?;

        Ok(Self {
            port: parse(&lookup, "LABELER_PORT", DEFAULT_PORT)?,
            upload_dir: PathBuf::from(text(
                "LABELER_UPLOAD_DIR",
                DEFAULT_UPLOAD_DIR.to_owned(),
            )),
            results_dir: PathBuf::from(text(
                "LABELER_RESULTS_DIR",
                DEFAULT_RESULTS_DIR.to_owned(),
            )),
            body_limit_bytes: body_limit_mb.saturating_mul(1024 * 1024),
            remote_timeout: Duration::from_secs(timeout_secs),
            result_naming: if per_upload {
                ResultNaming::PerUpload
            } else {
                ResultNaming::Shared
            },
            esc_api_url: text("LABELER_ESC_API_URL", defaults.esc_api_url),
            esc_access_token: lookup("PULUMI_ACCESS_TOKEN").filter(|t| !t.is_empty()),
            environment: EnvironmentRef {
                org: text("LABELER_ESC_ORG", defaults.environment.org),
                project: text("LABELER_ESC_PROJECT", defaults.environment.project),
                environment: text("LABELER_ESC_ENVIRONMENT", defaults.environment.environment),
            },
            clarifai_api_url: text("LABELER_CLARIFAI_API_URL", defaults.clarifai_api_url),
            clarifai_model_id: text("LABELER_CLARIFAI_MODEL_ID", defaults.clarifai_model_id),
            pcloud_api_url: text("LABELER_PCLOUD_API_URL", defaults.pcloud_api_url),
        })
    }
}

fn parse<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: ToString,
{
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => {
            value.trim().parse::<T>().map_err(|e| ConfigError {
                name,
                value: value.clone(),
                reason: e.to_string(),
            })
        }
        _ => Ok(default),
    }
}
