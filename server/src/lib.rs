use std::env;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use client::{ClarifaiClient, ClientError, EscClient, PcloudClient};
use tokio::net::TcpListener;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    classify::ServerErrorsFailureClass, limit::RequestBodyLimitLayer, trace::TraceLayer,
};
use tracing::Span;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod config;
pub mod domain;
pub mod error;
pub mod file_reply;
mod handlers;
pub mod pages;
pub mod pipeline;
pub mod results;
pub mod upload;

use crate::config::Config;
use crate::domain::{Classifier, ResultArchive, SecretsSource};
use crate::file_reply::FileReply;

const DEFAULT_LOG_FILTER: &str = "labeler=info,server=info,client=info,tower_http=info";

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub secrets: Arc<dyn SecretsSource>,
    pub classifier: Arc<dyn Classifier>,
    pub archive: Arc<dyn ResultArchive>,
}

impl AppState {
    /// Wires the remote service clients described by `config`.
    pub fn from_config(config: Config) -> Result<Self, ClientError> {
        let secrets = EscClient::new(
            &config.esc_api_url,
            config.esc_access_token.clone(),
            config.environment.clone(),
            config.remote_timeout,
        )?;
        let classifier = ClarifaiClient::new(
            &config.clarifai_api_url,
            &config.clarifai_model_id,
            config.remote_timeout,
        )?;
        let archive = PcloudClient::new(&config.pcloud_api_url, config.remote_timeout)?;
        Ok(Self {
            config: Arc::new(config),
            secrets: Arc::new(secrets),
            classifier: Arc::new(classifier),
            archive: Arc::new(archive),
        })
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::index,
        handlers::submit,
        handlers::serve_results,
        handlers::serve_uploads,
        handlers::health_check,
    ),
    components(
        schemas(kernel::AnalysisResult, kernel::Analysis, handlers::Health),
        responses(FileReply),
    ),
    tags(
        (name = "labeling", description = "Image upload and labeling"),
        (name = "files", description = "Stored uploads and analysis results"),
    )
)]
pub struct ApiDoc;

pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Creates the working directories and serves until Ctrl+C or SIGTERM.
pub async fn run(config: Config) -> io::Result<()> {
    tokio::fs::create_dir_all(&config.upload_dir).await?;
    tokio::fs::create_dir_all(&config.results_dir).await?;

    let socket = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::debug!("configuration: {config:?}");
    let state = AppState::from_config(config).map_err(io::Error::other)?;

    let listener = TcpListener::bind(socket).await?;
    tracing::info!("listening on {socket}");

    axum::serve(listener, create_routes(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

pub fn create_routes(state: AppState) -> Router {
    let body_limit = state.config.body_limit_bytes;
    Router::new()
        .route("/", get(handlers::index).post(handlers::submit))
        .route("/results/:filename", get(handlers::serve_results))
        .route("/uploads/:filename", get(handlers::serve_uploads))
        .route("/health", get(handlers::health_check))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http().on_failure(
                    |error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                        tracing::error!("Server error: {error}");
                    },
                ))
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(body_limit))
                .into_inner(),
        )
        .with_state(state)
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("signal received, starting graceful shutdown");
}
