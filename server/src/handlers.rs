#![allow(clippy::unused_async)]
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::file_reply::FileReply;
use crate::{pages, pipeline, upload, AppState};

#[derive(Serialize, ToSchema)]
pub struct Health {
    pub status: String,
}

/// Shows the upload form
#[utoipa::path(
    get,
    path = "/",
    tag = "labeling",
    responses(
        (status = 200, description = "Upload form", content_type = "text/html", body = String),
    ),
)]
pub async fn index() -> Html<String> {
    pages::index(None)
}

/// Stores the submitted image, labels it and archives the labels.
#[utoipa::path(
    post,
    path = "/",
    tag = "labeling",
    request_body(
        content = String,
        content_type = "multipart/form-data",
        description = "Form with a single `file` field holding a png, jpg, jpeg or gif image"
    ),
    responses(
        (status = 200, description = "Image labeled, result page", content_type = "text/html", body = String),
        (status = 400, description = "Missing, empty or disallowed upload", content_type = "text/html", body = String),
        (status = 422, description = "Classifier rejected the image", content_type = "text/html", body = String),
        (status = 500, description = "Local file error", content_type = "text/html", body = String),
        (status = 502, description = "Secrets or storage service failure", content_type = "text/html", body = String),
    ),
)]
#[tracing::instrument(skip_all, fields(request_id = %Uuid::new_v4()))]
pub async fn submit(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let image = match upload::receive(&mut multipart, &state.config.upload_dir).await {
        Ok(image) => image,
        Err(e) => {
            e.log();
            return e.into_response();
        }
    };

    match pipeline::process_image(&state, &image).await {
        Ok(analysis) => pages::result(&analysis).into_response(),
        Err(e) => {
            e.log();
            e.into_response()
        }
    }
}

/// Gets a result file by name
#[utoipa::path(
    get,
    path = "/results/{filename}",
    tag = "files",
    responses(
        (status = 200, response = FileReply),
        (status = 404, description = "File not found", body = String)
    ),
    params(
        ("filename" = String, Path, description = "Result file name")
    ),
)]
pub async fn serve_results(
    Path(filename): Path<String>,
    State(state): State<AppState>,
) -> Response {
    send_from_directory(&state.config.results_dir, &filename).await
}

/// Gets a previously uploaded image by name
#[utoipa::path(
    get,
    path = "/uploads/{filename}",
    tag = "files",
    responses(
        (status = 200, response = FileReply),
        (status = 404, description = "File not found", body = String)
    ),
    params(
        ("filename" = String, Path, description = "Stored image file name")
    ),
)]
pub async fn serve_uploads(
    Path(filename): Path<String>,
    State(state): State<AppState>,
) -> Response {
    send_from_directory(&state.config.upload_dir, &filename).await
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    tag = "labeling",
    responses(
        (status = 200, description = "Service is up", body = Health),
    ),
)]
pub async fn health_check() -> Json<Health> {
    Json(Health {
        status: "OK".to_owned(),
    })
}

async fn send_from_directory(dir: &std::path::Path, file_name: &str) -> Response {
    if !is_plain_file_name(file_name) {
        tracing::warn!("rejected file name: {file_name}");
        return not_found(file_name);
    }

    let path = dir.join(file_name);
    match tokio::fs::read(&path).await {
        Ok(content) => {
            tracing::info!("{} size {}", path.display(), content.len());
            FileReply::new(content, file_name).into_response()
        }
        Err(e) => {
            tracing::info!("{}: {e}", path.display());
            not_found(file_name)
        }
    }
}

fn is_plain_file_name(file_name: &str) -> bool {
    !file_name.is_empty()
        && file_name != "."
        && file_name != ".."
        && !file_name.contains(['/', '\\', '\0'])
}

fn not_found(file_name: &str) -> Response {
    (StatusCode::NOT_FOUND, format!("{file_name} not found")).into_response()
}
