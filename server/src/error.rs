use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use client::ClientError;
use thiserror::Error;

use crate::pages;

/// Everything that can stop a labeling request, tagged by failure domain.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("No file part")]
    NoFilePart,

    #[error("No file selected")]
    NoFileSelected,

    #[error("Invalid file type")]
    InvalidFileType,

    /// Malformed multipart body
    #[error("Invalid upload: {0}")]
    Multipart(String),

    /// Local upload or result file could not be read or written
    #[error("File error: {0}")]
    File(#[from] std::io::Error),

    #[error("Failed to serialize analysis: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Credentials could not be fetched from the secrets environment
    #[error("Failed to resolve secrets: {0}")]
    Secrets(#[source] ClientError),

    /// The classifier rejected the image or could not be reached
    #[error(transparent)]
    Inference(ClientError),

    /// Labels were written locally but could not be archived
    #[error("Analysis saved to {output_path} but upload failed: {source}")]
    Storage {
        output_path: String,
        #[source]
        source: ClientError,
    },
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NoFilePart
            | AppError::NoFileSelected
            | AppError::InvalidFileType
            | AppError::Multipart(_) => StatusCode::BAD_REQUEST,
            AppError::File(_) | AppError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Secrets(_) | AppError::Storage { .. } => StatusCode::BAD_GATEWAY,
            AppError::Inference(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    pub fn log(&self) {
        match self {
            AppError::NoFilePart
            | AppError::NoFileSelected
            | AppError::InvalidFileType
            | AppError::Multipart(_) => tracing::warn!("Upload rejected: {self}"),
            AppError::File(_) => tracing::error!("File error: {self}"),
            AppError::Inference(_) => tracing::error!("API error: {self}"),
            AppError::Secrets(_) | AppError::Storage { .. } | AppError::Serialization(_) => {
                tracing::error!("Unexpected error: {self}");
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        (self.status_code(), pages::index(Some(&message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn remote(service: &'static str, message: &str) -> ClientError {
        ClientError::Remote {
            service,
            message: message.to_owned(),
        }
    }

    #[rstest]
    #[case(AppError::NoFilePart, StatusCode::BAD_REQUEST, "No file part")]
    #[case(AppError::NoFileSelected, StatusCode::BAD_REQUEST, "No file selected")]
    #[case(AppError::InvalidFileType, StatusCode::BAD_REQUEST, "Invalid file type")]
    #[case(
        AppError::File(std::io::Error::new(std::io::ErrorKind::NotFound, "uploads/a.png missing")),
        StatusCode::INTERNAL_SERVER_ERROR,
        "File error: uploads/a.png missing"
    )]
    #[case(
        AppError::Secrets(ClientError::MissingSecret("clarifai:apiKey".to_owned())),
        StatusCode::BAD_GATEWAY,
        "Failed to resolve secrets: secret 'clarifai:apiKey' is not defined in the environment"
    )]
    #[case(
        AppError::Inference(remote("Clarifai", "Model does not exist")),
        StatusCode::UNPROCESSABLE_ENTITY,
        "Clarifai API error: Model does not exist"
    )]
    #[case(
        AppError::Storage {
            output_path: "results/analysis_results.json".to_owned(),
            source: remote("pCloud", "Log in failed."),
        },
        StatusCode::BAD_GATEWAY,
        "Analysis saved to results/analysis_results.json but upload failed: pCloud API error: Log in failed."
    )]
    #[trace]
    fn error_kinds(#[case] error: AppError, #[case] status: StatusCode, #[case] message: &str) {
        // Arrange

        // Act
        let actual_status = error.status_code();
        let actual_message = error.to_string();

        // Assert
        assert_eq!(actual_status, status);
        assert_eq!(actual_message, message);
    }

    #[test]
    fn into_response_keeps_status() {
        // Arrange
        let error = AppError::InvalidFileType;

        // Act
        let response = error.into_response();

        // Assert
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
