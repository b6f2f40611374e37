use kernel::{Analysis, AnalysisResult};

use crate::domain::UploadedImage;
use crate::error::AppError;
use crate::results::write_result;
use crate::AppState;

/// Labels a stored image and archives the result.
///
/// Secrets are resolved first, then the image is classified, the labels are
/// written to the results directory and the result file is uploaded to the
/// storage folder named by the secrets. The first failing step ends the run.
pub async fn process_image(state: &AppState, image: &UploadedImage) -> Result<Analysis, AppError> {
    let secrets = state.secrets.resolve().await.map_err(AppError::Secrets)?;

    let data = tokio::fs::read(&image.path).await?;
    let labels = state
        .classifier
        .classify(&data, &secrets.classifier_api_key)
        .await
        .map_err(AppError::Inference)?;
    tracing::info!("Detected labels: {labels:?}");

    let result_filename = state.config.result_naming.file_name(&image.file_name, &data);
    let result = AnalysisResult {
        image: image.path.to_string_lossy().into_owned(),
        labels,
    };
    let output = write_result(&state.config.results_dir, &result_filename, &result).await?;
    let output_path = output.to_string_lossy().into_owned();

    state
        .archive
        .upload(&output, &secrets.storage_folder, &secrets.storage)
        .await
        .map_err(|source| AppError::Storage {
            output_path: output_path.clone(),
            source,
        })?;
    tracing::info!(
        "Uploaded analysis results to pCloud in folder: {}",
        secrets.storage_folder
    );

    Ok(Analysis {
        labels: result.labels,
        output_path,
        image_filename: image.file_name.clone(),
        result_filename,
    })
}
