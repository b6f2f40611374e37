use std::io;
use std::path::Path;

use axum::body::Bytes;
use axum::extract::Multipart;
use futures::{Stream, TryStreamExt};
use futures_util::StreamExt;
use tokio_util::io::StreamReader;
use unicode_normalization::UnicodeNormalization;

use crate::domain::UploadedImage;
use crate::error::AppError;

/// Name of the form field carrying the image.
pub const FILE_FIELD: &str = "file";

pub const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

const WINDOWS_DEVICE_FILES: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// True when the text after the last dot is an allowed image extension, ignoring case.
pub fn allowed_file(file_name: &str) -> bool {
    file_name.rsplit_once('.').is_some_and(|(_, ext)| {
        let ext = ext.to_ascii_lowercase();
        ALLOWED_EXTENSIONS.contains(&ext.as_str())
    })
}

/// Reduces a client supplied name to a flat, ASCII-only file name that is safe
/// to join onto a directory. Accented letters decompose to their ASCII base.
pub fn secure_filename(file_name: &str) -> String {
    let flattened: String = file_name
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = flattened.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    let trimmed = kept.trim_matches(|c| c == '.' || c == '_');

    let stem = trimmed.split('.').next().unwrap_or_default();
    if WINDOWS_DEVICE_FILES.contains(&stem.to_ascii_uppercase().as_str()) {
        format!("_{trimmed}")
    } else {
        trimmed.to_owned()
    }
}

/// Checks a submitted file name and returns the name to store it under.
pub fn validate(file_name: &str) -> Result<String, AppError> {
    if file_name.is_empty() {
        return Err(AppError::NoFileSelected);
    }
    if !allowed_file(file_name) {
        return Err(AppError::InvalidFileType);
    }
    let safe = secure_filename(file_name);
    if safe.is_empty() {
        return Err(AppError::InvalidFileType);
    }
    Ok(safe)
}

/// Finds the image field of the form, validates its name and stores its bytes
/// under `upload_dir`. Nothing is written when validation fails.
pub async fn receive(multipart: &mut Multipart, upload_dir: &Path) -> Result<UploadedImage, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Multipart(e.body_text()))?
    {
        // Parts without a filename are plain form values, not uploads.
        let Some(original) = field
            .file_name()
            .filter(|_| field.name() == Some(FILE_FIELD))
            .map(str::to_owned)
        else {
            continue;
        };
        let file_name = validate(&original)?;
        let (data, read_bytes) = read_from_stream(field).await?;

        let path = upload_dir.join(&file_name);
        tokio::fs::write(&path, &data).await?;
        tracing::info!("file: {original} stored as {} read: {read_bytes}", path.display());

        return Ok(UploadedImage { path, file_name });
    }
    Err(AppError::NoFilePart)
}

async fn read_from_stream<S, E>(stream: S) -> io::Result<(Vec<u8>, usize)>
where
    S: Stream<Item = Result<Bytes, E>> + StreamExt,
    E: Sync + std::error::Error + Send + 'static,
{
    // Convert the stream into an `AsyncRead`.
    let body_with_io_error = stream.map_err(io::Error::other);
    let body_reader = StreamReader::new(body_with_io_error);
    futures::pin_mut!(body_reader);
    let mut buffer = Vec::new();

    let copied_bytes = tokio::io::copy(&mut body_reader, &mut buffer).await?;
    let copied_bytes = usize::try_from(copied_bytes).unwrap_or(usize::MAX);
    Ok((buffer, copied_bytes))
}
