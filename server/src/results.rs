use std::path::{Path, PathBuf};

use kernel::AnalysisResult;

use crate::error::AppError;

/// Result file name used when every request shares one file.
pub const SHARED_RESULT_FILE: &str = "analysis_results.json";

const HASH_PREFIX_LEN: usize = 16;

/// How result files are named inside the results directory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResultNaming {
    /// Every request overwrites `analysis_results.json`
    #[default]
    Shared,
    /// `analysis_<hash>.json`, keyed by the stored image name and bytes
    PerUpload,
}

impl ResultNaming {
    pub fn file_name(self, image_name: &str, image: &[u8]) -> String {
        match self {
            ResultNaming::Shared => SHARED_RESULT_FILE.to_owned(),
            ResultNaming::PerUpload => {
                let mut hasher = blake3::Hasher::new();
                hasher.update(image_name.as_bytes());
                hasher.update(&[0]);
                hasher.update(image);
                let hash = hasher.finalize().to_hex();
                format!("analysis_{}.json", &hash.as_str()[..HASH_PREFIX_LEN])
            }
        }
    }
}

/// Writes the analysis as JSON into `results_dir`, replacing any previous file
/// with the same name.
pub async fn write_result(
    results_dir: &Path,
    file_name: &str,
    result: &AnalysisResult,
) -> Result<PathBuf, AppError> {
    let json = serde_json::to_vec(result)?;
    let path = results_dir.join(file_name);
    tokio::fs::write(&path, json).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn shared_name_ignores_input() {
        // Arrange
        let naming = ResultNaming::Shared;

        // Act
        let a = naming.file_name("a.png", b"a");
        let b = naming.file_name("b.png", b"b");

        // Assert
        assert_eq!(a, SHARED_RESULT_FILE);
        assert_eq!(b, SHARED_RESULT_FILE);
    }

    #[rstest]
    #[case("cat.png", b"same".as_slice(), "cat.png", b"same".as_slice(), true)]
    #[case("cat.png", b"same".as_slice(), "dog.png", b"same".as_slice(), false)]
    #[case("cat.png", b"one".as_slice(), "cat.png", b"two".as_slice(), false)]
    #[trace]
    fn per_upload_name_is_content_addressed(
        #[case] name_a: &str,
        #[case] bytes_a: &[u8],
        #[case] name_b: &str,
        #[case] bytes_b: &[u8],
        #[case] equal: bool,
    ) {
        // Arrange
        let naming = ResultNaming::PerUpload;

        // Act
        let a = naming.file_name(name_a, bytes_a);
        let b = naming.file_name(name_b, bytes_b);

        // Assert
        assert_eq!(a == b, equal);
        assert!(a.starts_with("analysis_") && a.ends_with(".json"));
        assert_eq!(a.len(), "analysis_".len() + HASH_PREFIX_LEN + ".json".len());
    }

    #[tokio::test]
    async fn write_result_overwrites() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let first = AnalysisResult {
            image: "uploads/a.png".to_owned(),
            labels: vec!["first".to_owned()],
        };
        let second = AnalysisResult {
            image: "uploads/b.png".to_owned(),
            labels: vec!["second".to_owned(), "more".to_owned()],
        };

        // Act
        write_result(dir.path(), SHARED_RESULT_FILE, &first).await.unwrap();
        let path = write_result(dir.path(), SHARED_RESULT_FILE, &second)
            .await
            .unwrap();

        // Assert
        assert_eq!(path, dir.path().join(SHARED_RESULT_FILE));
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(
            content,
            r#"{"image":"uploads/b.png","labels":["second","more"]}"#
        );
    }

    #[tokio::test]
    async fn write_result_missing_directory() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let result = AnalysisResult {
            image: "uploads/a.png".to_owned(),
            labels: vec![],
        };

        // Act
        let written = write_result(&dir.path().join("absent"), SHARED_RESULT_FILE, &result).await;

        // Assert
        assert!(matches!(written, Err(AppError::File(_))));
    }
}
