#![warn(clippy::unwrap_in_result)]
#![warn(clippy::unwrap_used)]

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Labels detected on a single uploaded image.
///
/// This is the document written to the results directory and archived
/// to cloud storage, so its JSON shape is part of the external contract:
/// `{"image": "<path>", "labels": ["..."]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AnalysisResult {
    /// Local path of the analysed image
    pub image: String,
    /// Concept names in the order the classifier returned them
    pub labels: Vec<String>,
}

/// Outcome of a completed labeling run.
///
/// Carries everything the presentation layer needs to render the result page
/// or the command line needs to print a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Analysis {
    /// Concept names in the order the classifier returned them
    pub labels: Vec<String>,
    /// Local path of the written result file
    pub output_path: String,
    /// Sanitized name the image was stored under
    pub image_filename: String,
    /// Name of the result file inside the results directory
    pub result_filename: String,
}
