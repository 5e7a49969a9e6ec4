use thiserror::Error;

/// Failures that end a single perception run.
///
/// A missing marker is not listed here: the locator reports it through
/// `Option` and the pipeline carries on with a zero anchor pose.
#[derive(Debug, Error)]
pub enum PerceptionError {
    #[error("pose solve failed: {0}")]
    PoseSolveFailure(String),

    #[error("malformed detector output: expected {expected}, got {actual}")]
    MalformedDetectorOutput { expected: String, actual: String },

    #[error("region quad is degenerate, no homography to the canonical square")]
    DegenerateRegion,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PerceptionError>;
