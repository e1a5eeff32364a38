use facewatch_gallery::GalleryError;
use thiserror::Error;

/// Errors returned by the recognition loop.
#[derive(Debug, Error)]
pub enum RecognizerError {
    #[error("recognizer: frame source: {0}")]
    Source(String),

    #[error("recognizer: invalid config: {0}")]
    InvalidConfig(String),

    #[error("recognizer: already running")]
    AlreadyRunning,

    #[error(transparent)]
    Gallery(#[from] GalleryError),
}
