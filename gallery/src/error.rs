use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by gallery operations.
#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("gallery: invalid config: {0}")]
    InvalidConfig(String),

    #[error("gallery: invalid descriptor: expected {expected} dimensions, got {got}")]
    InvalidDescriptor { expected: usize, got: usize },

    #[error("gallery: invalid descriptor: empty vector")]
    EmptyDescriptor,

    #[error("gallery: invalid descriptor: non-finite value at index {index}")]
    NonFiniteDescriptor { index: usize },

    #[error("gallery: invalid label {0:?}")]
    InvalidLabel(String),

    #[error("gallery: dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("gallery: invalid record: {0}")]
    InvalidRecord(String),

    #[error("gallery: read {}: {source}", path.display())]
    StoreRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("gallery: write {}: {source}", path.display())]
    StoreWriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no face found")]
    NoFaceFound,

    #[error("ambiguous face: found {count} faces, need exactly one")]
    AmbiguousFace { count: usize },

    #[error("detection failed: {0}")]
    Detection(String),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("load image {}: {reason}", path.display())]
    ImageLoad { path: PathBuf, reason: String },
}

impl GalleryError {
    /// Reports whether this error came from a failed durable write.
    pub fn is_store_write(&self) -> bool {
        matches!(self, Self::StoreWriteFailed { .. })
    }
}
