//! Persisted face descriptor gallery with nearest-neighbor identity matching.
//!
//! # Overview
//!
//! - [`EncodingStore`]: durable `label -> descriptor` mapping, one record
//!   file per identity, published to readers as an immutable snapshot.
//! - [`classify`]: nearest-neighbor search over a snapshot under a
//!   Euclidean distance [`Tolerance`].
//! - [`Enroller`]: runs a [`FaceDetector`] and [`FaceEmbedder`] over a
//!   labeled still image and stores the result.
//!
//! # Usage
//!
//! ```no_run
//! use facewatch_gallery::{classify, EncodingStore, StoreConfig, Tolerance};
//!
//! let store = EncodingStore::open(StoreConfig::new("faces")).unwrap();
//! let snapshot = store.snapshot();
//! let query = vec![0.0f32; 128];
//! let result = classify(&query, &snapshot, Tolerance::default()).unwrap();
//! match result.label {
//!     Some(name) => println!("{name} ({:.3})", result.distance),
//!     None => println!("unrecognized ({:.3})", result.distance),
//! }
//! ```
//!
//! # Consistency
//!
//! [`EncodingStore::put`] persists before it publishes, so every descriptor
//! a reader can see is already on disk. A matcher holding an older snapshot
//! keeps working against it; it sees new identities on its next
//! [`EncodingStore::snapshot`] call.

mod descriptor;
mod enroll;
mod error;
mod label;
mod matcher;
mod model;
pub mod record;
mod store;

pub use descriptor::{Descriptor, Gallery, MatchResult};
pub use enroll::{Enroller, ReconcileReport, IMAGE_EXTENSIONS};
pub use error::GalleryError;
pub use label::Label;
pub use matcher::{classify, euclidean_distance, Tolerance, EMPTY_GALLERY_DISTANCE};
pub use model::{
    DetectionModel, DetectorOptions, FaceDetector, FaceEmbedder, ImageLoader, Region,
};
pub use store::{EncodingStore, StoreConfig, RECORD_EXT};
