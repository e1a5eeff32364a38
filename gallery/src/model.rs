use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::GalleryError;

/// Bounding box of a detected face, in pixels.
///
/// Field order follows the `(top, right, bottom, left)` convention used by
/// common face detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

impl Region {
    pub fn new(top: i32, right: i32, bottom: i32, left: i32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    pub fn width(&self) -> i32 {
        (self.right - self.left).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.bottom - self.top).max(0)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Clamps the box into a `width x height` frame.
    /// Returns `None` if nothing of the box is left inside the frame.
    pub fn clamp(&self, width: i32, height: i32) -> Option<Region> {
        let r = Region {
            top: self.top.max(0),
            left: self.left.max(0),
            bottom: self.bottom.min(height),
            right: self.right.min(width),
        };
        if r.bottom <= r.top || r.right <= r.left {
            None
        } else {
            Some(r)
        }
    }

    /// Maps a box found on a frame resized by `scale` back to the full
    /// resolution frame.
    pub fn unscale(&self, scale: f32) -> Region {
        let up = |v: i32| (v as f64 / scale as f64).round() as i32;
        Region {
            top: up(self.top),
            right: up(self.right),
            bottom: up(self.bottom),
            left: up(self.left),
        }
    }
}

/// Detector variant: fast histogram-of-gradients or the slower, more
/// accurate CNN.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionModel {
    #[default]
    Hog,
    Cnn,
}

impl fmt::Display for DetectionModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Hog => "hog",
            Self::Cnn => "cnn",
        })
    }
}

/// Knobs handed to a detector backend when it is built.
///
/// Backends detect on a frame resized by `scale` and report boxes in full
/// resolution coordinates (see [`Region::unscale`]). Backends without a
/// given knob ignore it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorOptions {
    pub model: DetectionModel,

    /// Extra upsampling passes; finds smaller faces at a higher cost.
    pub upsample_times: u32,

    /// Resize factor applied before detection, in `(0, 1]`.
    pub scale: f32,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            model: DetectionModel::Hog,
            upsample_times: 0,
            scale: 1.0,
        }
    }
}

impl DetectorOptions {
    /// Fails with [`GalleryError::InvalidConfig`] unless `scale` is in `(0, 1]`.
    pub fn validate(&self) -> Result<(), GalleryError> {
        if self.scale.is_nan() || self.scale <= 0.0 || self.scale > 1.0 {
            return Err(GalleryError::InvalidConfig(format!(
                "detector scale must be in (0, 1], got {}",
                self.scale
            )));
        }
        Ok(())
    }
}

/// Finds candidate faces in a frame.
///
/// Implementations choose their own speed/accuracy trade-off (coarse vs
/// precise models, upsampling). They must be safe for concurrent use since
/// enrollment and recognition may share one detector.
pub trait FaceDetector<F>: Send + Sync {
    /// Returns the bounding boxes of every face found in `frame`.
    /// An empty result is not an error.
    fn detect(&self, frame: &F) -> Result<Vec<Region>, GalleryError>;
}

/// Computes a fixed-length face descriptor for one detected region.
///
/// Implementations must align the face canonically so descriptors of the
/// same person land close together in Euclidean distance.
pub trait FaceEmbedder<F>: Send + Sync {
    /// Returns the descriptor vector for the face inside `region`.
    /// Fails with [`GalleryError::Embedding`].
    fn embed(&self, frame: &F, region: &Region) -> Result<Vec<f32>, GalleryError>;
}

/// Decodes a still image from disk into the frame type the models accept.
pub trait ImageLoader<F>: Send + Sync {
    fn load(&self, path: &Path) -> Result<F, GalleryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_size() {
        let r = Region::new(10, 50, 40, 20);
        assert_eq!(r.width(), 30);
        assert_eq!(r.height(), 30);
        assert!(!r.is_empty());
        assert!(Region::new(10, 10, 40, 10).is_empty());
    }

    #[test]
    fn region_clamp_inside_frame() {
        let r = Region::new(-5, 120, 90, -3);
        assert_eq!(r.clamp(100, 80), Some(Region::new(0, 100, 80, 0)));
    }

    #[test]
    fn region_unscale() {
        let small = Region::new(10, 40, 30, 5);
        assert_eq!(small.unscale(0.25), Region::new(40, 160, 120, 20));
        assert_eq!(small.unscale(1.0), small);
    }

    #[test]
    fn detector_options_validation() {
        assert!(DetectorOptions::default().validate().is_ok());
        for scale in [0.0, -0.5, 1.5, f32::NAN] {
            let opts = DetectorOptions {
                scale,
                ..DetectorOptions::default()
            };
            assert!(
                matches!(opts.validate(), Err(GalleryError::InvalidConfig(_))),
                "{scale}"
            );
        }
    }

    #[test]
    fn detection_model_names() {
        assert_eq!(DetectionModel::Cnn.to_string(), "cnn");
        assert_eq!(DetectionModel::default(), DetectionModel::Hog);
    }

    #[test]
    fn region_clamp_outside_frame() {
        let r = Region::new(200, 300, 250, 220);
        assert_eq!(r.clamp(100, 100), None);
    }
}
