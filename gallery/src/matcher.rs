use std::fmt;

use tracing::warn;

use crate::descriptor::{check_finite, Gallery, MatchResult};
use crate::label::Label;
use crate::GalleryError;

/// Distance reported for a query against an empty gallery.
pub const EMPTY_GALLERY_DISTANCE: f32 = 1.0;

/// Maximum Euclidean distance accepted as a match. Smaller is stricter.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Tolerance(f32);

impl Tolerance {
    pub const DEFAULT: Tolerance = Tolerance(0.6);

    /// Fails with [`GalleryError::InvalidConfig`] for negative or NaN values.
    pub fn new(value: f32) -> Result<Self, GalleryError> {
        if value.is_nan() || value < 0.0 {
            return Err(GalleryError::InvalidConfig(format!(
                "tolerance must be a non-negative number, got {value}"
            )));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Tolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Computes the Euclidean distance between two vectors.
///
/// Uses f64 intermediate precision. Vectors of different lengths fail with
/// [`GalleryError::DimensionMismatch`].
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> Result<f32, GalleryError> {
    if a.len() != b.len() {
        return Err(GalleryError::DimensionMismatch {
            expected: a.len(),
            got: b.len(),
        });
    }
    let mut sum: f64 = 0.0;
    for (x, y) in a.iter().zip(b) {
        let d = *x as f64 - *y as f64;
        sum += d * d;
    }
    Ok(sum.sqrt() as f32)
}

/// Classifies `query` against every descriptor in `gallery`.
///
/// The nearest descriptor wins; among equidistant descriptors the one whose
/// label sorts first is chosen. The result is a match when the nearest
/// distance is `<= tolerance`. An empty gallery is always unrecognized,
/// reported with [`EMPTY_GALLERY_DISTANCE`].
///
/// A query holding NaN or infinite values fails with
/// [`GalleryError::NonFiniteDescriptor`]. Candidates whose distance is not
/// finite are skipped; if none is left the query is unrecognized at an
/// infinite distance.
///
/// Linear scan, O(n * d). Adequate for galleries of up to a few hundred
/// identities.
pub fn classify(
    query: &[f32],
    gallery: &Gallery,
    tolerance: Tolerance,
) -> Result<MatchResult, GalleryError> {
    check_finite(query)?;

    let mut best: Option<(&Label, f32)> = None;
    // BTreeMap iterates in label order, so keeping only strictly smaller
    // distances resolves ties to the first label.
    for (label, known) in gallery {
        let dist = euclidean_distance(known.vector(), query)?;
        if !dist.is_finite() {
            warn!("skipping {}: distance is not finite", label);
            continue;
        }
        match best {
            Some((_, best_dist)) if dist >= best_dist => {}
            _ => best = Some((label, dist)),
        }
    }

    Ok(match best {
        None if gallery.is_empty() => MatchResult {
            label: None,
            distance: EMPTY_GALLERY_DISTANCE,
            region: None,
        },
        None => MatchResult {
            label: None,
            distance: f32::INFINITY,
            region: None,
        },
        Some((label, distance)) => MatchResult {
            label: (distance <= tolerance.get()).then(|| label.clone()),
            distance,
            region: None,
        },
    })
}
