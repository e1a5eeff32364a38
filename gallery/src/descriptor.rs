use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::label::Label;
use crate::model::Region;
use crate::GalleryError;

/// A known face: identity label plus its embedding vector.
///
/// Descriptors are immutable. Re-enrolling an identity replaces the
/// descriptor as a whole.
#[derive(Clone, PartialEq)]
pub struct Descriptor {
    label: Label,
    vector: Vec<f32>,
    source_path: Option<PathBuf>,
}

impl Descriptor {
    /// Creates a descriptor. Fails with [`GalleryError::EmptyDescriptor`]
    /// for a zero-length vector and [`GalleryError::NonFiniteDescriptor`]
    /// when any value is NaN or infinite.
    pub fn new(label: Label, vector: Vec<f32>) -> Result<Self, GalleryError> {
        if vector.is_empty() {
            return Err(GalleryError::EmptyDescriptor);
        }
        check_finite(&vector)?;
        Ok(Self {
            label,
            vector,
            source_path: None,
        })
    }

    /// Records where this descriptor was computed from.
    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    pub fn vector(&self) -> &[f32] {
        &self.vector
    }

    pub fn dimension(&self) -> usize {
        self.vector.len()
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("label", &self.label)
            .field("dimension", &self.vector.len())
            .field("source_path", &self.source_path)
            .finish()
    }
}

/// Fails with [`GalleryError::NonFiniteDescriptor`] at the first NaN or
/// infinite value.
pub(crate) fn check_finite(vector: &[f32]) -> Result<(), GalleryError> {
    match vector.iter().position(|x| !x.is_finite()) {
        Some(index) => Err(GalleryError::NonFiniteDescriptor { index }),
        None => Ok(()),
    }
}

/// The set of known descriptors, keyed and ordered by label.
pub type Gallery = BTreeMap<Label, Descriptor>;

/// Classification of one query descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    /// Matched identity, or `None` when unrecognized.
    pub label: Option<Label>,

    /// Distance to the nearest known descriptor.
    pub distance: f32,

    /// Detector box the query came from, carried through for display and
    /// notification.
    pub region: Option<Region>,
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        self.label.is_some()
    }

    /// Attaches the detector region the query was computed from.
    pub fn at(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(s: &str) -> Label {
        Label::new(s).unwrap()
    }

    #[test]
    fn rejects_empty_vector() {
        assert!(matches!(
            Descriptor::new(label("alice"), Vec::new()),
            Err(GalleryError::EmptyDescriptor)
        ));
    }

    #[test]
    fn rejects_non_finite_values() {
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let err = Descriptor::new(label("bob"), vec![0.5, bad, 0.0]).unwrap_err();
            assert!(
                matches!(err, GalleryError::NonFiniteDescriptor { index: 1 }),
                "{bad}: {err}"
            );
        }
    }

    #[test]
    fn accessors() {
        let d = Descriptor::new(label("carol"), vec![0.1, 0.2])
            .unwrap()
            .with_source("faces/carol.jpg");
        assert_eq!(d.label().as_str(), "carol");
        assert_eq!(d.dimension(), 2);
        assert_eq!(d.source_path(), Some(Path::new("faces/carol.jpg")));
    }
}
