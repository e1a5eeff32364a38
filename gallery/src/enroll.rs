use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::descriptor::Descriptor;
use crate::label::Label;
use crate::model::{FaceDetector, FaceEmbedder, ImageLoader};
use crate::store::EncodingStore;
use crate::GalleryError;

/// Still-image extensions picked up by [`Enroller::reconcile_with_images`].
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

/// Turns labeled still images into persisted descriptors.
pub struct Enroller<F> {
    store: Arc<EncodingStore>,
    detector: Arc<dyn FaceDetector<F>>,
    embedder: Arc<dyn FaceEmbedder<F>>,
}

/// Outcome of [`Enroller::reconcile_with_images`].
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Labels enrolled during the scan.
    pub added: Vec<Label>,

    /// Images that could not be enrolled, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
}

impl<F> Enroller<F> {
    pub fn new(
        store: Arc<EncodingStore>,
        detector: Arc<dyn FaceDetector<F>>,
        embedder: Arc<dyn FaceEmbedder<F>>,
    ) -> Self {
        Self {
            store,
            detector,
            embedder,
        }
    }

    pub fn store(&self) -> &Arc<EncodingStore> {
        &self.store
    }

    /// Enrolls the single face in `image` under `label`.
    ///
    /// Fails with [`GalleryError::NoFaceFound`] or
    /// [`GalleryError::AmbiguousFace`] unless exactly one face is detected.
    /// Store errors are returned unchanged. Enrolling an existing label
    /// replaces its descriptor.
    pub fn enroll(
        &self,
        label: Label,
        image: &F,
        source_path: Option<&Path>,
    ) -> Result<Descriptor, GalleryError> {
        let regions = self.detector.detect(image)?;
        let region = match regions.as_slice() {
            [] => return Err(GalleryError::NoFaceFound),
            [r] => *r,
            many => return Err(GalleryError::AmbiguousFace { count: many.len() }),
        };

        let vector = self.embedder.embed(image, &region)?;
        let mut descriptor = Descriptor::new(label, vector)?;
        if let Some(p) = source_path {
            descriptor = descriptor.with_source(p);
        }
        self.store.put(descriptor.clone())?;
        Ok(descriptor)
    }

    /// Loads the image at `path` and enrolls it under `label`.
    pub fn enroll_file(
        &self,
        label: Label,
        path: &Path,
        loader: &dyn ImageLoader<F>,
    ) -> Result<Descriptor, GalleryError> {
        if !path.is_file() {
            return Err(GalleryError::ImageLoad {
                path: path.to_path_buf(),
                reason: "no such file".into(),
            });
        }
        let image = loader.load(path)?;
        self.enroll(label, &image, Some(path))
    }

    /// Enrolls every image in `dir` whose label has no descriptor yet,
    /// labeling each by its file stem.
    ///
    /// Images that fail to load, have no face or more than one face are
    /// skipped and reported. A failed durable write stops the scan and is
    /// returned. A missing directory is an empty scan.
    pub fn reconcile_with_images(
        &self,
        dir: &Path,
        loader: &dyn ImageLoader<F>,
    ) -> Result<ReconcileReport, GalleryError> {
        let mut report = ReconcileReport::default();
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(report),
            Err(source) => {
                return Err(GalleryError::StoreRead {
                    path: dir.to_path_buf(),
                    source,
                });
            }
        };

        let mut images: Vec<PathBuf> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_image(p))
            .collect();
        images.sort();

        for path in images {
            let label = match Label::from_file_stem(&path) {
                Ok(label) => label,
                Err(e) => {
                    warn!("skipping {}: {}", path.display(), e);
                    report.skipped.push((path, e.to_string()));
                    continue;
                }
            };
            if self.store.contains(label.as_str()) {
                continue;
            }

            match self.enroll_file(label.clone(), &path, loader) {
                Ok(_) => {
                    info!("enrolled {} from {}", label, path.display());
                    report.added.push(label);
                }
                Err(e) if e.is_store_write() => return Err(e),
                Err(e) => {
                    warn!("skipping {}: {}", path.display(), e);
                    report.skipped.push((path, e.to_string()));
                }
            }
        }
        Ok(report)
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.iter().any(|x| x.eq_ignore_ascii_case(e)))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::model::Region;
    use crate::store::StoreConfig;

    /// Test frame: the faces it contains, each with its descriptor.
    #[derive(Clone, Default)]
    struct Picture {
        faces: Vec<(Region, Vec<f32>)>,
    }

    struct PictureModel;

    impl FaceDetector<Picture> for PictureModel {
        fn detect(&self, frame: &Picture) -> Result<Vec<Region>, GalleryError> {
            Ok(frame.faces.iter().map(|(r, _)| *r).collect())
        }
    }

    impl FaceEmbedder<Picture> for PictureModel {
        fn embed(&self, frame: &Picture, region: &Region) -> Result<Vec<f32>, GalleryError> {
            frame
                .faces
                .iter()
                .find(|(r, _)| r == region)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| GalleryError::Embedding("unknown region".into()))
        }
    }

    /// Resolves image paths by file name.
    struct PictureLoader(HashMap<String, Picture>);

    impl ImageLoader<Picture> for PictureLoader {
        fn load(&self, path: &Path) -> Result<Picture, GalleryError> {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            self.0.get(&name).cloned().ok_or(GalleryError::ImageLoad {
                path: path.to_path_buf(),
                reason: "undecodable".into(),
            })
        }
    }

    fn face(v: &[f32]) -> Picture {
        Picture {
            faces: vec![(Region::new(0, 10, 10, 0), v.to_vec())],
        }
    }

    fn enroller(dir: &Path) -> Enroller<Picture> {
        let store = Arc::new(EncodingStore::open(StoreConfig::new(dir)).unwrap());
        Enroller::new(store, Arc::new(PictureModel), Arc::new(PictureModel))
    }

    #[test]
    fn enroll_single_face() {
        let tmp = tempfile::tempdir().unwrap();
        let e = enroller(tmp.path());
        let d = e
            .enroll(Label::new("alice").unwrap(), &face(&[1.0, 0.0]), None)
            .unwrap();
        assert_eq!(d.vector(), &[1.0, 0.0]);
        assert!(e.store().contains("alice"));
    }

    #[test]
    fn enroll_no_face() {
        let tmp = tempfile::tempdir().unwrap();
        let e = enroller(tmp.path());
        let err = e
            .enroll(Label::new("carol").unwrap(), &Picture::default(), None)
            .unwrap_err();
        assert!(matches!(err, GalleryError::NoFaceFound));
        assert!(e.store().is_empty());
    }

    #[test]
    fn enroll_two_faces() {
        let tmp = tempfile::tempdir().unwrap();
        let e = enroller(tmp.path());
        let pic = Picture {
            faces: vec![
                (Region::new(0, 10, 10, 0), vec![1.0, 0.0]),
                (Region::new(0, 30, 10, 20), vec![0.0, 1.0]),
            ],
        };
        let err = e
            .enroll(Label::new("group").unwrap(), &pic, None)
            .unwrap_err();
        assert!(matches!(err, GalleryError::AmbiguousFace { count: 2 }));
        assert!(e.store().is_empty());
    }

    #[test]
    fn enroll_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let e = enroller(tmp.path());
        let label = Label::new("alice").unwrap();
        e.enroll(label.clone(), &face(&[1.0, 0.0]), None).unwrap();
        e.enroll(label.clone(), &face(&[1.0, 0.0]), None).unwrap();
        e.enroll(label, &face(&[0.5, 0.5]), None).unwrap();
        assert_eq!(e.store().len(), 1);
        assert_eq!(e.store().get("alice").unwrap().vector(), &[0.5, 0.5]);
    }

    #[test]
    fn enroll_file_records_source() {
        let tmp = tempfile::tempdir().unwrap();
        let img = tmp.path().join("alice.jpg");
        fs::write(&img, b"jpeg").unwrap();
        let loader = PictureLoader(HashMap::from([("alice.jpg".to_string(), face(&[1.0, 0.0]))]));

        let e = enroller(&tmp.path().join("store"));
        let d = e
            .enroll_file(Label::new("alice").unwrap(), &img, &loader)
            .unwrap();
        assert_eq!(d.source_path(), Some(img.as_path()));
    }

    #[test]
    fn enroll_file_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let e = enroller(tmp.path());
        let loader = PictureLoader(HashMap::new());
        let err = e
            .enroll_file(Label::new("x").unwrap(), &tmp.path().join("nope.jpg"), &loader)
            .unwrap_err();
        assert!(matches!(err, GalleryError::ImageLoad { .. }));
    }

    #[test]
    fn reconcile_adds_missing_and_skips_bad() {
        let tmp = tempfile::tempdir().unwrap();
        let faces = tmp.path();
        for name in ["alice.jpg", "bob.PNG", "empty.jpg", "group.jpeg", "broken.bmp", "notes.txt"] {
            fs::write(faces.join(name), b"img").unwrap();
        }
        let loader = PictureLoader(HashMap::from([
            ("alice.jpg".to_string(), face(&[1.0, 0.0])),
            ("bob.PNG".to_string(), face(&[0.0, 1.0])),
            ("empty.jpg".to_string(), Picture::default()),
            (
                "group.jpeg".to_string(),
                Picture {
                    faces: vec![
                        (Region::new(0, 10, 10, 0), vec![1.0, 0.0]),
                        (Region::new(0, 30, 10, 20), vec![0.0, 1.0]),
                    ],
                },
            ),
        ]));

        let e = enroller(faces);
        let report = e.reconcile_with_images(faces, &loader).unwrap();

        let added: Vec<&str> = report.added.iter().map(|l| l.as_str()).collect();
        assert_eq!(added, vec!["alice", "bob"]);
        assert_eq!(report.skipped.len(), 3);
        assert_eq!(e.store().len(), 2);
        assert!(faces.join("alice.desc").is_file());

        // Second pass finds nothing to do for enrolled labels.
        let report = e.reconcile_with_images(faces, &loader).unwrap();
        assert!(report.added.is_empty());
        assert_eq!(report.skipped.len(), 3);
    }

    #[test]
    fn reconcile_keeps_existing_descriptor() {
        let tmp = tempfile::tempdir().unwrap();
        let faces = tmp.path();
        fs::write(faces.join("alice.jpg"), b"img").unwrap();
        let loader = PictureLoader(HashMap::from([("alice.jpg".to_string(), face(&[1.0, 0.0]))]));

        let e = enroller(faces);
        e.enroll(Label::new("alice").unwrap(), &face(&[0.3, 0.3]), None)
            .unwrap();
        let report = e.reconcile_with_images(faces, &loader).unwrap();
        assert!(report.added.is_empty());
        assert_eq!(e.store().get("alice").unwrap().vector(), &[0.3, 0.3]);
    }

    #[test]
    fn reconcile_dotted_image_only_once() {
        let tmp = tempfile::tempdir().unwrap();
        let faces = tmp.path();
        fs::write(faces.join(".dave.jpg"), b"img").unwrap();
        let loader = PictureLoader(HashMap::from([(".dave.jpg".to_string(), face(&[1.0, 0.0]))]));

        let report = enroller(faces).reconcile_with_images(faces, &loader).unwrap();
        assert_eq!(report.added, vec![Label::new("_dave").unwrap()]);

        let report = enroller(faces).reconcile_with_images(faces, &loader).unwrap();
        assert!(report.added.is_empty());
    }

    #[test]
    fn reconcile_missing_dir_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let e = enroller(&tmp.path().join("store"));
        let report = e
            .reconcile_with_images(&tmp.path().join("nope"), &PictureLoader(HashMap::new()))
            .unwrap();
        assert!(report.added.is_empty());
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn reconcile_stops_on_write_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let faces = tmp.path().join("faces");
        fs::create_dir(&faces).unwrap();
        fs::write(faces.join("alice.jpg"), b"img").unwrap();
        let loader = PictureLoader(HashMap::from([("alice.jpg".to_string(), face(&[1.0, 0.0]))]));

        let store_dir = tmp.path().join("store");
        let e = enroller(&store_dir);
        fs::remove_dir_all(&store_dir).unwrap();

        let err = e.reconcile_with_images(&faces, &loader).unwrap_err();
        assert!(err.is_store_write());
        assert!(e.store().is_empty());
    }
}
