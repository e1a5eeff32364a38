use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::descriptor::{Descriptor, Gallery};
use crate::label::Label;
use crate::record;
use crate::GalleryError;

/// File extension of persisted descriptor records.
pub const RECORD_EXT: &str = "desc";

/// Controls where and how an [`EncodingStore`] persists descriptors.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding one record file per identity.
    pub dir: PathBuf,

    /// Fixed descriptor length (e.g. 128). When `None`, the first
    /// descriptor loaded or stored decides the length for the store.
    pub dimension: Option<usize>,
}

impl StoreConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            dimension: None,
        }
    }
}

/// Durable identity -> descriptor mapping with a copy-on-write snapshot.
///
/// Every descriptor visible in memory has a record on disk: [`put`] writes
/// the record (temp file, fsync, rename) before publishing a new snapshot.
/// Readers only ever take an `Arc` clone of the published snapshot, so they
/// never wait on disk I/O and never observe a half-applied update.
///
/// Thread-safe: all methods can be called concurrently.
///
/// [`put`]: EncodingStore::put
pub struct EncodingStore {
    dir: PathBuf,
    fixed_dim: Option<usize>,
    snapshot: RwLock<Arc<Gallery>>,
    writer: Mutex<()>,
}

impl EncodingStore {
    /// Opens the store, creating its directory if needed, and loads every
    /// persisted record into the first snapshot.
    pub fn open(cfg: StoreConfig) -> Result<Self, GalleryError> {
        if cfg.dimension == Some(0) {
            return Err(GalleryError::InvalidConfig(
                "store dimension must be positive".into(),
            ));
        }
        fs::create_dir_all(&cfg.dir).map_err(|source| GalleryError::StoreWriteFailed {
            path: cfg.dir.clone(),
            source,
        })?;

        let gallery = load_dir(&cfg.dir, cfg.dimension)?;
        info!(
            "loaded {} face encodings from {}",
            gallery.len(),
            cfg.dir.display()
        );

        Ok(Self {
            dir: cfg.dir,
            fixed_dim: cfg.dimension,
            snapshot: RwLock::new(Arc::new(gallery)),
            writer: Mutex::new(()),
        })
    }

    /// Reads every record in the store directory.
    ///
    /// Unreadable or malformed records are skipped with a warning. With a
    /// fixed dimension, a record of another length is a configuration
    /// error; otherwise the first record read sets the dimension and later
    /// mismatching records are skipped.
    ///
    /// This does not change the published snapshot; see [`reload`](Self::reload).
    pub fn load_all(&self) -> Result<Gallery, GalleryError> {
        load_dir(&self.dir, self.fixed_dim)
    }

    /// Re-reads the store directory and publishes the result.
    /// Returns the number of known identities.
    pub fn reload(&self) -> Result<usize, GalleryError> {
        let _w = self.writer.lock();
        let gallery = load_dir(&self.dir, self.fixed_dim)?;
        let n = gallery.len();
        *self.snapshot.write() = Arc::new(gallery);
        Ok(n)
    }

    /// Persists `descriptor` and then makes it visible, replacing any
    /// previous descriptor with the same label.
    ///
    /// Fails with [`GalleryError::InvalidDescriptor`] if the vector length
    /// differs from the store's dimension, and with
    /// [`GalleryError::StoreWriteFailed`] if the record cannot be written.
    /// On failure the in-memory snapshot is left untouched.
    pub fn put(&self, descriptor: Descriptor) -> Result<(), GalleryError> {
        let _w = self.writer.lock();
        let current = self.snapshot();

        if let Some(expected) = self.dimension_of(&current) {
            if descriptor.dimension() != expected {
                return Err(GalleryError::InvalidDescriptor {
                    expected,
                    got: descriptor.dimension(),
                });
            }
        }

        let path = self.record_path(descriptor.label());
        write_atomic(&path, &record::encode(&descriptor))?;
        debug!("wrote {}", path.display());

        let mut next = Gallery::clone(&current);
        next.insert(descriptor.label().clone(), descriptor);
        *self.snapshot.write() = Arc::new(next);
        Ok(())
    }

    /// Returns the current gallery. The snapshot is immutable; later
    /// [`put`](Self::put) calls publish a new one.
    pub fn snapshot(&self) -> Arc<Gallery> {
        self.snapshot.read().clone()
    }

    pub fn get(&self, label: &str) -> Option<Descriptor> {
        self.snapshot.read().get(label).cloned()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.snapshot.read().contains_key(label)
    }

    /// Returns all known labels in sorted order.
    pub fn labels(&self) -> Vec<Label> {
        self.snapshot.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the descriptor length enforced by the store, if known yet.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension_of(&self.snapshot())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the record path for `label` (`<dir>/<label>.desc`).
    pub fn record_path(&self, label: &Label) -> PathBuf {
        self.dir.join(format!("{}.{}", label, RECORD_EXT))
    }

    fn dimension_of(&self, gallery: &Gallery) -> Option<usize> {
        self.fixed_dim
            .or_else(|| gallery.values().next().map(|d| d.dimension()))
    }
}

fn load_dir(dir: &Path, fixed_dim: Option<usize>) -> Result<Gallery, GalleryError> {
    let entries = fs::read_dir(dir).map_err(|source| GalleryError::StoreRead {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| match e {
            Ok(e) => Some(e.path()),
            Err(e) => {
                warn!("skipping unreadable entry in {}: {}", dir.display(), e);
                None
            }
        })
        .filter(|p| is_record(p))
        .collect();
    paths.sort();

    let mut gallery = Gallery::new();
    let mut dim = fixed_dim;
    for path in paths {
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) => {
                warn!("skipping unreadable record {}: {}", path.display(), e);
                continue;
            }
        };
        let d = match record::decode(&data) {
            Ok(d) => d,
            Err(e) => {
                warn!("skipping malformed record {}: {}", path.display(), e);
                continue;
            }
        };
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        if d.label().as_str() != stem {
            warn!(
                "skipping record {}: label {:?} does not match file name",
                path.display(),
                d.label().as_str()
            );
            continue;
        }

        match dim {
            Some(expected) if expected != d.dimension() => {
                if fixed_dim.is_some() {
                    return Err(GalleryError::InvalidConfig(format!(
                        "record {} has {} dimensions, store requires {}",
                        path.display(),
                        d.dimension(),
                        expected
                    )));
                }
                warn!(
                    "skipping record {}: {} dimensions, expected {}",
                    path.display(),
                    d.dimension(),
                    expected
                );
                continue;
            }
            None => dim = Some(d.dimension()),
            _ => {}
        }

        gallery.insert(d.label().clone(), d);
    }
    Ok(gallery)
}

fn is_record(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_none_or(|n| n.starts_with('.'));
    !hidden
        && path.extension().and_then(|e| e.to_str()) == Some(RECORD_EXT)
        && path.is_file()
}

/// Writes `data` to a hidden sibling temp file, syncs it, then renames it
/// over `path`. A reader sees either the old record or the new one.
fn write_atomic(path: &Path, data: &[u8]) -> Result<(), GalleryError> {
    let tmp = tmp_path(path);
    let result = (|| -> io::Result<()> {
        let mut f = File::create(&tmp)?;
        f.write_all(data)?;
        f.sync_all()?;
        drop(f);
        fs::rename(&tmp, path)
    })();

    if let Err(source) = result {
        let _ = fs::remove_file(&tmp);
        return Err(GalleryError::StoreWriteFailed {
            path: path.to_path_buf(),
            source,
        });
    }

    // Persist the rename itself. Not every platform can open a directory.
    if let Some(parent) = path.parent() {
        if let Ok(d) = File::open(parent) {
            let _ = d.sync_all();
        }
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(label: &str, v: &[f32]) -> Descriptor {
        Descriptor::new(Label::new(label).unwrap(), v.to_vec()).unwrap()
    }

    fn open(dir: &Path) -> EncodingStore {
        EncodingStore::open(StoreConfig::new(dir)).unwrap()
    }

    #[test]
    fn open_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested/faces");
        let store = open(&dir);
        assert!(dir.is_dir());
        assert!(store.is_empty());
        assert_eq!(store.dimension(), None);
    }

    #[test]
    fn open_rejects_zero_dimension() {
        let tmp = tempfile::tempdir().unwrap();
        let res = EncodingStore::open(StoreConfig {
            dir: tmp.path().to_path_buf(),
            dimension: Some(0),
        });
        assert!(matches!(res, Err(GalleryError::InvalidConfig(_))));
    }

    #[test]
    fn put_writes_record_and_publishes() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open(tmp.path());
        store.put(desc("alice", &[1.0, 0.0, 0.0])).unwrap();

        assert!(tmp.path().join("alice.desc").is_file());
        assert!(store.contains("alice"));
        assert_eq!(store.get("alice").unwrap().vector(), &[1.0, 0.0, 0.0]);
        assert_eq!(store.dimension(), Some(3));
        assert_eq!(store.labels(), vec![Label::new("alice").unwrap()]);
    }

    #[test]
    fn dotted_label_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open(tmp.path());
        store.put(desc(".alice", &[1.0, 0.0])).unwrap();
        assert!(store.contains("_alice"));

        assert_eq!(store.load_all().unwrap().len(), 1);
        let reopened = open(tmp.path());
        assert_eq!(reopened.get("_alice").unwrap().vector(), &[1.0, 0.0]);
    }

    #[test]
    fn put_leaves_no_temp_files() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open(tmp.path());
        store.put(desc("alice", &[1.0, 2.0])).unwrap();
        store.put(desc("alice", &[3.0, 4.0])).unwrap();

        let names: Vec<String> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["alice.desc".to_string()]);
    }

    #[test]
    fn put_rejects_dimension_mismatch() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open(tmp.path());
        store.put(desc("alice", &[1.0, 0.0, 0.0])).unwrap();

        let err = store.put(desc("bob", &[1.0, 0.0])).unwrap_err();
        assert!(matches!(
            err,
            GalleryError::InvalidDescriptor { expected: 3, got: 2 }
        ));
        assert!(!store.contains("bob"));
        assert!(!tmp.path().join("bob.desc").exists());
    }

    #[test]
    fn put_respects_fixed_dimension() {
        let tmp = tempfile::tempdir().unwrap();
        let store = EncodingStore::open(StoreConfig {
            dir: tmp.path().to_path_buf(),
            dimension: Some(4),
        })
        .unwrap();
        assert_eq!(store.dimension(), Some(4));
        assert!(store.put(desc("alice", &[1.0, 0.0, 0.0])).is_err());
        store.put(desc("alice", &[1.0, 0.0, 0.0, 0.0])).unwrap();
    }

    #[test]
    fn write_failure_keeps_memory_unchanged() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("faces");
        let store = open(&dir);
        store.put(desc("alice", &[1.0, 0.0])).unwrap();
        let before = store.snapshot();

        fs::remove_dir_all(&dir).unwrap();
        let err = store.put(desc("bob", &[0.0, 1.0])).unwrap_err();
        assert!(err.is_store_write(), "got {err:?}");

        let after = store.snapshot();
        assert!(Arc::ptr_eq(&before, &after));
        assert!(!store.contains("bob"));
    }

    #[test]
    fn snapshot_is_immutable_across_puts() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open(tmp.path());
        store.put(desc("alice", &[1.0, 0.0])).unwrap();

        let snap = store.snapshot();
        store.put(desc("bob", &[0.0, 1.0])).unwrap();

        assert_eq!(snap.len(), 1);
        assert_eq!(store.snapshot().len(), 2);
    }

    #[test]
    fn load_skips_malformed_records() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let store = open(tmp.path());
            store.put(desc("alice", &[1.0, 0.0])).unwrap();
        }
        fs::write(tmp.path().join("broken.desc"), b"not a record").unwrap();
        fs::write(tmp.path().join("notes.txt"), b"ignored").unwrap();
        fs::write(tmp.path().join(".bob.desc.tmp"), b"half").unwrap();

        let store = open(tmp.path());
        assert_eq!(store.len(), 1);
        assert!(store.contains("alice"));
    }

    #[test]
    fn load_skips_record_under_wrong_name() {
        let tmp = tempfile::tempdir().unwrap();
        let data = record::encode(&desc("alice", &[1.0, 0.0]));
        fs::write(tmp.path().join("mallory.desc"), data).unwrap();

        let store = open(tmp.path());
        assert!(store.is_empty());
    }

    #[test]
    fn load_first_dimension_wins() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join("alice.desc"),
            record::encode(&desc("alice", &[1.0, 0.0, 0.0])),
        )
        .unwrap();
        fs::write(
            tmp.path().join("bob.desc"),
            record::encode(&desc("bob", &[1.0, 0.0])),
        )
        .unwrap();

        let store = open(tmp.path());
        assert_eq!(store.len(), 1);
        assert!(store.contains("alice"));
        assert_eq!(store.dimension(), Some(3));
    }

    #[test]
    fn load_fixed_dimension_mismatch_is_config_error() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join("alice.desc"),
            record::encode(&desc("alice", &[1.0, 0.0, 0.0])),
        )
        .unwrap();

        let res = EncodingStore::open(StoreConfig {
            dir: tmp.path().to_path_buf(),
            dimension: Some(128),
        });
        assert!(matches!(res, Err(GalleryError::InvalidConfig(_))));
    }

    #[test]
    fn reload_picks_up_external_records() {
        let tmp = tempfile::tempdir().unwrap();
        let store = open(tmp.path());
        fs::write(
            tmp.path().join("carol.desc"),
            record::encode(&desc("carol", &[0.5, 0.5])),
        )
        .unwrap();
        assert!(!store.contains("carol"));

        assert_eq!(store.reload().unwrap(), 1);
        assert!(store.contains("carol"));
    }
}
