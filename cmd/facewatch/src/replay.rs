//! Replay backend: frames with precomputed face boxes and descriptors.
//!
//! Stands in for a camera and a face model. A replay file holds one JSON
//! frame per line:
//!
//! ```text
//! {"faces":[{"region":[top,right,bottom,left],"vector":[0.1,0.2,...]}]}
//! {"size":[640,480],"faces":[]}
//! ```
//!
//! A still image `faces/alice.jpg` resolves to the sidecar
//! `faces/alice.jpg.json` holding one frame in the same shape.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;

use facewatch_gallery::{
    DetectorOptions, FaceDetector, FaceEmbedder, GalleryError, ImageLoader, Region,
};
use facewatch_recognizer::{FrameSource, RecognizerError};
use serde::Deserialize;
use tracing::debug;

/// One recorded frame.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplayFrame {
    /// `[width, height]`. When present, boxes are clamped into the frame.
    #[serde(default)]
    pub size: Option<[i32; 2]>,

    #[serde(default)]
    pub faces: Vec<ReplayFace>,
}

/// One recorded face.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayFace {
    /// `[top, right, bottom, left]`.
    pub region: [i32; 4],
    pub vector: Vec<f32>,
}

impl ReplayFace {
    fn region(&self) -> Region {
        let [top, right, bottom, left] = self.region;
        Region::new(top, right, bottom, left)
    }
}

impl ReplayFrame {
    /// Returns the box of `face` as a detector would report it.
    fn visible(&self, face: &ReplayFace) -> Option<Region> {
        match self.size {
            Some([w, h]) => face.region().clamp(w, h),
            None => Some(face.region()),
        }
    }
}

/// Detector and embedder that replay what the frame recorded.
///
/// Recorded boxes are already in full resolution coordinates, so the
/// detector options have nothing to act on.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReplayModel;

impl ReplayModel {
    pub fn new(opts: &DetectorOptions) -> Self {
        debug!(
            "replay detector ignores model={} upsample_times={} scale={}",
            opts.model, opts.upsample_times, opts.scale
        );
        Self
    }
}

impl FaceDetector<ReplayFrame> for ReplayModel {
    fn detect(&self, frame: &ReplayFrame) -> Result<Vec<Region>, GalleryError> {
        Ok(frame.faces.iter().filter_map(|f| frame.visible(f)).collect())
    }
}

impl FaceEmbedder<ReplayFrame> for ReplayModel {
    fn embed(&self, frame: &ReplayFrame, region: &Region) -> Result<Vec<f32>, GalleryError> {
        frame
            .faces
            .iter()
            .find(|f| frame.visible(f).as_ref() == Some(region))
            .map(|f| f.vector.clone())
            .ok_or_else(|| GalleryError::Embedding(format!("no recorded face at {region:?}")))
    }
}

/// Reads `<image>.json` sidecars.
#[derive(Debug, Default, Clone, Copy)]
pub struct SidecarLoader;

impl SidecarLoader {
    pub fn sidecar_path(image: &Path) -> PathBuf {
        let mut s = image.as_os_str().to_owned();
        s.push(".json");
        PathBuf::from(s)
    }
}

impl ImageLoader<ReplayFrame> for SidecarLoader {
    fn load(&self, path: &Path) -> Result<ReplayFrame, GalleryError> {
        let sidecar = Self::sidecar_path(path);
        let data = std::fs::read(&sidecar).map_err(|e| GalleryError::ImageLoad {
            path: path.to_path_buf(),
            reason: format!("read {}: {}", sidecar.display(), e),
        })?;
        serde_json::from_slice(&data).map_err(|e| GalleryError::ImageLoad {
            path: path.to_path_buf(),
            reason: format!("parse {}: {}", sidecar.display(), e),
        })
    }
}

/// Frame source over a JSON-lines replay file.
pub struct ReplaySource {
    reader: Box<dyn BufRead + Send>,
    line: usize,
    interval: Option<Duration>,
}

impl ReplaySource {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .map_err(|e| anyhow::anyhow!("open replay {}: {}", path.display(), e))?;
        Ok(Self::from_reader(BufReader::new(file)))
    }

    pub fn from_reader(reader: impl BufRead + Send + 'static) -> Self {
        Self {
            reader: Box::new(reader),
            line: 0,
            interval: None,
        }
    }

    /// Paces frames like a camera running at `fps`.
    pub fn with_fps(mut self, fps: f32) -> anyhow::Result<Self> {
        if fps.is_nan() || fps <= 0.0 {
            anyhow::bail!("fps must be positive, got {}", fps);
        }
        let interval = Duration::try_from_secs_f32(1.0 / fps)
            .map_err(|e| anyhow::anyhow!("fps {}: {}", fps, e))?;
        self.interval = Some(interval);
        Ok(self)
    }
}

impl FrameSource<ReplayFrame> for ReplaySource {
    fn next_frame(&mut self) -> Result<Option<ReplayFrame>, RecognizerError> {
        if let Some(d) = self.interval {
            std::thread::sleep(d);
        }
        let mut buf = String::new();
        loop {
            buf.clear();
            self.line += 1;
            let n = self
                .reader
                .read_line(&mut buf)
                .map_err(|e| RecognizerError::Source(format!("line {}: {}", self.line, e)))?;
            if n == 0 {
                return Ok(None);
            }
            if buf.trim().is_empty() {
                continue;
            }
            return serde_json::from_str(&buf)
                .map(Some)
                .map_err(|e| RecognizerError::Source(format!("line {}: {}", self.line, e)));
        }
    }
}
