use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use facewatch_gallery::{
    classify, EncodingStore, FaceDetector, FaceEmbedder, MatchResult, Tolerance,
};
use tracing::{debug, error, info, warn};

use crate::notifier::Notifier;
use crate::pacing::FramePacer;
use crate::RecognizerError;

/// Produces frames for the loop.
pub trait FrameSource<F>: Send {
    /// Blocks until the next frame is available.
    /// Returns `Ok(None)` at end of stream. Errors are fatal to the loop.
    fn next_frame(&mut self) -> Result<Option<F>, RecognizerError>;
}

/// What a [`Display`] wants the loop to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayAction {
    Continue,
    Stop,
}

/// Renders frames annotated with the latest results.
///
/// Called once per cycle. On cycles that skip detection it receives the
/// results of the last processed frame, so boxes stay on screen.
pub trait Display<F> {
    fn render(&mut self, frame: &F, results: &[MatchResult]) -> DisplayAction;
}

/// Lifecycle state of a [`Recognizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Stopped,
    Running,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Running => write!(f, "running"),
        }
    }
}

/// Why [`Recognizer::run`] returned normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// [`StopHandle::stop`] was called.
    Requested,
    /// The frame source ran out of frames.
    EndOfStream,
    /// The display asked to stop (window closed, quit key).
    DisplayClosed,
}

/// Counters for one [`Recognizer::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub processed: u64,
    pub faces: u64,
    pub matched: u64,
    pub unrecognized: u64,
    /// Regions or frames whose detection, embedding or classification failed.
    pub dropped: u64,
    pub reason: StopReason,
}

/// Cloneable handle to stop a running loop and observe its state.
///
/// A stop requested before [`Recognizer::run`] starts makes it return
/// immediately. Each `run` consumes the pending stop on exit, so the same
/// recognizer can be run again.
#[derive(Clone, Default)]
pub struct StopHandle {
    inner: Arc<StopFlags>,
}

#[derive(Default)]
struct StopFlags {
    stop: AtomicBool,
    running: AtomicBool,
}

impl StopHandle {
    /// Asks the loop to stop. Takes effect within one cycle.
    pub fn stop(&self) {
        self.inner.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stop.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> LoopState {
        if self.inner.running.load(Ordering::SeqCst) {
            LoopState::Running
        } else {
            LoopState::Stopped
        }
    }

    fn enter(&self) -> Result<RunningGuard<'_>, RecognizerError> {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            return Err(RecognizerError::AlreadyRunning);
        }
        Ok(RunningGuard(self))
    }
}

/// Clears the stop request and flips the state back to `Stopped` on every
/// exit path.
struct RunningGuard<'a>(&'a StopHandle);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.inner.stop.store(false, Ordering::SeqCst);
        self.0.inner.running.store(false, Ordering::SeqCst);
    }
}

/// Controls recognition loop behavior.
#[derive(Debug, Clone, Copy)]
pub struct RecognizerConfig {
    /// Matching strictness passed to [`classify`].
    pub tolerance: Tolerance,

    /// Run detection on every n-th frame (default 2).
    pub process_every_n_frames: usize,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            tolerance: Tolerance::default(),
            process_every_n_frames: 2,
        }
    }
}

/// Drives frame source -> detector -> embedder -> matcher -> notifier.
///
/// The gallery is re-read from the store on every processed frame, so
/// identities enrolled while the loop runs are picked up on the next frame.
pub struct Recognizer<F> {
    store: Arc<EncodingStore>,
    detector: Arc<dyn FaceDetector<F>>,
    embedder: Arc<dyn FaceEmbedder<F>>,
    notifier: Arc<dyn Notifier>,
    tolerance: Tolerance,
    pacer: FramePacer,
    stop: StopHandle,
}

impl<F> Recognizer<F> {
    pub fn new(
        store: Arc<EncodingStore>,
        detector: Arc<dyn FaceDetector<F>>,
        embedder: Arc<dyn FaceEmbedder<F>>,
        notifier: Arc<dyn Notifier>,
        cfg: RecognizerConfig,
    ) -> Result<Self, RecognizerError> {
        Ok(Self {
            store,
            detector,
            embedder,
            notifier,
            tolerance: cfg.tolerance,
            pacer: FramePacer::every(cfg.process_every_n_frames)?,
            stop: StopHandle::default(),
        })
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn state(&self) -> LoopState {
        self.stop.state()
    }

    /// Runs until stopped, the source ends, or the display closes.
    ///
    /// Per-region failures are logged and dropped. A frame source error
    /// stops the loop and is returned.
    pub fn run(
        &self,
        source: &mut dyn FrameSource<F>,
        mut display: Option<&mut dyn Display<F>>,
    ) -> Result<RunSummary, RecognizerError> {
        let _running = self.stop.enter()?;
        info!(
            "recognizer running: tolerance={}, {} known faces",
            self.tolerance,
            self.store.len()
        );

        let mut summary = RunSummary {
            frames: 0,
            processed: 0,
            faces: 0,
            matched: 0,
            unrecognized: 0,
            dropped: 0,
            reason: StopReason::Requested,
        };
        let mut last: Vec<MatchResult> = Vec::new();

        let reason = loop {
            if self.stop.is_stopped() {
                break StopReason::Requested;
            }

            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break StopReason::EndOfStream,
                Err(e) => {
                    error!("frame source failed after {} frames: {}", summary.frames, e);
                    return Err(e);
                }
            };
            let cycle = summary.frames;
            summary.frames += 1;

            if self.stop.is_stopped() {
                break StopReason::Requested;
            }

            if self.pacer.should_process(cycle) {
                summary.processed += 1;
                last = self.process(&frame, &mut summary);
            }

            if let Some(d) = display.as_deref_mut() {
                if d.render(&frame, &last) == DisplayAction::Stop {
                    break StopReason::DisplayClosed;
                }
            }
        };

        summary.reason = reason;
        info!(
            "recognizer stopped ({:?}): {} frames, {} processed, {} matched, {} unrecognized",
            reason, summary.frames, summary.processed, summary.matched, summary.unrecognized
        );
        Ok(summary)
    }

    fn process(&self, frame: &F, summary: &mut RunSummary) -> Vec<MatchResult> {
        let snapshot = self.store.snapshot();
        let regions = match self.detector.detect(frame) {
            Ok(regions) => regions,
            Err(e) => {
                warn!("detection failed, dropping frame: {}", e);
                summary.dropped += 1;
                return Vec::new();
            }
        };
        debug!("{} faces detected", regions.len());

        let mut results = Vec::with_capacity(regions.len());
        for region in regions {
            summary.faces += 1;
            if region.is_empty() {
                debug!("skipping empty region {:?}", region);
                summary.dropped += 1;
                continue;
            }
            let vector = match self.embedder.embed(frame, &region) {
                Ok(v) => v,
                Err(e) => {
                    warn!("embedding failed for {:?}: {}", region, e);
                    summary.dropped += 1;
                    continue;
                }
            };
            let result = match classify(&vector, &snapshot, self.tolerance) {
                Ok(r) => r.at(region),
                Err(e) => {
                    warn!("classify failed for {:?}: {}", region, e);
                    summary.dropped += 1;
                    continue;
                }
            };

            if result.is_match() {
                summary.matched += 1;
            } else {
                summary.unrecognized += 1;
            }
            self.notifier.notify(&result);
            results.push(result);
        }
        results
    }
}
