//! Continuous face recognition loop.
//!
//! # Pipeline
//!
//! Each cycle of [`Recognizer::run`]:
//!
//! 1. [`FrameSource::next_frame`]: blocking pull of the next frame
//! 2. [`FramePacer::should_process`]: skip detection on some cycles
//! 3. `FaceDetector::detect` -> `FaceEmbedder::embed` -> `classify` against
//!    the latest gallery snapshot
//! 4. [`Notifier::notify`] for every result, [`Display::render`] once per frame
//!
//! The loop is `Stopped -> Running -> Stopped`. It stops on
//! [`StopHandle::stop`], end of stream, or when the display closes; a frame
//! source error also stops it and is returned to the caller.

mod error;
pub mod notifier;
mod pacing;
mod recognizer;

pub use error::RecognizerError;
pub use notifier::{ConsoleNotifier, FanoutNotifier, Notifier, WebhookEvent, WebhookNotifier};
pub use pacing::FramePacer;
pub use recognizer::{
    Display, DisplayAction, FrameSource, LoopState, Recognizer, RecognizerConfig, RunSummary,
    StopHandle, StopReason,
};
