use crate::RecognizerError;

/// Decides which loop cycles run detection.
///
/// Cycle `i` (0-based) is processed iff `i % n == 0`. Skipping frames only
/// trades recognition latency for CPU; it never changes what a processed
/// frame is classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePacer {
    every: u64,
}

impl FramePacer {
    /// Processes every `n`-th cycle. `n = 1` processes every frame.
    pub fn every(n: usize) -> Result<Self, RecognizerError> {
        if n == 0 {
            return Err(RecognizerError::InvalidConfig(
                "process_every_n_frames must be at least 1".into(),
            ));
        }
        Ok(Self { every: n as u64 })
    }

    pub fn should_process(&self, cycle: u64) -> bool {
        cycle % self.every == 0
    }
}

impl Default for FramePacer {
    /// Every other frame.
    fn default() -> Self {
        Self { every: 2 }
    }
}
