//! Outputs for classification results.
//!
//! Notifiers are best effort: they never return errors to the loop. Anything
//! that can fail is logged and dropped.

use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{Local, SecondsFormat};
use facewatch_gallery::MatchResult;
use serde::Serialize;
use tracing::{debug, warn};

/// Receives every classification result produced by the loop.
///
/// Implementations must be safe for concurrent use and should return
/// quickly; slow work belongs on a background thread.
pub trait Notifier: Send + Sync {
    fn notify(&self, result: &MatchResult);
}

/// Prints one line per result to stdout.
///
/// ```text
/// [MATCH] 2024-05-01T10:00:00.000+02:00 - alice (distance=0.141)
/// [UNKNOWN] 2024-05-01T10:00:00.000+02:00 - unknown face (closest distance=0.732)
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self
    }

    pub fn format_line(result: &MatchResult, timestamp: &str) -> String {
        match &result.label {
            Some(label) => format!(
                "[MATCH] {} - {} (distance={:.3})",
                timestamp, label, result.distance
            ),
            None => format!(
                "[UNKNOWN] {} - unknown face (closest distance={:.3})",
                timestamp, result.distance
            ),
        }
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, result: &MatchResult) {
        println!("{}", Self::format_line(result, &now()));
    }
}

/// Forwards each result to several notifiers, in order.
#[derive(Default, Clone)]
pub struct FanoutNotifier {
    targets: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, target: Arc<dyn Notifier>) {
        self.targets.push(target);
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl Notifier for FanoutNotifier {
    fn notify(&self, result: &MatchResult) {
        for t in &self.targets {
            t.notify(result);
        }
    }
}

/// JSON body posted by [`WebhookNotifier`].
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WebhookEvent {
    /// `"match"` or `"unknown"`.
    pub event: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub distance: f32,
    /// `[top, right, bottom, left]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<[i32; 4]>,
    pub timestamp: String,
}

impl WebhookEvent {
    pub fn from_result(result: &MatchResult, timestamp: String) -> Self {
        Self {
            event: if result.is_match() { "match" } else { "unknown" },
            label: result.label.as_ref().map(|l| l.to_string()),
            distance: result.distance,
            region: result
                .region
                .map(|r| [r.top, r.right, r.bottom, r.left]),
            timestamp,
        }
    }
}

/// POSTs each result as JSON to a URL.
///
/// Requests run on a dedicated worker thread fed by a bounded queue, so the
/// recognition loop never waits on the network. When the queue is full the
/// event is dropped with a warning. Dropping the notifier drains the queue
/// and joins the worker.
pub struct WebhookNotifier {
    tx: Option<SyncSender<WebhookEvent>>,
    worker: Option<JoinHandle<()>>,
}

impl WebhookNotifier {
    pub const DEFAULT_QUEUE: usize = 64;
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(url: impl Into<String>) -> Self {
        Self::with_queue(url, Self::DEFAULT_QUEUE, Self::DEFAULT_TIMEOUT)
    }

    pub fn with_queue(url: impl Into<String>, queue: usize, timeout: Duration) -> Self {
        let url = url.into();
        let (tx, rx) = mpsc::sync_channel::<WebhookEvent>(queue.max(1));
        let worker = thread::Builder::new()
            .name("webhook-notifier".into())
            .spawn(move || {
                let config = ureq::Agent::config_builder()
                    .timeout_global(Some(timeout))
                    .build();
                let agent: ureq::Agent = config.into();
                for ev in rx {
                    match post(&agent, &url, &ev) {
                        Ok(()) => debug!("webhook delivered {} event", ev.event),
                        Err(e) => warn!("webhook {} failed: {}", url, e),
                    }
                }
            });
        let worker = match worker {
            Ok(h) => Some(h),
            Err(e) => {
                warn!("failed to start webhook worker: {}", e);
                None
            }
        };
        Self {
            tx: worker.as_ref().map(|_| tx),
            worker,
        }
    }
}

fn post(agent: &ureq::Agent, url: &str, ev: &WebhookEvent) -> Result<(), String> {
    let body = serde_json::to_vec(ev).map_err(|e| e.to_string())?;
    agent
        .post(url)
        .header("Content-Type", "application/json")
        .send(&body[..])
        .map_err(|e| e.to_string())?;
    Ok(())
}

impl Notifier for WebhookNotifier {
    fn notify(&self, result: &MatchResult) {
        let Some(tx) = &self.tx else {
            return;
        };
        match tx.try_send(WebhookEvent::from_result(result, now())) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => warn!("webhook queue full, dropping event"),
            Err(TrySendError::Disconnected(_)) => warn!("webhook worker is gone, dropping event"),
        }
    }
}

impl Drop for WebhookNotifier {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(h) = self.worker.take() {
            let _ = h.join();
        }
    }
}

fn now() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Millis, false)
}
