use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use facewatch_cli::NotifyConfig;
use facewatch_gallery::Tolerance;
use facewatch_recognizer::{
    ConsoleNotifier, FanoutNotifier, Notifier, Recognizer, RecognizerConfig, RunSummary,
    StopReason, WebhookNotifier,
};
use tracing::{info, warn};

use super::util::Session;
use crate::replay::{ReplayFrame, ReplayModel, ReplaySource};
use crate::Cli;

/// Run the recognition loop over a replay file.
///
/// Stops at end of stream or on Ctrl-C.
#[derive(Args)]
pub struct RunCommand {
    /// JSON-lines file with one frame per line
    #[arg(long)]
    pub replay: Option<PathBuf>,

    /// Pace frames at this rate instead of reading as fast as possible
    #[arg(long)]
    pub fps: Option<f32>,

    /// Override the configured tolerance
    #[arg(long)]
    pub tolerance: Option<f32>,
}

impl RunCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let (session, report) = Session::open(cli)?;
        session.print_startup(&report);

        let Some(replay) = &self.replay else {
            anyhow::bail!(
                "no capture backend for camera {} in this build, pass --replay <file>",
                session.config.camera_index
            );
        };

        let tolerance = Tolerance::new(self.tolerance.unwrap_or(session.config.tolerance))?;
        let notifier = build_notifier(&session.config.notify);

        let model = Arc::new(ReplayModel::new(&session.config.detector_options()));
        let recognizer = Recognizer::<ReplayFrame>::new(
            session.store.clone(),
            model.clone(),
            model,
            notifier,
            RecognizerConfig {
                tolerance,
                process_every_n_frames: session.config.process_every_n_frames,
            },
        )?;

        let mut source = ReplaySource::open(replay)?;
        if let Some(fps) = self.fps {
            source = source.with_fps(fps)?;
        }

        let stop = recognizer.stop_handle();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupted, stopping");
                stop.stop();
            }
        });

        let summary = tokio::task::spawn_blocking(move || recognizer.run(&mut source, None))
            .await
            .context("recognition loop panicked")??;

        print_summary(&summary);
        Ok(())
    }
}

fn build_notifier(cfg: &NotifyConfig) -> Arc<dyn Notifier> {
    let mut fan = FanoutNotifier::new();
    if cfg.console {
        fan.push(Arc::new(ConsoleNotifier::new()));
    }
    if let Some(url) = &cfg.webhook {
        info!("posting results to {}", url);
        fan.push(Arc::new(WebhookNotifier::new(url.clone())));
    }
    if fan.is_empty() {
        warn!("no notification target configured, results are only counted");
    }
    Arc::new(fan)
}

fn print_summary(s: &RunSummary) {
    let reason = match s.reason {
        StopReason::Requested => "stopped",
        StopReason::EndOfStream => "end of stream",
        StopReason::DisplayClosed => "display closed",
    };
    println!(
        "{}: {} frames, {} processed, {} faces ({} matched, {} unknown, {} dropped)",
        reason, s.frames, s.processed, s.faces, s.matched, s.unrecognized, s.dropped
    );
}
