//! Shared startup for all commands.

use std::sync::Arc;

use anyhow::Context;
use facewatch_cli::{load_config, Config};
use facewatch_gallery::{EncodingStore, Enroller, ReconcileReport, StoreConfig};
use tracing::{info, warn};

use crate::replay::{ReplayFrame, ReplayModel, SidecarLoader};
use crate::Cli;

/// Loaded configuration plus an open gallery.
pub struct Session {
    pub config: Config,
    pub store: Arc<EncodingStore>,
    pub enroller: Enroller<ReplayFrame>,
}

impl Session {
    /// Loads config, opens the store and reconciles the faces directory.
    pub fn open(cli: &Cli) -> anyhow::Result<(Self, ReconcileReport)> {
        let config = load_config(cli.config.as_deref())?;

        let store_cfg = StoreConfig {
            dir: config.store_dir(),
            dimension: config.dimension,
        };
        let store = EncodingStore::open(store_cfg)
            .with_context(|| format!("open gallery at {}", config.store_dir().display()))?;
        let store = Arc::new(store);
        info!(
            "gallery {} loaded: {} identities",
            store.dir().display(),
            store.len()
        );

        let model = Arc::new(ReplayModel::new(&config.detector_options()));
        let enroller = Enroller::<ReplayFrame>::new(store.clone(), model.clone(), model);

        let faces_dir = config.faces_dir();
        let report = enroller
            .reconcile_with_images(&faces_dir, &SidecarLoader)
            .with_context(|| format!("reconcile {}", faces_dir.display()))?;
        for (path, reason) in &report.skipped {
            warn!("not enrolled {}: {}", path.display(), reason);
        }

        Ok((
            Self {
                config,
                store,
                enroller,
            },
            report,
        ))
    }

    /// Prints the one-line startup summary.
    pub fn print_startup(&self, report: &ReconcileReport) {
        println!(
            "Added {} encodings from `{}`",
            report.added.len(),
            self.config.faces_dir().display()
        );
    }
}
