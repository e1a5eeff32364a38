use clap::Args;

use super::util::Session;
use crate::Cli;

/// Enroll images in the faces directory that have no descriptor yet.
///
/// Every command does this on startup; this one also lists what was
/// added and skipped.
#[derive(Args)]
pub struct ReconcileCommand {}

impl ReconcileCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let (session, report) = Session::open(cli)?;
        session.print_startup(&report);
        for label in &report.added {
            println!("  + {label}");
        }
        for (path, reason) in &report.skipped {
            println!("  ! {}: {}", path.display(), reason);
        }
        Ok(())
    }
}
