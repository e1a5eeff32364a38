use clap::Args;
use serde::Serialize;

use super::util::Session;
use crate::Cli;

/// List enrolled identities.
#[derive(Args)]
pub struct ListCommand {
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct Entry {
    label: String,
    dimension: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
}

impl ListCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let (session, report) = Session::open(cli)?;
        if !self.json {
            session.print_startup(&report);
        }

        let gallery = session.store.snapshot();
        let entries: Vec<Entry> = gallery
            .values()
            .map(|d| Entry {
                label: d.label().to_string(),
                dimension: d.dimension(),
                source: d.source_path().map(|p| p.display().to_string()),
            })
            .collect();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&entries)?);
            return Ok(());
        }

        if entries.is_empty() {
            println!("No identities enrolled.");
            return Ok(());
        }
        for e in &entries {
            match &e.source {
                Some(src) => println!("{:<24} {:>5}  {}", e.label, e.dimension, src),
                None => println!("{:<24} {:>5}", e.label, e.dimension),
            }
        }
        Ok(())
    }
}
