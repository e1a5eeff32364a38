use std::path::{Path, PathBuf};

use clap::Args;
use facewatch_cli::{expand_home, Config, DEFAULT_CONFIG_FILE};

use crate::Cli;

/// Write a config file with every key at its default value.
#[derive(Args)]
pub struct InitCommand {
    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

impl InitCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let path = cli
            .config
            .as_deref()
            .map(expand_home)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        write_default(&path, self.force)?;
        println!("Wrote {}", path.display());
        Ok(())
    }
}

fn write_default(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists, use --force to overwrite", path.display());
    }
    Config::default().save(path)
}
