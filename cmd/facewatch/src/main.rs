//! facewatch - watch a frame stream and report known faces.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod replay;

use commands::{AddCommand, InitCommand, ListCommand, ReconcileCommand, RunCommand};

/// facewatch - enroll identities and recognize them in a frame stream.
///
/// Every command except `init` first scans the faces directory and enrolls
/// any image whose identity has no stored descriptor yet.
#[derive(Parser)]
#[command(name = "facewatch")]
#[command(about = "Face enrollment and recognition tool")]
#[command(version)]
pub struct Cli {
    /// Config file (default is ./config.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default config file
    Init(InitCommand),
    /// Enroll one image under a name
    Add(AddCommand),
    /// List enrolled identities
    List(ListCommand),
    /// Enroll images in the faces directory that have no descriptor yet
    Reconcile(ReconcileCommand),
    /// Run the recognition loop over a frame stream
    Run(RunCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Init(cmd) => cmd.run(&cli),
        Commands::Add(cmd) => cmd.run(&cli),
        Commands::List(cmd) => cmd.run(&cli),
        Commands::Reconcile(cmd) => cmd.run(&cli),
        Commands::Run(cmd) => cmd.run(&cli).await,
    }
}
