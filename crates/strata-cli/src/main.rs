//! Strata CLI
//!
//! Checks and inspects class graphs described in TOML manifests.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use strata_cli::commands::{check, dump};

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Strata class graph toolkit", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and finalize a manifest, reporting every error
    Check {
        /// Manifest file
        manifest: PathBuf,
    },

    /// Print merged member tables
    Dump {
        /// Manifest file
        manifest: PathBuf,
        /// Only this class
        #[arg(short, long)]
        class: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Check { manifest } => check::execute(&manifest),
        Commands::Dump { manifest, class } => dump::execute(&manifest, class.as_deref()),
    }
}
