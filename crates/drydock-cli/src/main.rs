//! Drydock - merge-queue validation pool tooling.
//!
//! ## Commands
//!
//! - `status`: query the tree gate and report go/no-go
//! - `snapshot`: inspect a pool snapshot file

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;

use drydock_core::init_tracing;
use drydock_pool::{GateConfig, TreeGate};
use drydock_review::PoolSnapshot;

#[derive(Parser)]
#[command(name = "drydock")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Merge-queue validation pool tooling", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query the tree status endpoint and report whether the tree is open
    Status {
        /// Status endpoint URL (default: $DRYDOCK_STATUS_URL)
        #[arg(long)]
        url: Option<String>,

        /// Treat an unreachable endpoint as closed instead of open
        #[arg(long)]
        fail_closed: bool,
    },

    /// Inspect a pool snapshot file
    Snapshot {
        /// Path to the snapshot JSON
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    match cli.command {
        Commands::Status { url, fail_closed } => {
            let mut config = GateConfig::from_env();
            if let Some(url) = url {
                config.status_url = url;
            }
            if fail_closed {
                config = config.fail_closed();
            }

            let gate = TreeGate::new(config);
            if gate.is_open().await {
                println!("tree is open");
            } else {
                println!("tree is closed, set it to open or throttled to proceed");
                std::process::exit(1);
            }
        }

        Commands::Snapshot { path } => {
            let snapshot = PoolSnapshot::load(&path)
                .with_context(|| format!("failed to load snapshot from {}", path.display()))?;

            println!("branch:      {}", snapshot.branch);
            println!("captured:    {}", snapshot.captured_at);
            println!("fingerprint: {}", snapshot.fingerprint().short());
            println!("changes:     {}", snapshot.entries.len());
            for entry in &snapshot.entries {
                println!(
                    "  {}/{} @ {}",
                    entry.project, entry.change_number, entry.commit
                );
            }
        }
    }

    Ok(())
}
