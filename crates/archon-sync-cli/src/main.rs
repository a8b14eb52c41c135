mod cmd;
mod output;
mod root;

use archon_sync_core::StateStore;
use clap::{Parser, Subcommand};
use cmd::{daemon::DaemonSubcommand, emit::ModeArg, map::MapSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "archon-sync",
    about = "Hand off spec-driven feature folders to Archon through request and mapping files",
    version,
    propagate_version = true
)]
struct Cli {
    /// State directory (default: ../state next to the installed binary)
    #[arg(long, global = true, env = "ARCHON_STATE_DIR")]
    state_dir: Option<PathBuf>,

    /// Output as JSON (map and daemon status commands)
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Request creation of the Archon project for a feature
    Init { feature_dir: PathBuf },

    /// Request a document sync for the feature's spec documents
    SyncDocuments {
        feature_dir: PathBuf,
        #[arg(value_enum, default_value_t = ModeArg::Pull)]
        mode: ModeArg,
    },

    /// Request a task sync from the feature's tasks.md
    SyncTasks { feature_dir: PathBuf },

    /// Request that Archon task status be pulled back into tasks.md
    PullStatus { feature_dir: PathBuf },

    /// Run or control the periodic sync daemon
    Daemon {
        #[command(subcommand)]
        subcommand: DaemonSubcommand,
    },

    /// Read or record feature mappings
    Map {
        #[command(subcommand)]
        subcommand: MapSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Daemon {
            subcommand: DaemonSubcommand::Run { .. },
        } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    // Diagnostics go to stderr; stdout stays silent for the emitters.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = root::resolve_state_dir(cli.state_dir.as_deref()).and_then(|dir| {
        let store = StateStore::new(dir);
        match cli.command {
            Commands::Init { feature_dir } => cmd::emit::init(&store, &feature_dir),
            Commands::SyncDocuments { feature_dir, mode } => {
                cmd::emit::sync_documents(&store, &feature_dir, mode)
            }
            Commands::SyncTasks { feature_dir } => cmd::emit::sync_tasks(&store, &feature_dir),
            Commands::PullStatus { feature_dir } => cmd::emit::pull_status(&store, &feature_dir),
            Commands::Daemon { subcommand } => cmd::daemon::run(&store, subcommand, cli.json),
            Commands::Map { subcommand } => cmd::map::run(&store, subcommand, cli.json),
        }
    });

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
