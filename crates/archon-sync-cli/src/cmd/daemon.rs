use crate::output::print_json;
use anyhow::{bail, Context};
use archon_sync_core::config::{ArchonConfig, MIN_DAEMON_INTERVAL_SECS};
use archon_sync_core::daemon::{self, PidFile};
use archon_sync_core::{paths, StateStore};
use clap::Subcommand;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Subcommand)]
pub enum DaemonSubcommand {
    /// Run document sync, task sync and status pull on a fixed interval until stopped
    Run {
        feature_dir: std::path::PathBuf,
        /// Seconds between sync cycles (default from config.yaml, else 300)
        #[arg(value_parser = clap::value_parser!(u64).range(MIN_DAEMON_INTERVAL_SECS..))]
        interval: Option<u64>,
    },
    /// Send SIGTERM to the daemon recorded for a feature
    Stop { feature_dir: std::path::PathBuf },
    /// Show whether a daemon is running for a feature
    Status { feature_dir: std::path::PathBuf },
}

pub fn run(store: &StateStore, subcmd: DaemonSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        DaemonSubcommand::Run {
            feature_dir,
            interval,
        } => start(store, &feature_dir, interval),
        DaemonSubcommand::Stop { feature_dir } => stop(store, &feature_dir, json),
        DaemonSubcommand::Status { feature_dir } => status(store, &feature_dir, json),
    }
}

/// Feature name and absolute directory for a `feature_dir` argument.
fn feature_of(feature_dir: &Path) -> anyhow::Result<(String, PathBuf)> {
    let dir = paths::absolute_dir(feature_dir)
        .with_context(|| format!("cannot resolve '{}'", feature_dir.display()))?;
    let feature = paths::feature_name_of(&dir);
    if feature.is_empty() {
        bail!("cannot derive a feature name from '{}'", feature_dir.display());
    }
    Ok((feature, dir))
}

fn start(store: &StateStore, feature_dir: &Path, interval: Option<u64>) -> anyhow::Result<()> {
    let secs = interval
        .unwrap_or_else(|| ArchonConfig::load_or_default(store.dir()).daemon.interval_secs);
    let interval = daemon::validate_interval(secs)?;
    let (feature, feature_dir) = feature_of(feature_dir)?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;
    // Signal handlers go in before the PID file exists, so anyone who reads
    // the PID can stop us cleanly.
    let shutdown = {
        let _guard = rt.enter();
        shutdown_signal().context("failed to install signal handlers")?
    };

    let pid_file = PidFile::new(store, &feature);
    pid_file
        .claim(std::process::id())
        .context("failed to write daemon PID file")?;
    tracing::info!(
        feature,
        pid = std::process::id(),
        interval_secs = interval.as_secs(),
        "daemon started"
    );

    rt.block_on(schedule(store, &feature_dir, interval, shutdown));

    if let Err(e) = pid_file.remove() {
        tracing::warn!(error = %e, "failed to remove daemon PID file");
    }
    tracing::info!(feature, "daemon stopped");
    Ok(())
}

/// Sleep, sync, repeat, until `shutdown` resolves.
async fn schedule(
    store: &StateStore,
    feature_dir: &Path,
    interval: Duration,
    shutdown: impl Future<Output = ()>,
) {
    let mut shutdown = std::pin::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => return,
            _ = tokio::time::sleep(interval) => {}
        }
        let report = daemon::run_cycle(store, feature_dir);
        tracing::info!(
            written = report.written.len(),
            failures = report.failures,
            "sync cycle complete"
        );
    }
}

/// Resolves on SIGTERM or SIGINT. Must be called inside a runtime context;
/// the handlers are registered immediately, not on first poll.
#[cfg(unix)]
fn shutdown_signal() -> std::io::Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut term = signal(SignalKind::terminate())?;
    let mut int = signal(SignalKind::interrupt())?;
    Ok(async move {
        tokio::select! {
            _ = term.recv() => tracing::info!("received SIGTERM"),
            _ = int.recv() => tracing::info!("received SIGINT"),
        }
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> std::io::Result<impl Future<Output = ()>> {
    Ok(async {
        let _ = tokio::signal::ctrl_c().await;
    })
}

fn stop(store: &StateStore, feature_dir: &Path, json: bool) -> anyhow::Result<()> {
    let (feature, _) = feature_of(feature_dir)?;
    let pid_file = PidFile::new(store, &feature);

    let recorded = pid_file.read();
    let outcome = match recorded {
        None => "not_running",
        Some(pid) if !daemon::is_pid_alive(pid) => {
            pid_file.remove().context("failed to remove stale PID file")?;
            "stale"
        }
        Some(pid) => {
            daemon::kill_pid(pid).with_context(|| format!("failed to stop daemon (PID {pid})"))?;
            "stopped"
        }
    };

    if json {
        print_json(&serde_json::json!({
            "feature": feature,
            "pid": recorded,
            "result": outcome,
        }))?;
    } else {
        match outcome {
            "stopped" => println!("Stopped daemon for '{feature}'"),
            "stale" => println!("Removed stale PID file for '{feature}'"),
            _ => println!("No daemon running for '{feature}'"),
        }
    }
    Ok(())
}

fn status(store: &StateStore, feature_dir: &Path, json: bool) -> anyhow::Result<()> {
    let (feature, _) = feature_of(feature_dir)?;
    let pid = PidFile::new(store, &feature).read();
    let running = pid.is_some_and(daemon::is_pid_alive);

    if json {
        print_json(&serde_json::json!({
            "feature": feature,
            "pid": pid,
            "running": running,
        }))?;
    } else if running {
        println!("Daemon for '{feature}' running (PID {})", pid.unwrap_or_default());
    } else {
        println!("No daemon running for '{feature}'");
    }
    Ok(())
}
