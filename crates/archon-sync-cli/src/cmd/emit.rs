use anyhow::Context;
use archon_sync_core::config::ArchonConfig;
use archon_sync_core::emit;
use archon_sync_core::request::SyncMode;
use archon_sync_core::StateStore;
use clap::ValueEnum;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum ModeArg {
    #[default]
    Pull,
    Push,
}

impl From<ModeArg> for SyncMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Pull => SyncMode::Pull,
            ModeArg::Push => SyncMode::Push,
        }
    }
}

fn report(kind: &str, feature_dir: &Path, written: Option<PathBuf>) {
    match written {
        Some(path) => tracing::info!(kind, path = %path.display(), "request written"),
        None => tracing::debug!(kind, dir = %feature_dir.display(), "nothing to emit"),
    }
}

pub fn init(store: &StateStore, feature_dir: &Path) -> anyhow::Result<()> {
    let written = emit::init(store, feature_dir).context("failed to write init request")?;
    report("init", feature_dir, written);
    Ok(())
}

pub fn sync_documents(store: &StateStore, feature_dir: &Path, mode: ModeArg) -> anyhow::Result<()> {
    let config = ArchonConfig::load_or_default(store.dir());
    let written = emit::sync_documents(store, &config, feature_dir, mode.into())
        .context("failed to write document sync request")?;
    report("sync-documents", feature_dir, written);
    Ok(())
}

pub fn sync_tasks(store: &StateStore, feature_dir: &Path) -> anyhow::Result<()> {
    let written =
        emit::sync_tasks(store, feature_dir).context("failed to write task sync request")?;
    report("sync-tasks", feature_dir, written);
    Ok(())
}

pub fn pull_status(store: &StateStore, feature_dir: &Path) -> anyhow::Result<()> {
    let written =
        emit::pull_status(store, feature_dir).context("failed to write status pull request")?;
    report("pull-status", feature_dir, written);
    Ok(())
}
