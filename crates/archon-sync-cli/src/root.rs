use anyhow::Context;
use archon_sync_core::paths;
use std::path::{Path, PathBuf};

/// Resolve the state directory once, at process start.
///
/// Priority:
/// 1. `--state-dir` flag / `ARCHON_STATE_DIR` env var (passed in as `explicit`),
///    made absolute against the current directory
/// 2. `../state` next to the directory holding the running binary
///
/// The default never depends on the current directory.
pub fn resolve_state_dir(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    if let Some(p) = explicit {
        return std::path::absolute(p)
            .with_context(|| format!("invalid state directory '{}'", p.display()));
    }
    let exe = std::env::current_exe().context("cannot locate the running binary")?;
    paths::state_dir_for_exe(&exe)
        .with_context(|| format!("cannot derive state directory from '{}'", exe.display()))
}
