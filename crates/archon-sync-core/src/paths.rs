use crate::error::{ArchonError, Result};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// State directory layout
// ---------------------------------------------------------------------------

/// State directory, relative to the directory holding the installed binary.
pub const INSTALL_STATE_DIR: &str = "../state";

pub const CONFIG_FILE: &str = "config.yaml";

pub const PROJECT_EXT: &str = "pid";
pub const DOCS_EXT: &str = "docs";
pub const TASKS_EXT: &str = "tasks";
pub const META_EXT: &str = "meta";
pub const DAEMON_PID_EXT: &str = "daemon.pid";

// ---------------------------------------------------------------------------
// Feature document layout
// ---------------------------------------------------------------------------

pub const SPEC_MD: &str = "spec.md";
pub const TASKS_MD: &str = "tasks.md";
pub const CONTRACTS_DIR: &str = "contracts";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// `<state_dir>/<feature>.<ext>`
pub fn state_file(state_dir: &Path, feature: &str, ext: &str) -> PathBuf {
    state_dir.join(format!("{feature}.{ext}"))
}

pub fn config_path(state_dir: &Path) -> PathBuf {
    state_dir.join(CONFIG_FILE)
}

pub fn daemon_pid_path(state_dir: &Path, feature: &str) -> PathBuf {
    state_file(state_dir, feature, DAEMON_PID_EXT)
}

pub fn spec_path(feature_dir: &Path) -> PathBuf {
    feature_dir.join(SPEC_MD)
}

pub fn tasks_path(feature_dir: &Path) -> PathBuf {
    feature_dir.join(TASKS_MD)
}

/// Derive the state directory from the path of the running executable.
///
/// The executable path is canonicalized first so symlinked installs resolve
/// to one location regardless of how the binary was invoked.
pub fn state_dir_for_exe(exe: &Path) -> Result<PathBuf> {
    let exe = exe.canonicalize()?;
    let bin_dir = exe
        .parent()
        .ok_or_else(|| ArchonError::StateDir(format!("{} has no parent", exe.display())))?;
    Ok(normalize(&bin_dir.join(INSTALL_STATE_DIR)))
}

/// Make a feature directory absolute once, so request files never carry
/// paths that depend on the caller's working directory.
///
/// Existing directories are canonicalized (which also turns `.` into a real
/// name); anything else is made absolute lexically.
pub fn absolute_dir(path: &Path) -> Result<PathBuf> {
    match path.canonicalize() {
        Ok(p) => Ok(p),
        Err(_) => Ok(normalize(&std::path::absolute(path)?)),
    }
}

/// Collapse `.` and `..` components lexically, without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    use std::path::Component;
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(comp);
                }
            }
            c => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Feature resolver
// ---------------------------------------------------------------------------

/// Feature name for a feature directory: its last path component.
///
/// Pure string handling. Both `/` and `\` separate components and trailing
/// separators are ignored. Returns an empty string for input with no usable
/// final component (empty, a root, a bare drive such as `C:`, `.` or `..`).
pub fn resolve_feature_name(path: &str) -> String {
    let Some(last) = path.split(['/', '\\']).rev().find(|s| !s.is_empty()) else {
        return String::new();
    };
    let last = last.trim();
    let is_drive = last.len() == 2
        && last.ends_with(':')
        && last.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
    if last.is_empty() || last == "." || last == ".." || is_drive {
        return String::new();
    }
    last.to_string()
}

/// [`resolve_feature_name`] for an OS path.
pub fn feature_name_of(path: &Path) -> String {
    resolve_feature_name(&path.to_string_lossy())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
