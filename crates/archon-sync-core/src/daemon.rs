use crate::config::{ArchonConfig, MIN_DAEMON_INTERVAL_SECS};
use crate::emit;
use crate::error::{ArchonError, Result};
use crate::io::{atomic_write, read_lenient, remove_if_exists};
use crate::paths;
use crate::request::SyncMode;
use crate::store::StateStore;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Reject intervals below the floor before anything else happens.
pub fn validate_interval(secs: u64) -> Result<Duration> {
    if secs < MIN_DAEMON_INTERVAL_SECS {
        return Err(ArchonError::InvalidInterval {
            got: secs,
            min: MIN_DAEMON_INTERVAL_SECS,
        });
    }
    Ok(Duration::from_secs(secs))
}

// ---------------------------------------------------------------------------
// PID file
// ---------------------------------------------------------------------------

/// `<feature>.daemon.pid` in the state directory.
#[derive(Debug, Clone)]
pub struct PidFile {
    feature: String,
    path: PathBuf,
}

impl PidFile {
    pub fn new(store: &StateStore, feature: &str) -> Self {
        Self {
            feature: feature.to_string(),
            path: paths::daemon_pid_path(store.dir(), feature),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> Option<u32> {
        read_lenient(&self.path).and_then(|s| s.trim().parse().ok())
    }

    /// Record `pid`. Fails if a different live process is already recorded;
    /// a stale record is overwritten.
    pub fn claim(&self, pid: u32) -> Result<()> {
        if let Some(existing) = self.read() {
            if existing != pid && is_pid_alive(existing) {
                return Err(ArchonError::DaemonRunning {
                    feature: self.feature.clone(),
                    pid: existing,
                });
            }
        }
        atomic_write(&self.path, format!("{pid}\n").as_bytes())
    }

    pub fn remove(&self) -> Result<()> {
        remove_if_exists(&self.path)
    }
}

// ---------------------------------------------------------------------------
// PID helpers (Unix only)
// ---------------------------------------------------------------------------

/// Returns true if the process is still alive (`kill -0 {pid}`).
pub fn is_pid_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        std::process::Command::new("kill")
            .args(["-0", &pid.to_string()])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        false
    }
}

/// Send SIGTERM to a process (`kill -TERM {pid}`).
pub fn kill_pid(pid: u32) -> Result<()> {
    #[cfg(unix)]
    {
        let status = std::process::Command::new("kill")
            .args(["-TERM", &pid.to_string()])
            .output()?
            .status;
        if !status.success() {
            return Err(ArchonError::Io(std::io::Error::other(format!(
                "kill -TERM {pid} failed with exit code {:?}",
                status.code()
            ))));
        }
        Ok(())
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        Err(ArchonError::Io(std::io::Error::other(
            "stopping the daemon is not supported on this platform",
        )))
    }
}

// ---------------------------------------------------------------------------
// Sync cycle
// ---------------------------------------------------------------------------

/// Outcome of one daemon tick, for logging.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub written: Vec<PathBuf>,
    pub failures: usize,
}

/// Run document sync (pull), task sync and status pull once, in that order.
///
/// Emitter errors are logged and counted; they never stop the cycle.
pub fn run_cycle(store: &StateStore, feature_dir: &Path) -> CycleReport {
    let config = ArchonConfig::load_or_default(store.dir());
    let steps: [(&str, Result<Option<PathBuf>>); 3] = [
        (
            "sync-documents",
            emit::sync_documents(store, &config, feature_dir, SyncMode::Pull),
        ),
        ("sync-tasks", emit::sync_tasks(store, feature_dir)),
        ("pull-status", emit::pull_status(store, feature_dir)),
    ];

    let mut report = CycleReport::default();
    for (step, result) in steps {
        match result {
            Ok(Some(path)) => report.written.push(path),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(step, error = %e, "sync step failed; continuing");
                report.failures += 1;
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn interval_floor() {
        assert!(validate_interval(30).is_err());
        assert!(validate_interval(59).is_err());
        assert_eq!(validate_interval(60).unwrap(), Duration::from_secs(60));
    }

    #[test]
    fn pid_file_claim_read_remove() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("state"));
        let pid = PidFile::new(&store, "001-x");
        assert_eq!(pid.read(), None);

        let me = std::process::id();
        pid.claim(me).unwrap();
        assert_eq!(pid.read(), Some(me));
        assert!(pid.path().ends_with("001-x.daemon.pid"));

        pid.remove().unwrap();
        assert!(!pid.path().exists());
        pid.remove().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn live_daemon_blocks_second_claim() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("state"));
        let pid = PidFile::new(&store, "001-x");
        // Our own test process is certainly alive.
        pid.claim(std::process::id()).unwrap();
        let err = pid.claim(std::process::id() + 1).unwrap_err();
        assert!(matches!(err, ArchonError::DaemonRunning { .. }));
    }

    #[test]
    fn garbage_pid_file_is_overwritten() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("state"));
        std::fs::create_dir_all(store.dir()).unwrap();
        let pid = PidFile::new(&store, "001-x");
        std::fs::write(pid.path(), "not-a-pid").unwrap();
        pid.claim(42).unwrap();
        assert_eq!(pid.read(), Some(42));
    }

    #[cfg(unix)]
    #[test]
    fn dead_pid_is_overwritten() {
        let mut exited = std::process::Command::new("true").spawn().unwrap();
        let dead = exited.id();
        exited.wait().unwrap();
        assert!(!is_pid_alive(dead));

        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("state"));
        let pid = PidFile::new(&store, "001-x");
        pid.claim(dead).unwrap();
        assert_eq!(pid.read(), Some(dead));

        pid.claim(std::process::id()).unwrap();
        assert_eq!(pid.read(), Some(std::process::id()));
    }

    #[cfg(unix)]
    #[test]
    fn live_pid_blocks_claim() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("state"));
        let pid = PidFile::new(&store, "001-x");
        pid.claim(std::process::id()).unwrap();

        let err = pid.claim(std::process::id() + 1).unwrap_err();
        assert!(matches!(err, ArchonError::DaemonRunning { .. }), "{err}");
    }

    #[test]
    fn cycle_writes_all_three_requests() {
        let dir = TempDir::new().unwrap();
        let feature_dir = dir.path().join("specs/001-x");
        std::fs::create_dir_all(&feature_dir).unwrap();
        std::fs::write(feature_dir.join("spec.md"), "# X\n").unwrap();
        std::fs::write(feature_dir.join("tasks.md"), "- [ ] T001 a\n").unwrap();
        let store = StateStore::new(dir.path().join("state"));

        let report = run_cycle(&store, &feature_dir);
        assert_eq!(report.failures, 0);
        assert_eq!(report.written.len(), 3);
    }

    #[test]
    fn cycle_swallows_failures() {
        let dir = TempDir::new().unwrap();
        let feature_dir = dir.path().join("specs/001-x");
        std::fs::create_dir_all(&feature_dir).unwrap();
        std::fs::write(feature_dir.join("spec.md"), "# X\n").unwrap();
        std::fs::write(feature_dir.join("tasks.md"), "- [ ] T001 a\n").unwrap();
        let state = dir.path().join("state");
        std::fs::write(&state, b"blocked").unwrap();

        let report = run_cycle(&StateStore::new(&state), &feature_dir);
        assert_eq!(report.failures, 3);
        assert!(report.written.is_empty());
    }
}
