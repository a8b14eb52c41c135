use crate::error::Result;
use std::io::Write;
use std::path::Path;
use tempfile::Builder;

/// Atomically write `data` to `path` using a `*.tmp` file in the same directory.
///
/// The temp file is removed by its drop guard on every error path, so a
/// failed write leaves neither a partial destination nor a stray temp file.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    ensure_dir(dir)?;
    let mut tmp = Builder::new().prefix(".").suffix(".tmp").tempfile_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Create a directory and all parents, idempotent.
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

/// Read a file as text, treating a missing or unreadable file as absent.
pub fn read_lenient(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(s) => Some(s),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "unreadable state file");
            None
        }
    }
}

/// Remove a file. Silently succeeds if the file is gone.
pub fn remove_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tmp_files(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".tmp"))
            .collect()
    }

    #[test]
    fn atomic_write_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("001-demo.pid");
        atomic_write(&path, b"proj-1").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "proj-1");
        assert!(tmp_files(dir.path()).is_empty());
    }

    #[test]
    fn atomic_write_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a/b/state/x.docs");
        atomic_write(&path, b"data").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn atomic_write_replaces_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.tasks");
        atomic_write(&path, b"old").unwrap();
        atomic_write(&path, b"new").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn atomic_write_fails_when_parent_is_a_file() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("state");
        std::fs::write(&blocker, b"not a dir").unwrap();
        assert!(atomic_write(&blocker.join("x.pid"), b"v").is_err());
        assert!(tmp_files(dir.path()).is_empty());
    }

    #[test]
    fn read_lenient_missing_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(read_lenient(&dir.path().join("nope")).is_none());
    }

    #[test]
    fn remove_if_exists_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.daemon.pid");
        std::fs::write(&path, b"1").unwrap();
        remove_if_exists(&path).unwrap();
        remove_if_exists(&path).unwrap();
        assert!(!path.exists());
    }
}
