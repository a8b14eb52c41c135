use crate::error::{ArchonError, Result};
use crate::io::{atomic_write, read_lenient};
use crate::paths::{self, DOCS_EXT, META_EXT, PROJECT_EXT, TASKS_EXT};
use crate::record::{self, Delimiter};
use crate::request::{RequestKind, SyncRequest};
use chrono::{SecondsFormat, Utc};
use std::path::{Path, PathBuf};

/// ISO-8601 UTC timestamp, second precision, `Z` suffix.
pub fn current_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

// ---------------------------------------------------------------------------
// MappingKind
// ---------------------------------------------------------------------------

/// The multi-value mapping files kept per feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingKind {
    Document,
    Task,
    SyncMetadata,
}

impl MappingKind {
    pub fn ext(self) -> &'static str {
        match self {
            MappingKind::Document => DOCS_EXT,
            MappingKind::Task => TASKS_EXT,
            MappingKind::SyncMetadata => META_EXT,
        }
    }

    pub fn delimiter(self) -> Delimiter {
        match self {
            MappingKind::Document | MappingKind::Task => Delimiter::Colon,
            MappingKind::SyncMetadata => Delimiter::Pipe,
        }
    }
}

// ---------------------------------------------------------------------------
// StateStore
// ---------------------------------------------------------------------------

/// Per-feature key-value state backed by plain-text files in one directory.
///
/// Every write goes through [`atomic_write`], so concurrent readers in other
/// processes see either the previous or the new file, never a partial one.
/// Concurrent writers to the same key: last writer wins.
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, feature: &str, ext: &str) -> PathBuf {
        paths::state_file(&self.dir, feature, ext)
    }

    // -- project ------------------------------------------------------------

    pub fn save_project_mapping(&self, feature: &str, project_id: &str) -> Result<()> {
        check_feature(feature)?;
        check_value(project_id)?;
        atomic_write(&self.path_for(feature, PROJECT_EXT), project_id.as_bytes())?;
        tracing::debug!(feature, project_id, "saved project mapping");
        Ok(())
    }

    pub fn get_project_mapping(&self, feature: &str) -> Option<String> {
        if check_feature(feature).is_err() {
            return None;
        }
        let data = read_lenient(&self.path_for(feature, PROJECT_EXT))?;
        // Hand-edited files usually end in a newline; nothing else is stripped.
        let value = data.trim_end_matches(['\n', '\r']);
        check_value(value).ok().map(|()| value.to_string())
    }

    // -- documents ----------------------------------------------------------

    pub fn save_document_mapping(
        &self,
        feature: &str,
        filename: &str,
        doc_id: &str,
    ) -> Result<()> {
        self.upsert(MappingKind::Document, feature, filename, doc_id)
    }

    pub fn get_document_mapping(&self, feature: &str, filename: &str) -> Option<String> {
        self.lookup(MappingKind::Document, feature, filename)
    }

    pub fn document_mappings(&self, feature: &str) -> Vec<(String, String)> {
        self.entries(MappingKind::Document, feature)
    }

    // -- tasks --------------------------------------------------------------

    pub fn save_task_mapping(
        &self,
        feature: &str,
        task_local_id: &str,
        task_remote_id: &str,
    ) -> Result<()> {
        self.upsert(MappingKind::Task, feature, task_local_id, task_remote_id)
    }

    pub fn get_task_mapping(&self, feature: &str, task_local_id: &str) -> Option<String> {
        self.lookup(MappingKind::Task, feature, task_local_id)
    }

    pub fn task_mappings(&self, feature: &str) -> Vec<(String, String)> {
        self.entries(MappingKind::Task, feature)
    }

    // -- sync metadata ------------------------------------------------------

    pub fn save_sync_metadata(
        &self,
        feature: &str,
        filename: &str,
        timestamp: &str,
    ) -> Result<()> {
        self.upsert(MappingKind::SyncMetadata, feature, filename, timestamp)
    }

    pub fn get_sync_metadata(&self, feature: &str, filename: &str) -> Option<String> {
        self.lookup(MappingKind::SyncMetadata, feature, filename)
    }

    pub fn sync_metadata(&self, feature: &str) -> Vec<(String, String)> {
        self.entries(MappingKind::SyncMetadata, feature)
    }

    // -- requests -----------------------------------------------------------

    /// Overwrite the pending request of this kind for `feature`.
    pub fn write_request(&self, feature: &str, request: &SyncRequest) -> Result<PathBuf> {
        check_feature(feature)?;
        let path = self.path_for(feature, request.kind().ext());
        let mut data = request.to_json()?;
        data.push('\n');
        atomic_write(&path, data.as_bytes())?;
        tracing::debug!(feature, kind = %request.kind(), path = %path.display(), "wrote request");
        Ok(path)
    }

    /// Read the pending request of this kind, if present and well-formed.
    pub fn read_request(&self, feature: &str, kind: RequestKind) -> Option<SyncRequest> {
        check_feature(feature).ok()?;
        let data = read_lenient(&self.path_for(feature, kind.ext()))?;
        SyncRequest::from_json(kind, &data).ok()
    }

    // -- internals ----------------------------------------------------------

    fn entries(&self, kind: MappingKind, feature: &str) -> Vec<(String, String)> {
        if check_feature(feature).is_err() {
            return Vec::new();
        }
        read_lenient(&self.path_for(feature, kind.ext()))
            .map(|content| record::parse(&content, kind.delimiter()))
            .unwrap_or_default()
    }

    fn lookup(&self, kind: MappingKind, feature: &str, key: &str) -> Option<String> {
        self.entries(kind, feature)
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    fn upsert(&self, kind: MappingKind, feature: &str, key: &str, value: &str) -> Result<()> {
        check_feature(feature)?;
        if key.is_empty() {
            return Err(ArchonError::InvalidKey("empty key".to_string()));
        }
        let mut entries = self.entries(kind, feature);
        record::upsert(&mut entries, key, value);
        let content = record::render(&entries, kind.delimiter());
        atomic_write(&self.path_for(feature, kind.ext()), content.as_bytes())?;
        tracing::debug!(feature, key, ext = kind.ext(), "saved mapping");
        Ok(())
    }
}

/// Feature names become file names, so they must be a single path component.
/// A `.daemon` suffix is refused because `<name>.daemon.pid` is the daemon
/// PID file of feature `<name>`.
fn check_feature(feature: &str) -> Result<()> {
    if feature.is_empty()
        || feature == "."
        || feature == ".."
        || feature.ends_with(".daemon")
        || feature.contains(['/', '\\', '\n', '\r', '\0'])
    {
        return Err(ArchonError::InvalidKey(format!("feature name {feature:?}")));
    }
    Ok(())
}

/// Project ids are stored as the whole file, so they must read back exactly.
fn check_value(value: &str) -> Result<()> {
    if value.is_empty() || value.trim() != value || value.contains(['\n', '\r']) {
        return Err(ArchonError::InvalidKey(format!("value {value:?}")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
