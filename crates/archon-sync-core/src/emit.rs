//! Request emitters: turn a feature directory into one pending request file.
//!
//! Each emitter returns `Ok(Some(path))` when it wrote a request and
//! `Ok(None)` when there was nothing to do (unresolvable feature name,
//! missing feature directory, missing input document). Only state-store
//! I/O failures surface as `Err`. Nothing here writes to stdout.

use crate::config::ArchonConfig;
use crate::document;
use crate::error::Result;
use crate::paths;
use crate::request::{
    ConflictStrategy, DocumentEntry, DocumentSyncRequest, InitRequest, RequestStatus,
    StatusPullRequest, SyncMode, SyncRequest, TaskEntry, TaskSyncRequest,
};
use crate::store::{current_timestamp, StateStore};
use crate::task;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static H1_RE: OnceLock<Regex> = OnceLock::new();

fn h1_re() -> &'static Regex {
    H1_RE.get_or_init(|| Regex::new(r"^#\s+(.+?)\s*#*\s*$").unwrap())
}

const TITLE_PREFIX: &str = "Feature Specification:";

/// Resolve `feature_dir` to an absolute directory and its feature name, or
/// `None` if the emitter should do nothing.
fn target(feature_dir: &Path) -> Option<(String, PathBuf)> {
    let Ok(dir) = paths::absolute_dir(feature_dir) else {
        tracing::debug!(dir = %feature_dir.display(), "unresolvable feature directory; skipping");
        return None;
    };
    let feature = paths::feature_name_of(&dir);
    if feature.is_empty() {
        tracing::debug!(dir = %dir.display(), "no feature name; skipping");
        return None;
    }
    if !dir.is_dir() {
        tracing::debug!(dir = %dir.display(), "feature directory missing; skipping");
        return None;
    }
    Some((feature, dir))
}

fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// First level-one heading of a markdown document.
pub fn extract_title(markdown: &str) -> Option<String> {
    let mut in_fence = false;
    for line in markdown.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some(caps) = h1_re().captures(line) {
            let title = caps[1].trim();
            let title = title.strip_prefix(TITLE_PREFIX).unwrap_or(title).trim();
            if !title.is_empty() {
                return Some(title.to_string());
            }
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Init
// ---------------------------------------------------------------------------

pub fn init(store: &StateStore, feature_dir: &Path) -> Result<Option<PathBuf>> {
    let Some((feature, feature_dir)) = target(feature_dir) else {
        return Ok(None);
    };
    if let Some(project_id) = store.get_project_mapping(&feature) {
        tracing::debug!(feature, project_id, "project already mapped; skipping init");
        return Ok(None);
    }
    let spec = paths::spec_path(&feature_dir);
    let Ok(content) = std::fs::read_to_string(&spec) else {
        tracing::debug!(feature, "no spec.md; skipping init");
        return Ok(None);
    };

    let project_title = extract_title(&content).unwrap_or_else(|| feature.clone());
    let request = SyncRequest::Init(InitRequest {
        feature_name: feature.clone(),
        project_title,
        spec_file: display(&spec),
        status: RequestStatus::Pending,
        requested_at: current_timestamp(),
    });
    store.write_request(&feature, &request).map(Some)
}

// ---------------------------------------------------------------------------
// Document sync
// ---------------------------------------------------------------------------

pub fn sync_documents(
    store: &StateStore,
    config: &ArchonConfig,
    feature_dir: &Path,
    mode: SyncMode,
) -> Result<Option<PathBuf>> {
    let Some((feature, feature_dir)) = target(feature_dir) else {
        return Ok(None);
    };
    let docs = document::discover(&feature_dir, &config.extra_documents);
    if docs.is_empty() {
        tracing::debug!(feature, "no documents; skipping document sync");
        return Ok(None);
    }

    let documents = docs
        .into_iter()
        .map(|doc| {
            let last_synced = store.get_sync_metadata(&feature, &doc.filename);
            let changed = is_changed(&doc.path, last_synced.as_deref());
            DocumentEntry {
                doc_id: store.get_document_mapping(&feature, &doc.filename),
                doc_type: doc.doc_type,
                path: display(&doc.path),
                last_synced,
                changed,
            }
        })
        .collect();

    let request = SyncRequest::DocumentSync(DocumentSyncRequest {
        feature_name: feature.clone(),
        sync_mode: mode,
        documents,
        requested_at: current_timestamp(),
    });
    store.write_request(&feature, &request).map(Some)
}

/// True when the file was never synced, the timestamp is unreadable, or the
/// file was modified after the recorded sync.
fn is_changed(path: &Path, last_synced: Option<&str>) -> bool {
    let Some(ts) = last_synced else {
        return true;
    };
    let Ok(synced) = DateTime::parse_from_rfc3339(ts) else {
        return true;
    };
    let Ok(modified) = std::fs::metadata(path).and_then(|m| m.modified()) else {
        return true;
    };
    DateTime::<Utc>::from(modified).timestamp() > synced.timestamp()
}

// ---------------------------------------------------------------------------
// Task sync
// ---------------------------------------------------------------------------

pub fn sync_tasks(store: &StateStore, feature_dir: &Path) -> Result<Option<PathBuf>> {
    let Some((feature, feature_dir)) = target(feature_dir) else {
        return Ok(None);
    };
    let Ok(content) = std::fs::read_to_string(paths::tasks_path(&feature_dir)) else {
        tracing::debug!(feature, "no tasks.md; skipping task sync");
        return Ok(None);
    };

    let tasks = task::parse_tasks(&content)
        .into_iter()
        .map(|t| TaskEntry {
            remote_id: store.get_task_mapping(&feature, &t.id),
            task_id: t.id,
            parallel: t.parallel,
            status: t.state,
            story: t.story,
            description: t.description,
        })
        .collect();

    let request = SyncRequest::TaskSync(TaskSyncRequest {
        feature_name: feature.clone(),
        tasks,
        requested_at: current_timestamp(),
    });
    store.write_request(&feature, &request).map(Some)
}

// ---------------------------------------------------------------------------
// Status pull
// ---------------------------------------------------------------------------

pub fn pull_status(store: &StateStore, feature_dir: &Path) -> Result<Option<PathBuf>> {
    let Some((feature, feature_dir)) = target(feature_dir) else {
        return Ok(None);
    };
    let tasks_file = paths::tasks_path(&feature_dir);
    if !tasks_file.is_file() {
        tracing::debug!(feature, "no tasks.md; skipping status pull");
        return Ok(None);
    }

    let request = SyncRequest::StatusPull(StatusPullRequest {
        feature_name: feature.clone(),
        conflict_strategy: ConflictStrategy::ArchonWins,
        tasks_file: display(&tasks_file),
        requested_at: current_timestamp(),
    });
    store.write_request(&feature, &request).map(Some)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{RequestKind, TaskState};
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        store: StateStore,
        feature_dir: PathBuf,
    }

    fn fixture() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let feature_dir = tmp.path().join("specs/001-test-feature");
        std::fs::create_dir_all(&feature_dir).unwrap();
        let store = StateStore::new(tmp.path().join("state"));
        Fixture {
            _tmp: tmp,
            store,
            feature_dir,
        }
    }

    fn write(f: &Fixture, name: &str, body: &str) {
        std::fs::write(f.feature_dir.join(name), body).unwrap();
    }

    #[test]
    fn title_extraction() {
        assert_eq!(extract_title("# Test Feature\n\nbody").as_deref(), Some("Test Feature"));
        assert_eq!(
            extract_title("intro\n# Feature Specification: Photo Albums\n").as_deref(),
            Some("Photo Albums")
        );
        assert_eq!(extract_title("## Only H2\n#hashtag").as_deref(), None);
        assert_eq!(
            extract_title("```\n# not a title\n```\n# Real\n").as_deref(),
            Some("Real")
        );
        assert_eq!(extract_title("# Closed heading ##").as_deref(), Some("Closed heading"));
    }

    #[test]
    fn init_writes_pending_request() {
        let f = fixture();
        write(&f, "spec.md", "# Test Feature\n\nSome text\n");
        let path = init(&f.store, &f.feature_dir).unwrap().unwrap();
        assert!(path.ends_with("001-test-feature.init-request"));

        let Some(SyncRequest::Init(req)) =
            f.store.read_request("001-test-feature", RequestKind::Init)
        else {
            panic!("expected init request");
        };
        assert_eq!(req.project_title, "Test Feature");
        assert_eq!(req.status, RequestStatus::Pending);
        assert_eq!(req.feature_name, "001-test-feature");
        assert!(req.spec_file.ends_with("spec.md"));
    }

    #[test]
    fn dotted_feature_dir_resolves_to_real_name() {
        let f = fixture();
        write(&f, "spec.md", "# Test Feature\n");
        let dotted = f.feature_dir.join("contracts/..").join(".");
        std::fs::create_dir_all(f.feature_dir.join("contracts")).unwrap();

        let path = init(&f.store, &dotted).unwrap().unwrap();
        assert!(path.ends_with("001-test-feature.init-request"));
        let Some(SyncRequest::Init(req)) =
            f.store.read_request("001-test-feature", RequestKind::Init)
        else {
            panic!("expected init request");
        };
        let spec = Path::new(&req.spec_file);
        assert!(spec.is_absolute());
        assert_eq!(spec, f.feature_dir.canonicalize().unwrap().join("spec.md"));
    }

    #[test]
    fn init_without_spec_is_noop() {
        let f = fixture();
        assert_eq!(init(&f.store, &f.feature_dir).unwrap(), None);
        assert!(!f.store.dir().exists());
    }

    #[test]
    fn init_falls_back_to_feature_name() {
        let f = fixture();
        write(&f, "spec.md", "no heading here\n");
        init(&f.store, &f.feature_dir).unwrap().unwrap();
        let Some(SyncRequest::Init(req)) =
            f.store.read_request("001-test-feature", RequestKind::Init)
        else {
            panic!("expected init request");
        };
        assert_eq!(req.project_title, "001-test-feature");
    }

    #[test]
    fn init_skips_when_project_mapped() {
        let f = fixture();
        write(&f, "spec.md", "# Test Feature\n");
        f.store.save_project_mapping("001-test-feature", "proj-1").unwrap();
        assert_eq!(init(&f.store, &f.feature_dir).unwrap(), None);
    }

    #[test]
    fn missing_feature_dir_is_noop_everywhere() {
        let f = fixture();
        let gone = f.feature_dir.join("../002-missing");
        let cfg = ArchonConfig::default();
        assert_eq!(init(&f.store, &gone).unwrap(), None);
        assert_eq!(sync_documents(&f.store, &cfg, &gone, SyncMode::Pull).unwrap(), None);
        assert_eq!(sync_tasks(&f.store, &gone).unwrap(), None);
        assert_eq!(pull_status(&f.store, &gone).unwrap(), None);
        assert_eq!(init(&f.store, Path::new("")).unwrap(), None);
    }

    #[test]
    fn document_sync_lists_existing_documents() {
        let f = fixture();
        write(&f, "spec.md", "# S\n");
        write(&f, "plan.md", "# P\n");
        f.store.save_document_mapping("001-test-feature", "spec.md", "doc-9").unwrap();

        sync_documents(&f.store, &ArchonConfig::default(), &f.feature_dir, SyncMode::Push)
            .unwrap()
            .unwrap();
        let Some(SyncRequest::DocumentSync(req)) =
            f.store.read_request("001-test-feature", RequestKind::DocumentSync)
        else {
            panic!("expected sync request");
        };
        assert_eq!(req.sync_mode, SyncMode::Push);
        let types: Vec<&str> = req.documents.iter().map(|d| d.doc_type.as_str()).collect();
        assert_eq!(types, vec!["spec", "plan"]);
        assert_eq!(req.documents[0].doc_id.as_deref(), Some("doc-9"));
        assert_eq!(req.documents[1].doc_id, None);
        assert!(req.documents.iter().all(|d| d.changed));
    }

    #[test]
    fn document_sync_respects_sync_metadata() {
        let f = fixture();
        write(&f, "spec.md", "# S\n");
        f.store
            .save_sync_metadata("001-test-feature", "spec.md", "2999-01-01T00:00:00Z")
            .unwrap();
        write(&f, "plan.md", "# P\n");
        f.store
            .save_sync_metadata("001-test-feature", "plan.md", "2000-01-01T00:00:00Z")
            .unwrap();

        sync_documents(&f.store, &ArchonConfig::default(), &f.feature_dir, SyncMode::Pull)
            .unwrap();
        let Some(SyncRequest::DocumentSync(req)) =
            f.store.read_request("001-test-feature", RequestKind::DocumentSync)
        else {
            panic!("expected sync request");
        };
        assert!(!req.documents[0].changed);
        assert_eq!(req.documents[0].last_synced.as_deref(), Some("2999-01-01T00:00:00Z"));
        assert!(req.documents[1].changed);
    }

    #[test]
    fn document_sync_without_documents_is_noop() {
        let f = fixture();
        let out =
            sync_documents(&f.store, &ArchonConfig::default(), &f.feature_dir, SyncMode::Pull)
                .unwrap();
        assert_eq!(out, None);
    }

    #[test]
    fn task_sync_parses_markers() {
        let f = fixture();
        write(
            &f,
            "tasks.md",
            "- [ ] [T001] Setup\n- [ ] [T002] [P] Lint\n- [X] [T003] [US1] Login\n",
        );
        f.store.save_task_mapping("001-test-feature", "T001", "remote-1").unwrap();

        sync_tasks(&f.store, &f.feature_dir).unwrap().unwrap();
        let Some(SyncRequest::TaskSync(req)) =
            f.store.read_request("001-test-feature", RequestKind::TaskSync)
        else {
            panic!("expected task sync request");
        };
        let ids: Vec<&str> = req.tasks.iter().map(|t| t.task_id.as_str()).collect();
        assert_eq!(ids, vec!["T001", "T002", "T003"]);
        assert!(req.tasks[1].parallel);
        assert_eq!(req.tasks[2].status, TaskState::Done);
        assert_eq!(req.tasks[2].story.as_deref(), Some("US1"));
        assert_eq!(req.tasks[0].remote_id.as_deref(), Some("remote-1"));
    }

    #[test]
    fn task_sync_without_tasks_file_is_noop() {
        let f = fixture();
        assert_eq!(sync_tasks(&f.store, &f.feature_dir).unwrap(), None);
        assert_eq!(pull_status(&f.store, &f.feature_dir).unwrap(), None);
    }

    #[test]
    fn status_pull_targets_tasks_file() {
        let f = fixture();
        write(&f, "tasks.md", "- [ ] T001 x\n");
        pull_status(&f.store, &f.feature_dir).unwrap().unwrap();
        let raw = std::fs::read_to_string(
            f.store.path_for("001-test-feature", RequestKind::StatusPull.ext()),
        )
        .unwrap();
        let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(v["conflict_strategy"], "archon_wins");
        assert!(v["tasks_file"].as_str().unwrap().ends_with("tasks.md"));
    }

    #[test]
    fn unwritable_state_dir_is_an_error() {
        let f = fixture();
        write(&f, "tasks.md", "- [ ] T001 x\n");
        std::fs::write(f.store.dir(), b"file in the way").unwrap();
        assert!(pull_status(&f.store, &f.feature_dir).is_err());
    }
}
