use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// RequestKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Init,
    DocumentSync,
    TaskSync,
    StatusPull,
}

impl RequestKind {
    /// State-file extension for this request kind.
    pub fn ext(self) -> &'static str {
        match self {
            RequestKind::Init => "init-request",
            RequestKind::DocumentSync => "sync-request",
            RequestKind::TaskSync => "task-sync-request",
            RequestKind::StatusPull => "status-request",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ext())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    #[default]
    Pull,
    Push,
}

impl SyncMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncMode::Pull => "pull",
            SyncMode::Push => "push",
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Done,
}

/// Which side wins when local and remote task status disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStrategy {
    ArchonWins,
}

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitRequest {
    pub feature_name: String,
    pub project_title: String,
    pub spec_file: String,
    pub status: RequestStatus,
    pub requested_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub doc_type: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced: Option<String>,
    /// Never synced, or modified after `last_synced`.
    pub changed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSyncRequest {
    pub feature_name: String,
    pub sync_mode: SyncMode,
    pub documents: Vec<DocumentEntry>,
    pub requested_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEntry {
    pub task_id: String,
    pub parallel: bool,
    pub status: TaskState,
    pub story: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSyncRequest {
    pub feature_name: String,
    pub tasks: Vec<TaskEntry>,
    pub requested_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusPullRequest {
    pub feature_name: String,
    pub conflict_strategy: ConflictStrategy,
    pub tasks_file: String,
    pub requested_at: String,
}

// ---------------------------------------------------------------------------
// SyncRequest
// ---------------------------------------------------------------------------

/// One pending request. Serialized untagged: the file extension carries the kind.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncRequest {
    Init(InitRequest),
    DocumentSync(DocumentSyncRequest),
    TaskSync(TaskSyncRequest),
    StatusPull(StatusPullRequest),
}

impl SyncRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            SyncRequest::Init(_) => RequestKind::Init,
            SyncRequest::DocumentSync(_) => RequestKind::DocumentSync,
            SyncRequest::TaskSync(_) => RequestKind::TaskSync,
            SyncRequest::StatusPull(_) => RequestKind::StatusPull,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        match self {
            SyncRequest::Init(r) => serde_json::to_string_pretty(r),
            SyncRequest::DocumentSync(r) => serde_json::to_string_pretty(r),
            SyncRequest::TaskSync(r) => serde_json::to_string_pretty(r),
            SyncRequest::StatusPull(r) => serde_json::to_string_pretty(r),
        }
    }

    pub fn from_json(kind: RequestKind, data: &str) -> serde_json::Result<Self> {
        Ok(match kind {
            RequestKind::Init => SyncRequest::Init(serde_json::from_str(data)?),
            RequestKind::DocumentSync => SyncRequest::DocumentSync(serde_json::from_str(data)?),
            RequestKind::TaskSync => SyncRequest::TaskSync(serde_json::from_str(data)?),
            RequestKind::StatusPull => SyncRequest::StatusPull(serde_json::from_str(data)?),
        })
    }
}
