use crate::error::Result;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Smallest interval the daemon accepts.
pub const MIN_DAEMON_INTERVAL_SECS: u64 = 60;

// ---------------------------------------------------------------------------
// DaemonConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
}

fn default_interval() -> u64 {
    300
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
        }
    }
}

// ---------------------------------------------------------------------------
// ExtraDocument
// ---------------------------------------------------------------------------

/// A project-specific document to include in document sync requests,
/// relative to the feature directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraDocument {
    pub doc_type: String,
    pub file: String,
}

// ---------------------------------------------------------------------------
// ArchonConfig
// ---------------------------------------------------------------------------

/// Optional `config.yaml` in the state directory. Every field has a default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchonConfig {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub extra_documents: Vec<ExtraDocument>,
}

impl ArchonConfig {
    /// Load `config.yaml` from the state directory. A missing file yields defaults.
    pub fn load(state_dir: &Path) -> Result<Self> {
        let path = paths::config_path(state_dir);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(&data)?)
    }

    /// Like [`ArchonConfig::load`], but an unreadable or invalid file is logged
    /// and replaced by defaults. The emitters must not fail on bad config.
    pub fn load_or_default(state_dir: &Path) -> Self {
        match Self::load(state_dir) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring invalid config.yaml");
                Self::default()
            }
        }
    }
}
