use crate::config::ExtraDocument;
use crate::paths::CONTRACTS_DIR;
use std::path::{Path, PathBuf};

/// Well-known feature documents, in the order they are offered for sync.
pub const KNOWN_DOCUMENTS: &[(&str, &str)] = &[
    ("spec", "spec.md"),
    ("plan", "plan.md"),
    ("research", "research.md"),
    ("data-model", "data-model.md"),
    ("quickstart", "quickstart.md"),
    ("tasks", "tasks.md"),
];

pub const CONTRACT_DOC_TYPE: &str = "contract";

/// A document present in a feature directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureDocument {
    pub doc_type: String,
    /// Path relative to the feature directory; the key for document mappings.
    pub filename: String,
    pub path: PathBuf,
}

/// Enumerate the documents that exist on disk under `feature_dir`.
///
/// Known documents come first, then `contracts/*.md` sorted by name, then
/// the configured extras. Missing files are skipped.
pub fn discover(feature_dir: &Path, extras: &[ExtraDocument]) -> Vec<FeatureDocument> {
    let mut docs = Vec::new();

    for (doc_type, file) in KNOWN_DOCUMENTS {
        push_if_file(&mut docs, feature_dir, doc_type, file);
    }

    let mut contracts: Vec<String> = match std::fs::read_dir(feature_dir.join(CONTRACTS_DIR)) {
        Ok(rd) => rd
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("md"))
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    };
    contracts.sort();
    for name in contracts {
        let rel = format!("{CONTRACTS_DIR}/{name}");
        push_if_file(&mut docs, feature_dir, CONTRACT_DOC_TYPE, &rel);
    }

    for extra in extras {
        if docs.iter().any(|d| d.filename == extra.file) {
            continue;
        }
        push_if_file(&mut docs, feature_dir, &extra.doc_type, &extra.file);
    }

    docs
}

fn push_if_file(docs: &mut Vec<FeatureDocument>, feature_dir: &Path, doc_type: &str, rel: &str) {
    let path = feature_dir.join(rel);
    if path.is_file() {
        docs.push(FeatureDocument {
            doc_type: doc_type.to_string(),
            filename: rel.to_string(),
            path,
        });
    }
}
