use crate::output::{print_json, print_table};
use anyhow::{bail, Context};
use archon_sync_core::paths;
use archon_sync_core::store::current_timestamp;
use archon_sync_core::StateStore;
use clap::{Subcommand, ValueEnum};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MapKind {
    /// Feature → project ID
    Project,
    /// Document filename → document ID
    Document,
    /// Local task ID → remote task ID
    Task,
    /// Document filename → last sync timestamp
    Meta,
}

#[derive(Subcommand)]
pub enum MapSubcommand {
    /// Record a mapping (project: VALUE; document/task: KEY VALUE; meta: KEY [TIMESTAMP])
    Set {
        kind: MapKind,
        /// Feature name or feature directory
        feature: String,
        #[arg(required = true, num_args = 1..=2)]
        args: Vec<String>,
    },
    /// Print a mapping value; prints nothing if absent
    Get {
        kind: MapKind,
        /// Feature name or feature directory
        feature: String,
        key: Option<String>,
    },
    /// List every mapping recorded for a feature
    List {
        /// Feature name or feature directory
        feature: String,
    },
}

pub fn run(store: &StateStore, subcmd: MapSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        MapSubcommand::Set {
            kind,
            feature,
            args,
        } => set(store, kind, &feature_name(&feature)?, &args),
        MapSubcommand::Get { kind, feature, key } => {
            get(store, kind, &feature_name(&feature)?, key.as_deref(), json)
        }
        MapSubcommand::List { feature } => list(store, &feature_name(&feature)?, json),
    }
}

fn feature_name(arg: &str) -> anyhow::Result<String> {
    let feature = paths::resolve_feature_name(arg);
    if feature.is_empty() {
        bail!("cannot derive a feature name from '{arg}'");
    }
    Ok(feature)
}

fn set(store: &StateStore, kind: MapKind, feature: &str, args: &[String]) -> anyhow::Result<()> {
    let result = match (kind, args) {
        (MapKind::Project, [value]) => store.save_project_mapping(feature, value),
        (MapKind::Document, [key, value]) => store.save_document_mapping(feature, key, value),
        (MapKind::Task, [key, value]) => store.save_task_mapping(feature, key, value),
        (MapKind::Meta, [key]) => store.save_sync_metadata(feature, key, &current_timestamp()),
        (MapKind::Meta, [key, ts]) => store.save_sync_metadata(feature, key, ts),
        (MapKind::Project, _) => bail!("project mappings take exactly one value"),
        _ => bail!("expected KEY VALUE"),
    };
    result.with_context(|| format!("failed to save mapping for '{feature}'"))
}

fn get(
    store: &StateStore,
    kind: MapKind,
    feature: &str,
    key: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let value = match (kind, key) {
        (MapKind::Project, None) => store.get_project_mapping(feature),
        (MapKind::Project, Some(_)) => bail!("project mappings take no key"),
        (_, None) => bail!("a key is required"),
        (MapKind::Document, Some(k)) => store.get_document_mapping(feature, k),
        (MapKind::Task, Some(k)) => store.get_task_mapping(feature, k),
        (MapKind::Meta, Some(k)) => store.get_sync_metadata(feature, k),
    };

    if json {
        print_json(&serde_json::json!({
            "feature": feature,
            "key": key,
            "value": value,
        }))?;
    } else if let Some(v) = value {
        println!("{v}");
    }
    Ok(())
}

fn list(store: &StateStore, feature: &str, json: bool) -> anyhow::Result<()> {
    let project = store.get_project_mapping(feature);
    let documents = store.document_mappings(feature);
    let tasks = store.task_mappings(feature);
    let meta = store.sync_metadata(feature);

    if json {
        let obj = |entries: &[(String, String)]| {
            entries
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect::<serde_json::Map<_, _>>()
        };
        print_json(&serde_json::json!({
            "feature": feature,
            "project": project,
            "documents": obj(&documents),
            "tasks": obj(&tasks),
            "sync_metadata": obj(&meta),
        }))?;
        return Ok(());
    }

    let mut rows = Vec::new();
    if let Some(p) = project {
        rows.push(vec!["project".to_string(), feature.to_string(), p]);
    }
    for (label, entries) in [("document", documents), ("task", tasks), ("meta", meta)] {
        for (k, v) in entries {
            rows.push(vec![label.to_string(), k, v]);
        }
    }
    if rows.is_empty() {
        println!("No mappings for '{feature}'");
        return Ok(());
    }
    print_table(&["KIND", "KEY", "VALUE"], &rows)
}
