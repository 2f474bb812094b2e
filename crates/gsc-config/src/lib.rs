//! gsc-config
//!
//! Layered YAML configuration for the registry sync. Layers are deep-merged
//! in order, later layers winning. The merged tree is serialized to
//! canonical JSON and fingerprinted with SHA-256 so a report can name the
//! exact configuration it was produced under. [`report_unused_keys`] lints
//! leaves nothing reads; [`SyncSettings`] is the typed view the engine uses.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

mod settings;

pub use settings::{StaffMissingDatePolicy, SyncSettings, DEFAULT_CREATION_USER};

/// Subtrees read by [`SyncSettings::from_config_json`]. Every leaf below one
/// of these counts as consumed.
pub const CONSUMED_POINTERS: &[&str] = &["/countries", "/sync"];

/// How many unused pointers an error message quotes.
const UNUSED_PREVIEW: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnusedKeyReport {
    /// Normalized, sorted.
    pub consumed_prefixes: Vec<String>,
    /// JSON pointers of leaves outside every consumed subtree, sorted.
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// List config leaves that no consumer reads.
///
/// Under [`UnusedKeyPolicy::Fail`] a non-empty list is an error.
pub fn report_unused_keys(config_json: &Value, policy: UnusedKeyPolicy) -> Result<UnusedKeyReport> {
    let mut consumed: Vec<Vec<String>> = CONSUMED_POINTERS.iter().map(|p| tokens(p)).collect();
    consumed.sort();
    consumed.dedup();

    let mut unused = Vec::new();
    visit_leaves(config_json, &mut Vec::new(), &mut |path| {
        if !consumed.iter().any(|prefix| path.starts_with(prefix)) {
            unused.push(render(path));
        }
    });
    unused.sort();
    unused.dedup();

    let report = UnusedKeyReport {
        consumed_prefixes: consumed.iter().map(|t| render(t)).collect(),
        unused_leaf_pointers: unused,
    };

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        let shown: Vec<&str> = report
            .unused_leaf_pointers
            .iter()
            .take(UNUSED_PREVIEW)
            .map(String::as_str)
            .collect();
        bail!(
            "CONFIG_UNUSED_KEYS: {} config key(s) are read by nothing; remove them or \
             consume them: {}",
            report.unused_leaf_pointers.len(),
            shown.join(", ")
        );
    }

    Ok(report)
}

/// Split a JSON pointer into unescaped reference tokens. `""` and `"/"`
/// both mean the whole document.
fn tokens(pointer: &str) -> Vec<String> {
    pointer
        .trim()
        .split('/')
        .filter(|t| !t.is_empty())
        .map(|t| t.replace("~1", "/").replace("~0", "~"))
        .collect()
}

fn render(path: &[String]) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    path.iter()
        .map(|t| format!("/{}", t.replace('~', "~0").replace('/', "~1")))
        .collect()
}

/// Call `f` with the token path of every scalar (and empty container) leaf.
fn visit_leaves(v: &Value, path: &mut Vec<String>, f: &mut impl FnMut(&[String])) {
    match v {
        Value::Object(map) if !map.is_empty() => {
            for (k, child) in map {
                path.push(k.clone());
                visit_leaves(child, path, f);
                path.pop();
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (i, child) in items.iter().enumerate() {
                path.push(i.to_string());
                visit_leaves(child, path, f);
                path.pop();
            }
        }
        _ => f(path),
    }
}

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Hex SHA-256 of `canonical_json`.
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    pub fn sync_settings(&self) -> Result<SyncSettings> {
        SyncSettings::from_config_json(&self.config_json)
    }
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let docs = paths
        .iter()
        .map(|p| {
            fs::read_to_string(Path::new(p)).with_context(|| format!("read config layer {p}"))
        })
        .collect::<Result<Vec<_>>>()?;
    let docs: Vec<&str> = docs.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&docs)
}

pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Map::new());
    for (layer, raw) in yaml_docs.iter().enumerate() {
        let parsed: serde_yaml::Value =
            serde_yaml::from_str(raw).with_context(|| format!("config layer {layer}: bad yaml"))?;
        if parsed.is_null() {
            continue;
        }
        let overlay = serde_json::to_value(parsed)
            .with_context(|| format!("config layer {layer}: not representable as json"))?;
        if !overlay.is_object() {
            bail!("config layer {layer}: top level must be a mapping");
        }
        merge_into(&mut merged, overlay);
    }

    // serde_json maps are key-ordered, so compact output is canonical.
    let canonical_json = serde_json::to_string(&merged).context("serialize merged config")?;
    let config_hash = hex::encode(Sha256::digest(canonical_json.as_bytes()));
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

/// Mappings merge key by key; anything else in `overlay` replaces `base`.
fn merge_into(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (k, v) in overlay_map {
                match base_map.get_mut(&k) {
                    Some(existing) => merge_into(existing, v),
                    None => {
                        base_map.insert(k, v);
                    }
                }
            }
        }
        (slot, v) => *slot = v,
    }
}
