use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Recorded as `createdBy`/`modifiedBy` when nothing else is configured.
pub const DEFAULT_CREATION_USER: &str = "ih-sync";

/// What to do with a staff pair whose fields already match but whose external
/// record carries no usable `dateModified`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffMissingDatePolicy {
    /// Freshness cannot be proven, report for review.
    #[default]
    Conflict,
    NoChange,
}

/// Typed view of the sync configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// ISO 3166-1 alpha-2 code -> free-text aliases.
    #[serde(default)]
    pub countries: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub sync: SyncSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSection {
    pub creation_user: String,
    pub staff_missing_date: StaffMissingDatePolicy,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            creation_user: DEFAULT_CREATION_USER.to_string(),
            staff_missing_date: StaffMissingDatePolicy::default(),
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            countries: BTreeMap::new(),
            sync: SyncSection::default(),
        }
    }
}

impl SyncSettings {
    /// Read `/countries` and `/sync` from a merged config tree. Absent keys
    /// take their defaults; keys outside those prefixes are ignored here and
    /// reported by [`crate::report_unused_keys`].
    pub fn from_config_json(config_json: &Value) -> Result<Self> {
        let mut view = serde_json::Map::new();
        for key in ["countries", "sync"] {
            if let Some(v) = config_json.get(key) {
                if !v.is_null() {
                    view.insert(key.to_string(), v.clone());
                }
            }
        }
        let settings: SyncSettings = serde_json::from_value(Value::Object(view))
            .context("CONFIG_INVALID: /countries or /sync has the wrong shape")?;
        if settings.sync.creation_user.trim().is_empty() {
            anyhow::bail!("CONFIG_INVALID: /sync/creation_user must not be empty");
        }
        Ok(settings)
    }

    pub fn creation_user(&self) -> &str {
        &self.sync.creation_user
    }

    pub fn staff_missing_date(&self) -> StaffMissingDatePolicy {
        self.sync.staff_missing_date
    }
}
