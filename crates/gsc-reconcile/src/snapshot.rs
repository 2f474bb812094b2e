//! Snapshot inputs: what the fetcher hands the engine.
//!
//! Both sides arrive fully materialized. The JSON readers here cover the
//! shapes the fetcher and the registry export write; they do no IO.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use gsc_schemas::{ExternalInstitutionRecord, ExternalStaffRecord, Person, RegistryEntity};

/// Lookup of IH staff by institution code.
pub trait StaffSource {
    fn staff_of(&self, institution_code: &str) -> Vec<ExternalStaffRecord>;
}

impl<F> StaffSource for F
where
    F: Fn(&str) -> Vec<ExternalStaffRecord>,
{
    fn staff_of(&self, institution_code: &str) -> Vec<ExternalStaffRecord> {
        self(institution_code)
    }
}

impl StaffSource for BTreeMap<String, Vec<ExternalStaffRecord>> {
    fn staff_of(&self, institution_code: &str) -> Vec<ExternalStaffRecord> {
        self.get(institution_code).cloned().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    Json { what: &'static str, message: String },
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json { what, message } => write!(f, "invalid {what} snapshot json: {message}"),
        }
    }
}

impl std::error::Error for SnapshotError {}

/// IH side of a run: institutions plus their staff keyed by institution code.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalSnapshot {
    pub institutions: Vec<ExternalInstitutionRecord>,
    pub staff: BTreeMap<String, Vec<ExternalStaffRecord>>,
}

impl ExternalSnapshot {
    pub fn from_json(raw: &str) -> Result<Self, SnapshotError> {
        serde_json::from_str(raw).map_err(|e| SnapshotError::Json {
            what: "external",
            message: e.to_string(),
        })
    }
}

impl StaffSource for ExternalSnapshot {
    fn staff_of(&self, institution_code: &str) -> Vec<ExternalStaffRecord> {
        self.staff.staff_of(institution_code)
    }
}

/// Registry side of a run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySnapshot {
    pub institutions: Vec<RegistryEntity>,
    pub collections: Vec<RegistryEntity>,
    pub persons: Vec<Person>,
}

impl RegistrySnapshot {
    pub fn from_json(raw: &str) -> Result<Self, SnapshotError> {
        serde_json::from_str(raw).map_err(|e| SnapshotError::Json {
            what: "registry",
            message: e.to_string(),
        })
    }
}
