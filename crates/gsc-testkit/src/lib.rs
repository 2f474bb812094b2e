//! Shared fixtures for cross-crate scenarios: config loading, snapshot files
//! and small record builders.

use std::fs;
use std::path::PathBuf;
use std::sync::Once;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use gsc_config::{load_layered_yaml, SyncSettings};
use gsc_merge::Registry;
use gsc_reconcile::{EntityConverter, ExternalSnapshot, RegistrySnapshot};
use gsc_schemas::{
    ExternalInstitutionRecord, ExternalStaffRecord, InstitutionAddress, RegistryEntity,
    StaffContact,
};
use uuid::Uuid;

static INIT_LOGGING: Once = Once::new();

/// Route engine logs to the test harness. Filter with `RUST_LOG`; defaults to
/// `info`.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .try_init()
            .ok();
    });
}

fn workspace_path(rel: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..").join(rel)
}

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(name)
}

/// Settings from the shipped `config/sync.yaml`.
pub fn shipped_settings() -> Result<SyncSettings> {
    let path = workspace_path("config/sync.yaml");
    let path = path.to_string_lossy();
    let loaded = load_layered_yaml(&[&*path])?;
    loaded.sync_settings()
}

pub fn shipped_converter() -> Result<EntityConverter> {
    let settings = shipped_settings()?;
    EntityConverter::from_settings(&settings).context("build converter from shipped config")
}

pub fn load_external_snapshot_json(name: &str) -> Result<ExternalSnapshot> {
    let path = fixture_path(name);
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("read external snapshot: {}", path.display()))?;
    ExternalSnapshot::from_json(&raw).context("parse external snapshot json")
}

pub fn load_registry_snapshot_json(name: &str) -> Result<RegistrySnapshot> {
    let path = fixture_path(name);
    let raw = fs::read_to_string(&path)
        .with_context(|| format!("read registry snapshot: {}", path.display()))?;
    RegistrySnapshot::from_json(&raw).context("parse registry snapshot json")
}

/// Copy of the store in the shape the diff engine reads.
pub fn registry_snapshot(registry: &Registry) -> RegistrySnapshot {
    RegistrySnapshot {
        institutions: registry.institutions().cloned().collect(),
        collections: registry.collections().cloned().collect(),
        persons: registry.persons().cloned().collect(),
    }
}

pub fn utc_ymd(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

pub fn ih_institution(
    irn: &str,
    code: &str,
    name: &str,
    modified: &str,
) -> ExternalInstitutionRecord {
    ExternalInstitutionRecord {
        irn: Some(irn.to_string()),
        code: Some(code.to_string()),
        organization_name: Some(name.to_string()),
        date_modified: Some(modified.to_string()),
        ..Default::default()
    }
}

pub fn with_country(
    mut rec: ExternalInstitutionRecord,
    country: &str,
) -> ExternalInstitutionRecord {
    let address = rec.address.get_or_insert_with(InstitutionAddress::default);
    address.physical_country = Some(country.to_string());
    rec
}

pub fn ih_staff(irn: &str, first: &str, last: &str, modified: &str) -> ExternalStaffRecord {
    ExternalStaffRecord {
        irn: Some(irn.to_string()),
        first_name: Some(first.to_string()),
        last_name: Some(last.to_string()),
        contact: Some(StaffContact {
            email: Some(format!("{}@example.org", first.to_lowercase())),
            ..Default::default()
        }),
        date_modified: Some(modified.to_string()),
        ..Default::default()
    }
}

/// Registry institution already synced from `rec`, last edited at `modified`.
pub fn synced_institution(
    converter: &EntityConverter,
    rec: &ExternalInstitutionRecord,
    modified: DateTime<Utc>,
) -> RegistryEntity {
    let mut e = converter.to_institution(rec, None);
    e.key = Some(Uuid::new_v4());
    e.modified = Some(modified);
    e
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_snapshot_copies_every_table() {
        let mut reg = Registry::new();
        reg.insert_entity(RegistryEntity::institution());
        reg.insert_entity(RegistryEntity::collection());
        reg.insert_entity(RegistryEntity::collection());
        let snap = registry_snapshot(&reg);
        assert_eq!(snap.institutions.len(), 1);
        assert_eq!(snap.collections.len(), 2);
        assert!(snap.persons.is_empty());
    }

    #[test]
    fn fixtures_parse() {
        let ext = load_external_snapshot_json("ih_snapshot.json").unwrap();
        assert!(!ext.institutions.is_empty());
        let reg = load_registry_snapshot_json("registry_snapshot.json").unwrap();
        assert!(!reg.institutions.is_empty());
    }
}
