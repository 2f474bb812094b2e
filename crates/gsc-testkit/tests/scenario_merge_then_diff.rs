//! Consolidating a duplicate and re-running the diff.
//!
//! GREEN when:
//! - after folding the IH-linked duplicate into the manual entity, the IH
//!   record matches the surviving entity only
//! - the deleted duplicate is never matched
//! - staff repointed by the merge stay matched by IRN
//! - a merge newer than the IH edit turns the update into OUTDATED_SOURCE
//! - once the IH-linked institution is converted to a collection, the IH
//!   record matches that collection

use chrono::{DateTime, Utc};
use gsc_merge::{CollectionParent, Registry};
use gsc_reconcile::{ConflictReason, DiffEngine, DiffResult, EntityConverter};
use gsc_schemas::{EntityKind, ExternalInstitutionRecord, ExternalStaffRecord, RegistryEntity};
use gsc_testkit::{
    ih_institution, ih_staff, init_test_logging, registry_snapshot, shipped_converter,
    shipped_settings, synced_institution, utc_ymd,
};
use uuid::Uuid;

struct World {
    converter: EntityConverter,
    registry: Registry,
    rec: ExternalInstitutionRecord,
    staff: ExternalStaffRecord,
    linked: Uuid,
    manual: Uuid,
    person: Uuid,
}

fn world() -> World {
    init_test_logging();
    let converter = shipped_converter().unwrap();
    let rec = ih_institution("2001", "HERB", "Herbarium X", "2023-02-01");
    let staff = ih_staff("7001", "Lia", "Mora", "2023-02-01");

    let mut registry = Registry::new();
    let linked = registry.insert_entity(synced_institution(&converter, &rec, utc_ymd(2021, 1, 1)));

    let mut manual = RegistryEntity::institution();
    manual.code = Some("HERBX".to_string());
    manual.name = Some("Herbarium X".to_string());
    manual.created_by = Some("curator".to_string());
    let manual = registry.insert_entity(manual);

    let mut person = converter.to_person(&staff, None);
    person.primary_institution_key = Some(linked);
    person.modified = Some(utc_ymd(2021, 1, 1));
    let person = registry.insert_person(person);

    World {
        converter,
        registry,
        rec,
        staff,
        linked,
        manual,
        person,
    }
}

fn diff(w: &World) -> DiffResult {
    let settings = shipped_settings().unwrap();
    let staff = |code: &str| {
        if code == "HERB" {
            vec![w.staff.clone()]
        } else {
            Vec::new()
        }
    };
    DiffEngine::new(&w.converter, settings.staff_missing_date())
        .find(
            std::slice::from_ref(&w.rec),
            &staff,
            &registry_snapshot(&w.registry),
        )
        .unwrap()
}

fn merge(w: &mut World, at: DateTime<Utc>) {
    w.registry
        .merge_at(EntityKind::Institution, w.linked, w.manual, "curator", at)
        .unwrap();
}

#[test]
fn before_merge_linked_entity_is_in_sync() {
    let w = world();
    let r = diff(&w);
    assert_eq!(r.institutions.no_change.len(), 1);
    assert_eq!(r.institutions.no_change[0].key, Some(w.linked));
    assert_eq!(r.staff.persons_no_change.len(), 1);
}

#[test]
fn after_merge_ih_record_targets_the_survivor() {
    let mut w = world();
    merge(&mut w, utc_ymd(2022, 1, 1));

    let r = diff(&w);
    assert!(r.all_conflicts().is_empty());
    assert_eq!(r.institutions.to_update.len(), 1);
    let update = &r.institutions.to_update[0];
    assert_eq!(update.old.key, Some(w.manual));
    assert_eq!(update.new.code.as_deref(), Some("HERB"));
    assert!(update.new.index_herbariorum_record);
    // merge bookkeeping survives the sync
    assert!(update
        .new
        .alternative_codes
        .iter()
        .any(|c| c.code == "HERB"));
    assert_eq!(update.new.created_by.as_deref(), Some("curator"));
    assert!(r.institutions.to_create.is_empty());

    assert_eq!(r.staff.persons_no_change.len(), 1);
    let p = &r.staff.persons_no_change[0];
    assert_eq!(p.key, Some(w.person));
    assert_eq!(p.primary_institution_key, Some(w.manual));
}

#[test]
fn merge_newer_than_ih_edit_is_outdated_source() {
    let mut w = world();
    merge(&mut w, Utc::now());

    let r = diff(&w);
    assert!(r.institutions.to_update.is_empty());
    assert_eq!(r.institutions.conflicts.len(), 1);
    let c = &r.institutions.conflicts[0];
    assert_eq!(c.reason, ConflictReason::OutdatedSource);
    assert_eq!(c.matched_keys().collect::<Vec<_>>(), vec![w.manual]);
}

#[test]
fn after_conversion_ih_record_targets_the_collection() {
    let mut w = world();
    let report = w
        .registry
        .convert_to_collection_at(
            w.linked,
            CollectionParent::Existing(w.manual),
            "curator",
            utc_ymd(2022, 1, 1),
        )
        .unwrap();

    let r = diff(&w);
    assert!(r.conflicts().is_empty());
    assert!(r.institutions.is_empty());
    let matched: Vec<_> = r
        .collections
        .to_update
        .iter()
        .map(|u| u.old.key)
        .chain(r.collections.no_change.iter().map(|e| e.key))
        .collect();
    assert_eq!(matched, vec![Some(report.collection)]);
    for update in &r.collections.to_update {
        assert_eq!(update.new.institution_key, Some(w.manual));
    }
}
