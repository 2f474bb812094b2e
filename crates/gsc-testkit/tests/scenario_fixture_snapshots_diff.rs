//! Shipped config + snapshot fixtures through the diff engine.
//!
//! GREEN when:
//! - the stale UARK entity is an update whose new address resolves "U.S.A."
//!   through the shipped country table
//! - the unknown IH institution is a create with a resolved country
//! - the identical entity is no-change
//! - the staff member with a newer IH edit is an update
//! - the IH-linked person absent from IH staff is reported for deletion

use gsc_reconcile::{irn, DiffEngine};
use gsc_schemas::Country;
use gsc_testkit::{
    init_test_logging, load_external_snapshot_json, load_registry_snapshot_json,
    shipped_converter, shipped_settings,
};

#[test]
fn fixture_run_partitions_as_expected() {
    init_test_logging();
    let settings = shipped_settings().unwrap();
    let converter = shipped_converter().unwrap();
    let external = load_external_snapshot_json("ih_snapshot.json").unwrap();
    let registry = load_registry_snapshot_json("registry_snapshot.json").unwrap();

    let engine = DiffEngine::new(&converter, settings.staff_missing_date());
    let result = engine
        .find(&external.institutions, &external, &registry)
        .unwrap();

    let s = result.summary();
    assert_eq!(s.institutions.to_create, 1);
    assert_eq!(s.institutions.to_update, 1);
    assert_eq!(s.institutions.no_change, 1);
    assert_eq!(s.institutions.conflicts, 0);
    assert_eq!(s.collections.to_create + s.collections.conflicts, 0);
    assert_eq!(s.staff.to_update, 1);
    assert_eq!(s.staff.to_delete, 1);
    assert_eq!(s.staff.to_create, 0);
    assert!(result.all_conflicts().is_empty());

    let us = Country::from_code("US").unwrap();
    let update = &result.institutions.to_update[0];
    assert_eq!(update.old.key, update.new.key);
    assert_eq!(update.new.name.as_deref(), Some("University of Arkansas"));
    assert_eq!(
        update.new.address.as_ref().and_then(|a| a.country),
        Some(us)
    );
    assert_eq!(
        update.new.homepage.as_deref(),
        Some("http://www.uark.edu/herbarium")
    );

    let created = &result.institutions.to_create[0];
    assert_eq!(created.code.as_deref(), Some("NEWH"));
    assert_eq!(
        created.address.as_ref().and_then(|a| a.country),
        Some(Country::from_code("DE").unwrap())
    );
    assert_eq!(created.created_by.as_deref(), Some(settings.creation_user()));
    assert_eq!(irn::ih_irns(&created.identifiers), vec!["1002".to_string()]);

    let staff = &result.staff.persons_to_update[0];
    assert_eq!(staff.new.email.as_deref(), Some("ana@uark.edu"));
    assert_eq!(staff.new.primary_institution_key, update.old.key);
    assert_eq!(
        result.staff.persons_to_delete[0].first_name.as_deref(),
        Some("Gone")
    );
}

#[test]
fn fixture_run_is_identical_on_threads() {
    init_test_logging();
    let settings = shipped_settings().unwrap();
    let converter = shipped_converter().unwrap();
    let external = load_external_snapshot_json("ih_snapshot.json").unwrap();
    let registry = load_registry_snapshot_json("registry_snapshot.json").unwrap();

    let engine = DiffEngine::new(&converter, settings.staff_missing_date());
    let seq = engine
        .find(&external.institutions, &external, &registry)
        .unwrap();
    let par = engine
        .find_concurrent(&external.institutions, &external, &registry)
        .unwrap();
    assert_eq!(seq, par);
}
