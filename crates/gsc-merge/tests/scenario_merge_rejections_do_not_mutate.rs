use gsc_merge::{MergeError, Registry};
use gsc_schemas::{EntityKind, Identifier, IdentifierType, Person, RegistryEntity};
use uuid::Uuid;

fn seeded() -> (Registry, Uuid, Uuid) {
    let mut reg = Registry::new();
    let mut a = RegistryEntity::institution();
    a.code = Some("A".to_string());
    a.identifiers
        .push(Identifier::new(IdentifierType::Doi, "10.1/a"));
    let mut b = RegistryEntity::institution();
    b.code = Some("B".to_string());
    let ka = reg.insert_entity(a);
    let kb = reg.insert_entity(b);
    reg.insert_person(Person {
        primary_institution_key: Some(ka),
        ..Person::default()
    });
    (reg, ka, kb)
}

fn assert_untouched(before: &Registry, after: &Registry) {
    let b: Vec<_> = before.institutions().cloned().collect();
    let a: Vec<_> = after.institutions().cloned().collect();
    assert_eq!(a, b);
    let b: Vec<_> = before.persons().cloned().collect();
    let a: Vec<_> = after.persons().cloned().collect();
    assert_eq!(a, b);
}

#[test]
fn merge_into_itself_fails() {
    let (mut reg, ka, _) = seeded();
    let before = reg.clone();
    let err = reg.merge_institutions(ka, ka, "user").unwrap_err();
    assert_eq!(err, MergeError::SameEntity(ka));
    assert_untouched(&before, &reg);
}

#[test]
fn merge_with_unknown_key_fails() {
    let (mut reg, ka, _) = seeded();
    let before = reg.clone();
    let unknown = Uuid::new_v4();
    let err = reg.merge_institutions(ka, unknown, "user").unwrap_err();
    assert_eq!(
        err,
        MergeError::NotFound {
            kind: EntityKind::Institution,
            key: unknown
        }
    );
    assert_untouched(&before, &reg);
}

#[test]
fn merge_without_performer_fails() {
    let (mut reg, ka, kb) = seeded();
    let before = reg.clone();
    assert_eq!(
        reg.merge_institutions(ka, kb, "").unwrap_err(),
        MergeError::MissingPerformer
    );
    assert_eq!(
        reg.merge_institutions(ka, kb, "   ").unwrap_err(),
        MergeError::MissingPerformer
    );
    assert_untouched(&before, &reg);
}

#[test]
fn merge_of_two_ih_linked_entities_fails() {
    let (mut reg, ka, kb) = seeded();
    for (key, irn) in [(ka, "gbif:ih:irn:1"), (kb, "gbif:ih:irn:2")] {
        let mut e = reg.institution(key).cloned().unwrap();
        e.identifiers
            .push(Identifier::new(IdentifierType::IhIrn, irn));
        reg.insert_entity(e);
    }
    let before = reg.clone();
    let err = reg.merge_institutions(ka, kb, "user").unwrap_err();
    assert_eq!(
        err,
        MergeError::BothIhLinked {
            to_replace: ka,
            replacement: kb
        }
    );
    assert_untouched(&before, &reg);
}

#[test]
fn merge_with_deleted_entity_fails() {
    let (mut reg, ka, kb) = seeded();
    let mut b = reg.institution(kb).cloned().unwrap();
    b.deleted = Some(chrono::Utc::now());
    reg.insert_entity(b);
    let before = reg.clone();
    assert_eq!(
        reg.merge_institutions(ka, kb, "user").unwrap_err(),
        MergeError::Deleted(kb)
    );
    assert_untouched(&before, &reg);
}
