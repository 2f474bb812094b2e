//! Internal registry (GrSciColl) model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Country;

/// Machine tag namespace that marks records owned by iDigBio.
pub const IDIGBIO_NAMESPACE: &str = "iDigBio.org";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdentifierType {
    IhIrn,
    Uuid,
    Doi,
    Url,
    Lsid,
    GrbioUri,
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identifier {
    #[serde(rename = "type")]
    pub identifier_type: IdentifierType,
    pub identifier: String,
}

impl Identifier {
    pub fn new(identifier_type: IdentifierType, identifier: impl Into<String>) -> Self {
        Self {
            identifier_type,
            identifier: identifier.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MachineTag {
    pub namespace: String,
    pub name: String,
    pub value: String,
}

impl MachineTag {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Links occurrence records of a dataset to an entity.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccurrenceMapping {
    pub code: Option<String>,
    pub identifier: Option<String>,
    pub dataset_key: Uuid,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AlternativeCode {
    pub code: String,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    pub address: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<Country>,
}

impl Address {
    pub fn is_empty(&self) -> bool {
        self.address.is_none()
            && self.city.is_none()
            && self.province.is_none()
            && self.postal_code.is_none()
            && self.country.is_none()
    }
}

/// Access to the identifier list of anything the sync can match on.
pub trait Identifiable {
    fn key(&self) -> Option<Uuid>;
    fn identifiers(&self) -> &[Identifier];
    fn is_deleted(&self) -> bool;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Institution,
    Collection,
}

/// An institution or a collection. Both share one shape in the registry;
/// `institution_key` is only meaningful for collections.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntity {
    pub kind: EntityKind,
    pub key: Option<Uuid>,
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<Address>,
    pub mailing_address: Option<Address>,
    #[serde(default)]
    pub email: Vec<String>,
    #[serde(default)]
    pub phone: Vec<String>,
    pub homepage: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub number_specimens: Option<i64>,
    #[serde(default)]
    pub alternative_codes: Vec<AlternativeCode>,
    #[serde(default)]
    pub identifiers: Vec<Identifier>,
    #[serde(default)]
    pub machine_tags: Vec<MachineTag>,
    #[serde(default)]
    pub occurrence_mappings: Vec<OccurrenceMapping>,
    /// Keys of the persons listed as contacts.
    #[serde(default)]
    pub contacts: Vec<Uuid>,
    pub institution_key: Option<Uuid>,
    #[serde(default)]
    pub index_herbariorum_record: bool,
    pub created: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub modified: Option<DateTime<Utc>>,
    pub modified_by: Option<String>,
    pub deleted: Option<DateTime<Utc>>,
    pub replaced_by: Option<Uuid>,
    /// Set on an institution turned into this collection.
    pub converted_to_collection: Option<Uuid>,
}

impl RegistryEntity {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            key: None,
            code: None,
            name: None,
            description: None,
            address: None,
            mailing_address: None,
            email: Vec::new(),
            phone: Vec::new(),
            homepage: None,
            latitude: None,
            longitude: None,
            number_specimens: None,
            alternative_codes: Vec::new(),
            identifiers: Vec::new(),
            machine_tags: Vec::new(),
            occurrence_mappings: Vec::new(),
            contacts: Vec::new(),
            institution_key: None,
            index_herbariorum_record: false,
            created: None,
            created_by: None,
            modified: None,
            modified_by: None,
            deleted: None,
            replaced_by: None,
            converted_to_collection: None,
        }
    }

    pub fn institution() -> Self {
        Self::new(EntityKind::Institution)
    }

    pub fn collection() -> Self {
        Self::new(EntityKind::Collection)
    }

    pub fn has_identifier_type(&self, identifier_type: IdentifierType) -> bool {
        self.identifiers
            .iter()
            .any(|i| i.identifier_type == identifier_type)
    }

    pub fn is_idigbio_record(&self) -> bool {
        self.machine_tags
            .iter()
            .any(|mt| mt.namespace == IDIGBIO_NAMESPACE)
    }

    /// Business-field equality: ignores key, created/modified audit fields,
    /// deletion, replacement and conversion markers. List-valued sub-resources compare as
    /// sets.
    pub fn lenient_eq(&self, other: &RegistryEntity) -> bool {
        self.kind == other.kind
            && self.code == other.code
            && self.name == other.name
            && self.description == other.description
            && self.address == other.address
            && self.mailing_address == other.mailing_address
            && self.email == other.email
            && self.phone == other.phone
            && self.homepage == other.homepage
            && self.latitude == other.latitude
            && self.longitude == other.longitude
            && self.number_specimens == other.number_specimens
            && self.institution_key == other.institution_key
            && self.index_herbariorum_record == other.index_herbariorum_record
            && same_set(&self.alternative_codes, &other.alternative_codes)
            && same_set(&self.identifiers, &other.identifiers)
            && same_set(&self.machine_tags, &other.machine_tags)
            && same_set(&self.occurrence_mappings, &other.occurrence_mappings)
            && same_set(&self.contacts, &other.contacts)
    }
}

impl Identifiable for RegistryEntity {
    fn key(&self) -> Option<Uuid> {
        self.key
    }

    fn identifiers(&self) -> &[Identifier] {
        &self.identifiers
    }

    fn is_deleted(&self) -> bool {
        self.deleted.is_some()
    }
}

/// A registry person (staff member / contact).
///
/// Primary institution and collection keys are weak, lookup-only references.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Person {
    pub key: Option<Uuid>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub position: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub fax: Option<String>,
    pub mailing_address: Option<Address>,
    pub identifiers: Vec<Identifier>,
    pub primary_institution_key: Option<Uuid>,
    pub primary_collection_key: Option<Uuid>,
    pub created: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub modified: Option<DateTime<Utc>>,
    pub modified_by: Option<String>,
    pub deleted: Option<DateTime<Utc>>,
}

impl Person {
    pub fn has_identifier_type(&self, identifier_type: IdentifierType) -> bool {
        self.identifiers
            .iter()
            .any(|i| i.identifier_type == identifier_type)
    }

    /// Business-field equality, see [`RegistryEntity::lenient_eq`].
    pub fn lenient_eq(&self, other: &Person) -> bool {
        self.first_name == other.first_name
            && self.last_name == other.last_name
            && self.position == other.position
            && self.email == other.email
            && self.phone == other.phone
            && self.fax == other.fax
            && self.mailing_address == other.mailing_address
            && self.primary_institution_key == other.primary_institution_key
            && self.primary_collection_key == other.primary_collection_key
            && same_set(&self.identifiers, &other.identifiers)
    }
}

impl Identifiable for Person {
    fn key(&self) -> Option<Uuid> {
        self.key
    }

    fn identifiers(&self) -> &[Identifier] {
        &self.identifiers
    }

    fn is_deleted(&self) -> bool {
        self.deleted.is_some()
    }
}

fn same_set<T: Ord + Clone>(a: &[T], b: &[T]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut a = a.to_vec();
    let mut b = b.to_vec();
    a.sort();
    b.sort();
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RegistryEntity {
        let mut e = RegistryEntity::institution();
        e.key = Some(Uuid::new_v4());
        e.code = Some("UARK".to_string());
        e.identifiers = vec![
            Identifier::new(IdentifierType::IhIrn, "gbif:ih:irn:1"),
            Identifier::new(IdentifierType::Doi, "10.1/abc"),
        ];
        e
    }

    #[test]
    fn lenient_eq_ignores_system_fields() {
        let a = sample();
        let mut b = a.clone();
        b.key = Some(Uuid::new_v4());
        b.modified = Some(Utc::now());
        b.modified_by = Some("someone".to_string());
        b.deleted = Some(Utc::now());
        assert!(a.lenient_eq(&b));
    }

    #[test]
    fn lenient_eq_ignores_identifier_order() {
        let a = sample();
        let mut b = a.clone();
        b.identifiers.reverse();
        assert!(a.lenient_eq(&b));
    }

    #[test]
    fn lenient_eq_sees_business_changes() {
        let a = sample();
        let mut b = a.clone();
        b.name = Some("Renamed".to_string());
        assert!(!a.lenient_eq(&b));

        let mut c = a.clone();
        c.index_herbariorum_record = true;
        assert!(!a.lenient_eq(&c));
    }

    #[test]
    fn idigbio_detection_uses_namespace() {
        let mut e = sample();
        assert!(!e.is_idigbio_record());
        e.machine_tags
            .push(MachineTag::new(IDIGBIO_NAMESPACE, "CollectionUUID", "x"));
        assert!(e.is_idigbio_record());
    }

    #[test]
    fn person_equality_ignores_key_and_audit() {
        let a = Person {
            key: Some(Uuid::new_v4()),
            first_name: Some("Ana".to_string()),
            email: Some("ana@x.org".to_string()),
            ..Person::default()
        };
        let b = Person {
            key: None,
            modified: Some(Utc::now()),
            ..a.clone()
        };
        assert!(a.lenient_eq(&b));
        assert!(!a.lenient_eq(&Person::default()));
    }
}
