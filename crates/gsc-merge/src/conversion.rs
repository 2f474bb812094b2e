//! Conversion of an institution into a collection.

use chrono::{DateTime, Utc};
use gsc_schemas::{EntityKind, RegistryEntity};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{MergeError, Registry};

/// Institution the new collection will belong to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CollectionParent {
    Existing(Uuid),
    /// Created with the converted institution's code and this name.
    New { name: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionReport {
    pub institution: Uuid,
    pub collection: Uuid,
    pub parent: Uuid,
    pub parent_created: bool,
    /// Collections of the converted institution, now under `parent`.
    pub collections_repointed: Vec<Uuid>,
}

struct StagedConversion {
    institution: RegistryEntity,
    collection: RegistryEntity,
    new_parent: Option<RegistryEntity>,
    collections: Vec<RegistryEntity>,
}

impl Registry {
    pub fn convert_to_collection(
        &mut self,
        institution: Uuid,
        parent: CollectionParent,
        performed_by: &str,
    ) -> Result<ConversionReport, MergeError> {
        self.convert_to_collection_at(institution, parent, performed_by, Utc::now())
    }

    /// Turn `institution` into a new collection under `parent`.
    ///
    /// The collection takes over the institution's codes, names, contact
    /// details, addresses and sub-resources. The institution is marked
    /// deleted and converted, and its collections move to `parent`. On
    /// error the registry is unchanged.
    pub fn convert_to_collection_at(
        &mut self,
        institution: Uuid,
        parent: CollectionParent,
        performed_by: &str,
        now: DateTime<Utc>,
    ) -> Result<ConversionReport, MergeError> {
        let (staged, report) =
            match self.stage_conversion(institution, &parent, performed_by, now) {
                Ok(staged) => staged,
                Err(err) => {
                    warn!(institution = %institution, parent = ?parent, error = %err, "convert/rejected");
                    return Err(err);
                }
            };

        self.commit_conversion(staged);
        info!(
            institution = %institution,
            collection = %report.collection,
            parent = %report.parent,
            parent_created = report.parent_created,
            performed_by,
            collections = report.collections_repointed.len(),
            "convert/commit"
        );
        Ok(report)
    }

    fn stage_conversion(
        &self,
        institution: Uuid,
        parent: &CollectionParent,
        performed_by: &str,
        now: DateTime<Utc>,
    ) -> Result<(StagedConversion, ConversionReport), MergeError> {
        if performed_by.trim().is_empty() {
            return Err(MergeError::MissingPerformer);
        }
        if let Some(collection) = self
            .institution(institution)
            .and_then(|e| e.converted_to_collection)
        {
            return Err(MergeError::AlreadyConverted {
                key: institution,
                collection,
            });
        }
        let source = self.mergeable(EntityKind::Institution, institution)?;
        if source.is_idigbio_record() {
            return Err(MergeError::IDigBioConversion(institution));
        }

        let (parent_key, new_parent) = match parent {
            CollectionParent::Existing(key) => {
                if *key == institution {
                    return Err(MergeError::SameEntity(institution));
                }
                self.mergeable(EntityKind::Institution, *key)?;
                (*key, None)
            }
            CollectionParent::New { name } => {
                let name = name.trim();
                if name.is_empty() {
                    return Err(MergeError::MissingParentName);
                }
                let key = Uuid::new_v4();
                let mut fresh = RegistryEntity::institution();
                fresh.key = Some(key);
                fresh.code = source.code.clone();
                fresh.name = Some(name.to_string());
                stamp_created(&mut fresh, performed_by, now);
                (key, Some(fresh))
            }
        };

        let collection_key = Uuid::new_v4();
        let mut collection = RegistryEntity::collection();
        collection.key = Some(collection_key);
        collection.code = source.code.clone();
        collection.alternative_codes = source.alternative_codes.clone();
        collection.name = source.name.clone();
        collection.description = source.description.clone();
        collection.email = source.email.clone();
        collection.phone = source.phone.clone();
        collection.homepage = source.homepage.clone();
        collection.address = source.address.clone();
        collection.mailing_address = source.mailing_address.clone();
        collection.identifiers = source.identifiers.clone();
        collection.machine_tags = source.machine_tags.clone();
        collection.occurrence_mappings = source.occurrence_mappings.clone();
        collection.contacts = source.contacts.clone();
        // the IH link travels with the IRN identifier
        collection.index_herbariorum_record = source.index_herbariorum_record;
        collection.institution_key = Some(parent_key);
        stamp_created(&mut collection, performed_by, now);

        let mut converted = source.clone();
        converted.deleted = Some(now);
        converted.converted_to_collection = Some(collection_key);
        converted.modified = Some(now);
        converted.modified_by = Some(performed_by.to_string());

        let mut collections = Vec::new();
        let mut collections_repointed = Vec::new();
        for coll in self.collections.values() {
            if coll.institution_key != Some(institution) {
                continue;
            }
            let mut c = coll.clone();
            c.institution_key = Some(parent_key);
            c.modified = Some(now);
            c.modified_by = Some(performed_by.to_string());
            if let Some(key) = c.key {
                collections_repointed.push(key);
            }
            collections.push(c);
        }

        let report = ConversionReport {
            institution,
            collection: collection_key,
            parent: parent_key,
            parent_created: new_parent.is_some(),
            collections_repointed,
        };
        Ok((
            StagedConversion {
                institution: converted,
                collection,
                new_parent,
                collections,
            },
            report,
        ))
    }

    fn commit_conversion(&mut self, staged: StagedConversion) {
        if let Some(parent) = staged.new_parent {
            self.insert_entity(parent);
        }
        for coll in staged.collections {
            self.insert_entity(coll);
        }
        self.insert_entity(staged.collection);
        self.insert_entity(staged.institution);
    }
}

fn stamp_created(entity: &mut RegistryEntity, performed_by: &str, now: DateTime<Utc>) {
    entity.created = Some(now);
    entity.created_by = Some(performed_by.to_string());
    entity.modified = Some(now);
    entity.modified_by = Some(performed_by.to_string());
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use gsc_schemas::{Identifier, IdentifierType, MachineTag, IDIGBIO_NAMESPACE};

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn herbarium() -> RegistryEntity {
        let mut e = RegistryEntity::institution();
        e.code = Some("UARK".to_string());
        e.name = Some("University of Arkansas Herbarium".to_string());
        e.email = vec!["herb@uark.edu".to_string()];
        e.identifiers = vec![Identifier::new(IdentifierType::IhIrn, "gbif:ih:irn:1")];
        e.index_herbariorum_record = true;
        e
    }

    #[test]
    fn new_parent_takes_the_code_and_given_name() {
        let mut reg = Registry::new();
        let ka = reg.insert_entity(herbarium());

        let report = reg
            .convert_to_collection_at(
                ka,
                CollectionParent::New {
                    name: " University of Arkansas ".to_string(),
                },
                "curator",
                now(),
            )
            .unwrap();

        assert!(report.parent_created);
        let parent = reg.institution(report.parent).unwrap();
        assert_eq!(parent.code.as_deref(), Some("UARK"));
        assert_eq!(parent.name.as_deref(), Some("University of Arkansas"));
        assert_eq!(parent.created_by.as_deref(), Some("curator"));

        let coll = reg.collection(report.collection).unwrap();
        assert_eq!(coll.institution_key, Some(report.parent));
        assert_eq!(coll.name.as_deref(), Some("University of Arkansas Herbarium"));
        assert_eq!(coll.email, vec!["herb@uark.edu"]);
        assert_eq!(coll.identifiers, herbarium().identifiers);
        assert!(coll.index_herbariorum_record);

        let old = reg.institution(ka).unwrap();
        assert_eq!(old.deleted, Some(now()));
        assert_eq!(old.converted_to_collection, Some(report.collection));
    }

    #[test]
    fn idigbio_institution_is_not_converted() {
        let mut reg = Registry::new();
        let mut e = herbarium();
        e.machine_tags
            .push(MachineTag::new(IDIGBIO_NAMESPACE, "CollectionUUID", "x"));
        let ka = reg.insert_entity(e);
        let kb = reg.insert_entity(RegistryEntity::institution());

        let err = reg
            .convert_to_collection(ka, CollectionParent::Existing(kb), "curator")
            .unwrap_err();
        assert_eq!(err, MergeError::IDigBioConversion(ka));
        assert!(reg.institution(ka).is_some_and(|e| e.deleted.is_none()));
        assert_eq!(reg.collections().count(), 0);
    }

    #[test]
    fn blank_parent_name_is_rejected() {
        let mut reg = Registry::new();
        let ka = reg.insert_entity(herbarium());
        let err = reg
            .convert_to_collection(
                ka,
                CollectionParent::New {
                    name: "  ".to_string(),
                },
                "curator",
            )
            .unwrap_err();
        assert_eq!(err, MergeError::MissingParentName);
        assert_eq!(reg.institutions().count(), 1);
    }
}
