//! Merge of two duplicate registry entities.

use chrono::{DateTime, Utc};
use gsc_schemas::{
    AlternativeCode, EntityKind, Identifier, IdentifierType, MachineTag, OccurrenceMapping,
    Person, RegistryEntity,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{MergeError, Registry};

/// What a committed merge moved onto the replacement.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    pub to_replace: Uuid,
    pub replacement: Uuid,
    pub identifiers_added: Vec<Identifier>,
    pub machine_tags_added: Vec<MachineTag>,
    pub contacts_added: Vec<Uuid>,
    pub occurrence_mappings_added: Vec<OccurrenceMapping>,
    pub alternative_codes_added: Vec<AlternativeCode>,
    /// Optional fields of the replacement that were empty and took A's value.
    pub fields_filled: Vec<&'static str>,
    pub persons_repointed: Vec<Uuid>,
    pub collections_repointed: Vec<Uuid>,
}

/// Changes computed against copies. Applied in one go by [`Staged::commit`].
struct Staged {
    to_replace: RegistryEntity,
    replacement: RegistryEntity,
    persons: Vec<Person>,
    collections: Vec<RegistryEntity>,
}

impl Registry {
    /// Merge institution `to_replace` into `replacement`.
    pub fn merge_institutions(
        &mut self,
        to_replace: Uuid,
        replacement: Uuid,
        performed_by: &str,
    ) -> Result<MergeReport, MergeError> {
        self.merge_at(
            EntityKind::Institution,
            to_replace,
            replacement,
            performed_by,
            Utc::now(),
        )
    }

    /// Merge collection `to_replace` into `replacement`.
    pub fn merge_collections(
        &mut self,
        to_replace: Uuid,
        replacement: Uuid,
        performed_by: &str,
    ) -> Result<MergeReport, MergeError> {
        self.merge_at(
            EntityKind::Collection,
            to_replace,
            replacement,
            performed_by,
            Utc::now(),
        )
    }

    /// Merge with an explicit timestamp for the audit fields.
    ///
    /// On error the registry is unchanged.
    pub fn merge_at(
        &mut self,
        kind: EntityKind,
        to_replace: Uuid,
        replacement: Uuid,
        performed_by: &str,
        now: DateTime<Utc>,
    ) -> Result<MergeReport, MergeError> {
        let (staged, report) = match self.stage(kind, to_replace, replacement, performed_by, now) {
            Ok(staged) => staged,
            Err(err) => {
                warn!(
                    kind = ?kind,
                    to_replace = %to_replace,
                    replacement = %replacement,
                    error = %err,
                    "merge/rejected"
                );
                return Err(err);
            }
        };

        self.commit(kind, staged);
        info!(
            kind = ?kind,
            to_replace = %to_replace,
            replacement = %replacement,
            performed_by,
            identifiers = report.identifiers_added.len(),
            persons = report.persons_repointed.len(),
            collections = report.collections_repointed.len(),
            "merge/commit"
        );
        Ok(report)
    }

    fn stage(
        &self,
        kind: EntityKind,
        to_replace: Uuid,
        replacement: Uuid,
        performed_by: &str,
        now: DateTime<Utc>,
    ) -> Result<(Staged, MergeReport), MergeError> {
        if performed_by.trim().is_empty() {
            return Err(MergeError::MissingPerformer);
        }
        if to_replace == replacement {
            return Err(MergeError::SameEntity(to_replace));
        }
        let a = self.mergeable(kind, to_replace)?;
        let b = self.mergeable(kind, replacement)?;

        if a.has_identifier_type(IdentifierType::IhIrn)
            && b.has_identifier_type(IdentifierType::IhIrn)
        {
            return Err(MergeError::BothIhLinked {
                to_replace,
                replacement,
            });
        }
        if a.is_idigbio_record() && b.is_idigbio_record() {
            return Err(MergeError::BothIDigBio {
                to_replace,
                replacement,
            });
        }

        let mut report = MergeReport {
            to_replace,
            replacement,
            ..MergeReport::default()
        };

        let mut new_b = b.clone();
        report.identifiers_added = union_into(&mut new_b.identifiers, &a.identifiers);
        report.machine_tags_added = union_into(&mut new_b.machine_tags, &a.machine_tags);
        report.contacts_added = union_into(&mut new_b.contacts, &a.contacts);
        report.occurrence_mappings_added =
            union_into(&mut new_b.occurrence_mappings, &a.occurrence_mappings);
        union_into(&mut new_b.email, &a.email);
        union_into(&mut new_b.phone, &a.phone);
        report.alternative_codes_added = merge_codes(&mut new_b, a);
        report.fields_filled = fill_missing(&mut new_b, a);
        new_b.modified = Some(now);
        new_b.modified_by = Some(performed_by.to_string());

        let mut new_a = a.clone();
        new_a.deleted = Some(now);
        new_a.replaced_by = Some(replacement);
        new_a.modified = Some(now);
        new_a.modified_by = Some(performed_by.to_string());

        let mut persons = Vec::new();
        for person in self.persons.values() {
            let by_institution = person.primary_institution_key == Some(to_replace);
            let by_collection = person.primary_collection_key == Some(to_replace);
            if !by_institution && !by_collection {
                continue;
            }
            let mut p = person.clone();
            if by_institution {
                p.primary_institution_key = Some(replacement);
            }
            if by_collection {
                p.primary_collection_key = Some(replacement);
            }
            p.modified = Some(now);
            p.modified_by = Some(performed_by.to_string());
            if let Some(key) = p.key {
                report.persons_repointed.push(key);
            }
            persons.push(p);
        }

        let mut collections = Vec::new();
        if kind == EntityKind::Institution {
            for coll in self.collections.values() {
                if coll.institution_key != Some(to_replace) {
                    continue;
                }
                let mut c = coll.clone();
                c.institution_key = Some(replacement);
                c.modified = Some(now);
                c.modified_by = Some(performed_by.to_string());
                if let Some(key) = c.key {
                    report.collections_repointed.push(key);
                }
                collections.push(c);
            }
        }

        Ok((
            Staged {
                to_replace: new_a,
                replacement: new_b,
                persons,
                collections,
            },
            report,
        ))
    }

    pub(crate) fn mergeable(&self, kind: EntityKind, key: Uuid) -> Result<&RegistryEntity, MergeError> {
        let entity = self
            .entity(kind, key)
            .ok_or(MergeError::NotFound { kind, key })?;
        if let Some(replaced_by) = entity.replaced_by {
            return Err(MergeError::AlreadyReplaced { key, replaced_by });
        }
        if entity.deleted.is_some() {
            return Err(MergeError::Deleted(key));
        }
        Ok(entity)
    }

    fn commit(&mut self, kind: EntityKind, staged: Staged) {
        for person in staged.persons {
            self.insert_person(person);
        }
        for coll in staged.collections {
            self.insert_entity(coll);
        }
        let table = self.table_mut(kind);
        for entity in [staged.to_replace, staged.replacement] {
            if let Some(key) = entity.key {
                table.insert(key, entity);
            }
        }
    }
}

/// Append the items of `source` missing from `target`. Returns what was added.
fn union_into<T: PartialEq + Clone>(target: &mut Vec<T>, source: &[T]) -> Vec<T> {
    let mut added = Vec::new();
    for item in source {
        if !target.contains(item) {
            target.push(item.clone());
            added.push(item.clone());
        }
    }
    added
}

fn merge_codes(b: &mut RegistryEntity, a: &RegistryEntity) -> Vec<AlternativeCode> {
    let mut incoming = Vec::new();
    if let (Some(code), Some(key)) = (a.code.as_deref(), a.key) {
        incoming.push(AlternativeCode {
            code: code.to_string(),
            description: Some(format!("Code from replaced entity {key}")),
        });
    }
    incoming.extend(a.alternative_codes.iter().cloned());

    let mut added = Vec::new();
    for alt in incoming {
        let known = b.code.as_deref() == Some(alt.code.as_str())
            || b.alternative_codes.iter().any(|c| c.code == alt.code);
        if !known {
            b.alternative_codes.push(alt.clone());
            added.push(alt);
        }
    }
    added
}

fn fill_missing(b: &mut RegistryEntity, a: &RegistryEntity) -> Vec<&'static str> {
    let mut filled = Vec::new();
    macro_rules! fallback {
        ($field:ident) => {
            if b.$field.is_none() && a.$field.is_some() {
                b.$field = a.$field.clone();
                filled.push(stringify!($field));
            }
        };
    }
    fallback!(address);
    fallback!(mailing_address);
    fallback!(description);
    fallback!(homepage);
    fallback!(latitude);
    fallback!(longitude);
    fallback!(number_specimens);
    fallback!(institution_key);
    filled
}
