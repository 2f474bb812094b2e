use std::collections::{HashMap, HashSet};
use std::fmt;

use tracing::{debug, info, warn};
use uuid::Uuid;

use gsc_config::StaffMissingDatePolicy;
use gsc_schemas::{EntityKind, ExternalInstitutionRecord, RegistryEntity};

use crate::convert::EntityConverter;
use crate::freshness::{self, SourceFreshness};
use crate::index::{EntityIndex, Slot};
use crate::irn;
use crate::snapshot::{RegistrySnapshot, StaffSource};
use crate::staff::StaffDiffFinder;
use crate::{
    Conflict, ConflictReason, DiffResult, KindDiff, MatchedRef, NewInstitutionStaff, Outcome,
    SourceRef, StaffDiffResult, Update,
};

/// Invalid call shape. Malformed data never produces this; it becomes a
/// conflict or a create instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiffError {
    /// An entity sits in the list for the other kind.
    WrongKind {
        list: EntityKind,
        position: usize,
        key: Option<Uuid>,
    },
}

impl fmt::Display for DiffError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongKind {
                list,
                position,
                key,
            } => write!(
                f,
                "entity at position {position} (key {key:?}) does not belong in the {list:?} list"
            ),
        }
    }
}

impl std::error::Error for DiffError {}

/// Computes the changes that bring the registry in line with IH.
///
/// Pure: reads both snapshots, returns a [`DiffResult`], writes nothing.
#[derive(Clone, Copy, Debug)]
pub struct DiffEngine<'c> {
    converter: &'c EntityConverter,
    staff_missing_date: StaffMissingDatePolicy,
}

impl<'c> DiffEngine<'c> {
    pub fn new(converter: &'c EntityConverter, staff_missing_date: StaffMissingDatePolicy) -> Self {
        Self {
            converter,
            staff_missing_date,
        }
    }

    pub fn find<S>(
        &self,
        ih_institutions: &[ExternalInstitutionRecord],
        staff: &S,
        registry: &RegistrySnapshot,
    ) -> Result<DiffResult, DiffError>
    where
        S: StaffSource + ?Sized,
    {
        validate(registry)?;
        let index = EntityIndex::build(&registry.institutions, &registry.collections);

        let entities = self.diff_entities(ih_institutions, &index);
        let staff = self
            .staff_finder()
            .find_with_sources(ih_institutions, staff, &index, &registry.persons);

        Ok(finish(assemble(entities, staff)))
    }

    /// Same result as [`find`](Self::find), with the entity pass and the
    /// staff pass on separate threads.
    pub fn find_concurrent<S>(
        &self,
        ih_institutions: &[ExternalInstitutionRecord],
        staff: &S,
        registry: &RegistrySnapshot,
    ) -> Result<DiffResult, DiffError>
    where
        S: StaffSource + Sync + ?Sized,
    {
        validate(registry)?;
        let index = EntityIndex::build(&registry.institutions, &registry.collections);

        let finder = self.staff_finder();
        let index_ref = &index;
        let (entities, staff) = std::thread::scope(|s| {
            let staff_pass = s.spawn(move || {
                finder.find_with_sources(ih_institutions, staff, index_ref, &registry.persons)
            });
            let entities = self.diff_entities(ih_institutions, index_ref);
            let staff = match staff_pass.join() {
                Ok(staff) => staff,
                Err(panic) => std::panic::resume_unwind(panic),
            };
            (entities, staff)
        });

        Ok(finish(assemble(entities, staff)))
    }

    fn staff_finder(&self) -> StaffDiffFinder<'c> {
        StaffDiffFinder::new(self.converter, self.staff_missing_date)
    }

    fn diff_entities(
        &self,
        records: &[ExternalInstitutionRecord],
        index: &EntityIndex<'_>,
    ) -> EntityPass {
        let mut source_irns: HashMap<&str, usize> = HashMap::new();
        let mut claims: HashMap<Slot, usize> = HashMap::new();
        for rec in records {
            if let Some(irn) = irn::source_irn(rec.irn.as_deref()) {
                *source_irns.entry(irn).or_default() += 1;
                for slot in index.lookup(irn) {
                    *claims.entry(*slot).or_default() += 1;
                }
            }
        }

        let mut pass = EntityPass::default();
        // entities already named by some conflict
        let mut reported: HashSet<Slot> = HashSet::new();

        for (position, rec) in records.iter().enumerate() {
            let irn = irn::source_irn(rec.irn.as_deref());
            let slots = irn.map(|i| index.lookup(i)).unwrap_or(&[]);
            let duplicated_source =
                irn.is_some_and(|i| source_irns.get(i).is_some_and(|n| *n > 1));

            let (kind, outcome) = match slots {
                _ if duplicated_source => {
                    warn!(irn = ?irn, code = ?rec.code, "diff/duplicate_source_irn");
                    reported.extend(slots);
                    multiple_matches(vec![SourceRef::institution(rec)], slots, index)
                }
                [] => {
                    debug!(irn = ?irn, code = ?rec.code, "diff/create");
                    pass.created_from.push(position);
                    (
                        EntityKind::Institution,
                        Outcome::Create(self.converter.to_institution(rec, None)),
                    )
                }
                [slot] if !index.is_ambiguous(*slot) && claims.get(slot).copied() == Some(1) => {
                    let existing = index.entity(*slot);
                    (existing.kind, self.classify(rec, existing))
                }
                _ => {
                    warn!(irn = ?irn, code = ?rec.code, matches = slots.len(), "diff/multiple_matches");
                    reported.extend(slots);
                    multiple_matches(vec![SourceRef::institution(rec)], slots, index)
                }
            };
            pass.record(kind, outcome);
        }

        // Internal entities sharing an IRN are a conflict even when no IH
        // record points at them.
        for irn in index.ambiguous_irns() {
            let slots = index.lookup(irn);
            if slots.iter().all(|s| reported.contains(s)) {
                continue;
            }
            warn!(irn, holders = slots.len(), "diff/shared_internal_irn");
            reported.extend(slots);
            let (kind, outcome) = multiple_matches(Vec::new(), slots, index);
            pass.record(kind, outcome);
        }

        pass
    }

    /// No-change, update or conflict for a record with exactly one match.
    fn classify(
        &self,
        rec: &ExternalInstitutionRecord,
        existing: &RegistryEntity,
    ) -> Outcome<RegistryEntity> {
        let candidate = self.converter.to_entity(existing.kind, rec, Some(existing));
        if candidate.lenient_eq(existing) {
            debug!(key = ?existing.key, code = ?existing.code, "diff/no_change");
            return Outcome::NoChange(existing.clone());
        }

        let reason = match freshness::check(existing.modified, rec.date_modified.as_deref()) {
            SourceFreshness::Current => {
                debug!(key = ?existing.key, code = ?existing.code, "diff/update");
                return Outcome::Update(Update {
                    old: existing.clone(),
                    new: candidate,
                });
            }
            SourceFreshness::Outdated { .. } => ConflictReason::OutdatedSource,
            SourceFreshness::Unknown { .. } => ConflictReason::UnknownSourceFreshness,
        };
        debug!(key = ?existing.key, reason = ?reason, "diff/conflict");
        Outcome::Conflict(
            Conflict::new(
                reason,
                vec![SourceRef::institution(rec)],
                vec![MatchedRef::entity(existing)],
            )
            .with_evidence(existing.modified, rec.date_modified.as_deref()),
        )
    }
}

/// Conflicts go to the collection bucket only when every match is a
/// collection.
fn multiple_matches(
    sources: Vec<SourceRef>,
    slots: &[Slot],
    index: &EntityIndex<'_>,
) -> (EntityKind, Outcome<RegistryEntity>) {
    let kind = if !slots.is_empty() && slots.iter().all(|s| s.kind == EntityKind::Collection) {
        EntityKind::Collection
    } else {
        EntityKind::Institution
    };
    let matches = slots
        .iter()
        .map(|s| MatchedRef::entity(index.entity(*s)))
        .collect();
    (
        kind,
        Outcome::Conflict(Conflict::new(
            ConflictReason::MultipleMatches,
            sources,
            matches,
        )),
    )
}

fn validate(registry: &RegistrySnapshot) -> Result<(), DiffError> {
    let lists = [
        (EntityKind::Institution, &registry.institutions),
        (EntityKind::Collection, &registry.collections),
    ];
    for (list, entities) in lists {
        if let Some((position, e)) = entities.iter().enumerate().find(|(_, e)| e.kind != list) {
            return Err(DiffError::WrongKind {
                list,
                position,
                key: e.key,
            });
        }
    }
    Ok(())
}

/// Entity pass output before the staff links are known.
#[derive(Default)]
struct EntityPass {
    institutions: KindDiff<RegistryEntity>,
    collections: KindDiff<RegistryEntity>,
    /// Record position behind each entry of `institutions.to_create`.
    created_from: Vec<usize>,
}

impl EntityPass {
    fn record(&mut self, kind: EntityKind, outcome: Outcome<RegistryEntity>) {
        match kind {
            EntityKind::Institution => self.institutions.record(outcome),
            EntityKind::Collection => self.collections.record(outcome),
        }
    }
}

/// Joins the two passes, linking persons to created institutions that came
/// from the same IH record.
fn assemble(
    entities: EntityPass,
    (staff, staff_sources): (StaffDiffResult, Vec<usize>),
) -> DiffResult {
    let mut persons_by_source: HashMap<usize, Vec<usize>> = HashMap::new();
    for (person, source) in staff_sources.into_iter().enumerate() {
        persons_by_source.entry(source).or_default().push(person);
    }

    let new_institution_staff = entities
        .created_from
        .iter()
        .enumerate()
        .filter_map(|(institution, source)| {
            persons_by_source
                .remove(source)
                .map(|persons| NewInstitutionStaff {
                    institution,
                    persons,
                })
        })
        .collect();

    DiffResult {
        institutions: entities.institutions,
        collections: entities.collections,
        staff,
        new_institution_staff,
    }
}

fn finish(result: DiffResult) -> DiffResult {
    let summary = result.summary();
    info!(
        institutions = ?summary.institutions,
        collections = ?summary.collections,
        staff = ?summary.staff,
        "diff/done"
    );
    result
}
