//! Staff (person) reconciliation.
//!
//! Persons carrying an IH identifier are matched by IRN. Persons without
//! one fall back to a normalized full-name match, which must be one-to-one
//! to be applied. Persons in IH scope that nothing claims are reported for
//! deletion; unclaimed staff records become new persons.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tracing::{debug, warn};

use gsc_config::StaffMissingDatePolicy;
use gsc_schemas::{
    EntityKind, ExternalInstitutionRecord, ExternalStaffRecord, IdentifierType, Person,
    RegistryEntity,
};

use crate::convert::EntityConverter;
use crate::freshness::{self, SourceFreshness};
use crate::index::{person_name_key, staff_name_key, EntityIndex, IrnIndex};
use crate::irn;
use crate::snapshot::StaffSource;
use crate::{
    Conflict, ConflictReason, MatchedRef, Outcome, SourceRef, StaffDiffResult, Update,
};

/// One external staff record and the internal entity its institution
/// resolved to, if that match was clean.
struct StaffEntry<'a> {
    record: ExternalStaffRecord,
    home: Option<&'a RegistryEntity>,
    /// Position of the IH institution the record was listed under.
    source: usize,
}

#[derive(Clone, Copy, Debug)]
pub struct StaffDiffFinder<'c> {
    converter: &'c EntityConverter,
    missing_date: StaffMissingDatePolicy,
}

impl<'c> StaffDiffFinder<'c> {
    pub fn new(converter: &'c EntityConverter, missing_date: StaffMissingDatePolicy) -> Self {
        Self {
            converter,
            missing_date,
        }
    }

    pub fn find<S>(
        &self,
        ih_institutions: &[ExternalInstitutionRecord],
        staff: &S,
        index: &EntityIndex<'_>,
        persons: &[Person],
    ) -> StaffDiffResult
    where
        S: StaffSource + ?Sized,
    {
        self.find_with_sources(ih_institutions, staff, index, persons).0
    }

    /// [`find`](Self::find), plus the IH institution position each created
    /// person was listed under, parallel to `persons_to_create`.
    pub(crate) fn find_with_sources<S>(
        &self,
        ih_institutions: &[ExternalInstitutionRecord],
        staff: &S,
        index: &EntityIndex<'_>,
        persons: &[Person],
    ) -> (StaffDiffResult, Vec<usize>)
    where
        S: StaffSource + ?Sized,
    {
        let entries = gather_staff(ih_institutions, staff, index);

        let tracked = index.ih_tracked_keys();
        let scope: Vec<&Person> = persons
            .iter()
            .filter(|p| p.deleted.is_none())
            .filter(|p| {
                p.has_identifier_type(IdentifierType::IhIrn)
                    || p.primary_institution_key.is_some_and(|k| tracked.contains(&k))
                    || p.primary_collection_key.is_some_and(|k| tracked.contains(&k))
            })
            .collect();

        let mut result = StaffDiffResult::default();
        let mut staff_done = vec![false; entries.len()];
        let mut person_done = vec![false; scope.len()];

        self.match_by_irn(&entries, &scope, &mut staff_done, &mut person_done, &mut result);
        self.match_by_name(&entries, &scope, &mut staff_done, &mut person_done, &mut result);

        for (pi, person) in scope.iter().enumerate() {
            if !person_done[pi] {
                debug!(key = ?person.key, "staff/orphan");
                result.record_orphan((*person).clone());
            }
        }

        let mut sources = Vec::new();
        for (si, entry) in entries.iter().enumerate() {
            if staff_done[si] {
                continue;
            }
            let mut person = self.converter.to_person(&entry.record, None);
            if let Some(home) = entry.home {
                match home.kind {
                    EntityKind::Institution => person.primary_institution_key = home.key,
                    EntityKind::Collection => person.primary_collection_key = home.key,
                }
            }
            debug!(irn = ?entry.record.irn, home = ?entry.home.and_then(|h| h.key), "staff/create");
            result.record(Outcome::Create(person));
            sources.push(entry.source);
        }

        (result, sources)
    }

    fn match_by_irn(
        &self,
        entries: &[StaffEntry<'_>],
        scope: &[&Person],
        staff_done: &mut [bool],
        person_done: &mut [bool],
        result: &mut StaffDiffResult,
    ) {
        let by_irn: IrnIndex<usize> = IrnIndex::build(scope.iter().copied().enumerate());
        let ambiguous = by_irn.ambiguous();

        let mut staff_irns: HashMap<&str, usize> = HashMap::new();
        let mut claims: HashMap<usize, usize> = HashMap::new();
        for entry in entries {
            if let Some(irn) = irn::source_irn(entry.record.irn.as_deref()) {
                *staff_irns.entry(irn).or_default() += 1;
                for pi in by_irn.get(irn) {
                    *claims.entry(*pi).or_default() += 1;
                }
            }
        }

        for (si, entry) in entries.iter().enumerate() {
            let Some(irn) = irn::source_irn(entry.record.irn.as_deref()) else {
                continue;
            };
            let matched = by_irn.get(irn);
            let duplicated = staff_irns.get(irn).is_some_and(|n| *n > 1);
            if matched.is_empty() && !duplicated {
                continue;
            }

            staff_done[si] = true;
            for pi in matched {
                person_done[*pi] = true;
            }

            match matched {
                [pi] if !duplicated
                    && !ambiguous.contains(pi)
                    && claims.get(pi).copied() == Some(1) =>
                {
                    result.record(self.compare(&entry.record, scope[*pi]));
                }
                _ => {
                    warn!(irn, matches = matched.len(), "staff/multiple_matches");
                    result.record(Outcome::Conflict(Conflict::new(
                        ConflictReason::MultipleMatches,
                        vec![SourceRef::staff(&entry.record)],
                        matched.iter().map(|pi| MatchedRef::person(scope[*pi])).collect(),
                    )));
                }
            }
        }

        // Persons sharing an IRN that no staff record carries.
        for irn in by_irn.ambiguous_irns() {
            let holders = by_irn.get(irn);
            if holders.iter().all(|pi| person_done[*pi]) {
                continue;
            }
            warn!(irn, holders = holders.len(), "staff/shared_internal_irn");
            for pi in holders {
                person_done[*pi] = true;
            }
            result.record(Outcome::Conflict(Conflict::new(
                ConflictReason::MultipleMatches,
                Vec::new(),
                holders.iter().map(|pi| MatchedRef::person(scope[*pi])).collect(),
            )));
        }
    }

    fn match_by_name(
        &self,
        entries: &[StaffEntry<'_>],
        scope: &[&Person],
        staff_done: &mut [bool],
        person_done: &mut [bool],
        result: &mut StaffDiffResult,
    ) {
        let mut staff_by_name: HashMap<String, Vec<usize>> = HashMap::new();
        for (si, entry) in entries.iter().enumerate() {
            if staff_done[si] {
                continue;
            }
            if let Some(key) = staff_name_key(&entry.record) {
                staff_by_name.entry(key).or_default().push(si);
            }
        }

        // name key -> persons, in first-seen order
        let mut names: Vec<String> = Vec::new();
        let mut persons_by_name: HashMap<String, Vec<usize>> = HashMap::new();
        for (pi, person) in scope.iter().enumerate() {
            if person_done[pi] || person.has_identifier_type(IdentifierType::IhIrn) {
                continue;
            }
            if let Some(key) = person_name_key(person) {
                if !persons_by_name.contains_key(&key) {
                    names.push(key.clone());
                }
                persons_by_name.entry(key).or_default().push(pi);
            }
        }

        for key in names {
            let people = persons_by_name.get(&key).map(Vec::as_slice).unwrap_or(&[]);
            let staff = staff_by_name.get(&key).map(Vec::as_slice).unwrap_or(&[]);
            match (people, staff) {
                (_, []) => {}
                ([pi], [si]) => {
                    staff_done[*si] = true;
                    person_done[*pi] = true;
                    result.record(self.compare(&entries[*si].record, scope[*pi]));
                }
                _ => {
                    warn!(persons = people.len(), staff = staff.len(), "staff/ambiguous_name_match");
                    for si in staff {
                        staff_done[*si] = true;
                    }
                    for pi in people {
                        person_done[*pi] = true;
                    }
                    result.record(Outcome::Conflict(Conflict::new(
                        ConflictReason::AmbiguousNameMatch,
                        staff
                            .iter()
                            .map(|si| SourceRef::staff(&entries[*si].record))
                            .collect(),
                        people.iter().map(|pi| MatchedRef::person(scope[*pi])).collect(),
                    )));
                }
            }
        }
    }

    /// No-change, update or conflict for one staff record matched to one
    /// person.
    fn compare(&self, staff: &ExternalStaffRecord, existing: &Person) -> Outcome<Person> {
        let candidate = self.converter.to_person(staff, Some(existing));
        let freshness = freshness::check(existing.modified, staff.date_modified.as_deref());

        let reason = if candidate.lenient_eq(existing) {
            match (&freshness, self.missing_date) {
                (SourceFreshness::Unknown { .. }, StaffMissingDatePolicy::Conflict) => {
                    ConflictReason::UnknownSourceFreshness
                }
                _ => {
                    debug!(key = ?existing.key, "staff/no_change");
                    return Outcome::NoChange(existing.clone());
                }
            }
        } else {
            match freshness {
                SourceFreshness::Current => {
                    debug!(key = ?existing.key, "staff/update");
                    return Outcome::Update(Update {
                        old: existing.clone(),
                        new: candidate,
                    });
                }
                SourceFreshness::Outdated { .. } => ConflictReason::OutdatedSource,
                SourceFreshness::Unknown { .. } => ConflictReason::UnknownSourceFreshness,
            }
        };

        debug!(key = ?existing.key, reason = ?reason, "staff/conflict");
        Outcome::Conflict(
            Conflict::new(
                reason,
                vec![SourceRef::staff(staff)],
                vec![MatchedRef::person(existing)],
            )
            .with_evidence(existing.modified, staff.date_modified.as_deref()),
        )
    }
}

/// Staff of every external institution with a code. A record listed
/// identically under several institutions is kept once, with or without
/// an IRN.
fn gather_staff<'a, S>(
    ih_institutions: &[ExternalInstitutionRecord],
    staff: &S,
    index: &EntityIndex<'a>,
) -> Vec<StaffEntry<'a>>
where
    S: StaffSource + ?Sized,
{
    let mut entries: Vec<StaffEntry<'a>> = Vec::new();
    let mut first_by_irn: HashMap<String, usize> = HashMap::new();
    let mut without_irn: Vec<usize> = Vec::new();

    for (source, inst) in ih_institutions.iter().enumerate() {
        let Some(code) = inst.code.as_deref().map(str::trim).filter(|c| !c.is_empty()) else {
            continue;
        };
        let home = irn::source_irn(inst.irn.as_deref()).and_then(|i| index.single_match(i));

        for record in staff.staff_of(code) {
            let repeated = match irn::source_irn(record.irn.as_deref()) {
                Some(irn) => match first_by_irn.entry(irn.to_string()) {
                    Entry::Occupied(first) => entries[*first.get()].record == record,
                    Entry::Vacant(slot) => {
                        slot.insert(entries.len());
                        false
                    }
                },
                None => {
                    let seen = without_irn.iter().any(|i| entries[*i].record == record);
                    if !seen {
                        without_irn.push(entries.len());
                    }
                    seen
                }
            };
            if repeated {
                continue;
            }
            entries.push(StaffEntry {
                record,
                home,
                source,
            });
        }
    }
    entries
}
