//! Hash indexes over internal records.
//!
//! A bucket holding more than one record is an ambiguous key; ambiguity
//! falls out of construction instead of a separate scan.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use gsc_schemas::{EntityKind, ExternalStaffRecord, Identifiable, Person, RegistryEntity};

use crate::irn;

/// Position of an entity in the snapshot list of its kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot {
    pub kind: EntityKind,
    pub pos: usize,
}

/// Decoded IRN -> records carrying it. Deleted records are skipped.
#[derive(Clone, Debug)]
pub struct IrnIndex<S> {
    buckets: HashMap<String, Vec<S>>,
}

impl<S: Copy + Eq + Hash> IrnIndex<S> {
    pub fn build<'a, T>(items: impl IntoIterator<Item = (S, &'a T)>) -> Self
    where
        T: Identifiable + 'a,
    {
        let mut buckets: HashMap<String, Vec<S>> = HashMap::new();
        for (slot, item) in items {
            if item.is_deleted() {
                continue;
            }
            for irn in irn::ih_irns(item.identifiers()) {
                buckets.entry(irn).or_default().push(slot);
            }
        }
        Self { buckets }
    }

    pub fn get(&self, irn: &str) -> &[S] {
        self.buckets.get(irn).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every record that shares an IRN with another record.
    pub fn ambiguous(&self) -> HashSet<S> {
        self.buckets
            .values()
            .filter(|b| b.len() > 1)
            .flatten()
            .copied()
            .collect()
    }

    pub fn ambiguous_irns(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .buckets
            .iter()
            .filter(|(_, b)| b.len() > 1)
            .map(|(k, _)| k.as_str())
            .collect();
        keys.sort_unstable();
        keys
    }
}

/// Institutions and collections indexed together, since one IH record may
/// be modeled as either.
pub struct EntityIndex<'a> {
    institutions: &'a [RegistryEntity],
    collections: &'a [RegistryEntity],
    by_irn: IrnIndex<Slot>,
    ambiguous: HashSet<Slot>,
}

impl<'a> EntityIndex<'a> {
    pub fn build(institutions: &'a [RegistryEntity], collections: &'a [RegistryEntity]) -> Self {
        let slots = |kind: EntityKind, list: &'a [RegistryEntity]| {
            list.iter()
                .enumerate()
                .map(move |(pos, e)| (Slot { kind, pos }, e))
        };
        let by_irn = IrnIndex::build(
            slots(EntityKind::Institution, institutions)
                .chain(slots(EntityKind::Collection, collections)),
        );
        let ambiguous = by_irn.ambiguous();
        Self {
            institutions,
            collections,
            by_irn,
            ambiguous,
        }
    }

    pub fn lookup(&self, irn: &str) -> &[Slot] {
        self.by_irn.get(irn)
    }

    pub fn entity(&self, slot: Slot) -> &'a RegistryEntity {
        match slot.kind {
            EntityKind::Institution => &self.institutions[slot.pos],
            EntityKind::Collection => &self.collections[slot.pos],
        }
    }

    pub fn is_ambiguous(&self, slot: Slot) -> bool {
        self.ambiguous.contains(&slot)
    }

    pub fn ambiguous_irns(&self) -> Vec<&str> {
        self.by_irn.ambiguous_irns()
    }

    /// The one entity an IRN resolves to, if the match is clean.
    pub fn single_match(&self, irn: &str) -> Option<&'a RegistryEntity> {
        match self.lookup(irn) {
            [slot] if !self.is_ambiguous(*slot) => Some(self.entity(*slot)),
            _ => None,
        }
    }

    /// Keys of live entities that are tracked from IH.
    pub fn ih_tracked_keys(&self) -> HashSet<uuid::Uuid> {
        self.institutions
            .iter()
            .chain(self.collections)
            .filter(|e| e.deleted.is_none())
            .filter(|e| {
                e.index_herbariorum_record
                    || e.has_identifier_type(gsc_schemas::IdentifierType::IhIrn)
            })
            .filter_map(|e| e.key)
            .collect()
    }
}

/// Case- and whitespace-insensitive name key. `None` when there is no name.
fn name_key<'s>(parts: impl IntoIterator<Item = Option<&'s str>>) -> Option<String> {
    let key: String = parts
        .into_iter()
        .flatten()
        .flat_map(str::chars)
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    (!key.is_empty()).then_some(key)
}

pub fn person_name_key(p: &Person) -> Option<String> {
    name_key([p.first_name.as_deref(), p.last_name.as_deref()])
}

pub fn staff_name_key(s: &ExternalStaffRecord) -> Option<String> {
    name_key([
        s.first_name.as_deref(),
        s.middle_name.as_deref(),
        s.last_name.as_deref(),
    ])
}
