//! In-memory registry store.

use std::collections::BTreeMap;

use gsc_schemas::{EntityKind, Person, RegistryEntity};
use uuid::Uuid;

/// Institutions, collections and persons keyed by their registry key.
///
/// Not thread-safe on its own. Wrap in [`crate::SharedRegistry`] when more
/// than one thread reads or merges.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    pub(crate) institutions: BTreeMap<Uuid, RegistryEntity>,
    pub(crate) collections: BTreeMap<Uuid, RegistryEntity>,
    pub(crate) persons: BTreeMap<Uuid, Person>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an entity under its key, assigning a fresh one when absent.
    /// Returns the key. An existing entity with the same key is replaced.
    pub fn insert_entity(&mut self, mut entity: RegistryEntity) -> Uuid {
        let key = *entity.key.get_or_insert_with(Uuid::new_v4);
        self.table_mut(entity.kind).insert(key, entity);
        key
    }

    pub fn insert_person(&mut self, mut person: Person) -> Uuid {
        let key = *person.key.get_or_insert_with(Uuid::new_v4);
        self.persons.insert(key, person);
        key
    }

    pub fn entity(&self, kind: EntityKind, key: Uuid) -> Option<&RegistryEntity> {
        self.table(kind).get(&key)
    }

    pub fn institution(&self, key: Uuid) -> Option<&RegistryEntity> {
        self.institutions.get(&key)
    }

    pub fn collection(&self, key: Uuid) -> Option<&RegistryEntity> {
        self.collections.get(&key)
    }

    pub fn person(&self, key: Uuid) -> Option<&Person> {
        self.persons.get(&key)
    }

    pub fn institutions(&self) -> impl Iterator<Item = &RegistryEntity> {
        self.institutions.values()
    }

    pub fn collections(&self) -> impl Iterator<Item = &RegistryEntity> {
        self.collections.values()
    }

    pub fn persons(&self) -> impl Iterator<Item = &Person> {
        self.persons.values()
    }

    pub(crate) fn table(&self, kind: EntityKind) -> &BTreeMap<Uuid, RegistryEntity> {
        match kind {
            EntityKind::Institution => &self.institutions,
            EntityKind::Collection => &self.collections,
        }
    }

    pub(crate) fn table_mut(&mut self, kind: EntityKind) -> &mut BTreeMap<Uuid, RegistryEntity> {
        match kind {
            EntityKind::Institution => &mut self.institutions,
            EntityKind::Collection => &mut self.collections,
        }
    }
}
