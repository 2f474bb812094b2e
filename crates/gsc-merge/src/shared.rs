use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use uuid::Uuid;

use crate::{CollectionParent, ConversionReport, MergeError, MergeReport, Registry};

/// Cloneable handle to a registry shared between threads.
///
/// A merge holds the write lock for its whole duration, so readers see the
/// registry either before or after it, never in between.
#[derive(Clone, Debug, Default)]
pub struct SharedRegistry {
    inner: Arc<RwLock<Registry>>,
}

impl SharedRegistry {
    pub fn new(registry: Registry) -> Self {
        Self {
            inner: Arc::new(RwLock::new(registry)),
        }
    }

    /// Run `f` against a consistent view of the registry.
    pub fn read<R>(&self, f: impl FnOnce(&Registry) -> R) -> R {
        f(&self.read_guard())
    }

    pub fn snapshot(&self) -> Registry {
        self.read_guard().clone()
    }

    pub fn merge_institutions(
        &self,
        to_replace: Uuid,
        replacement: Uuid,
        performed_by: &str,
    ) -> Result<MergeReport, MergeError> {
        self.write_guard()
            .merge_institutions(to_replace, replacement, performed_by)
    }

    pub fn merge_collections(
        &self,
        to_replace: Uuid,
        replacement: Uuid,
        performed_by: &str,
    ) -> Result<MergeReport, MergeError> {
        self.write_guard()
            .merge_collections(to_replace, replacement, performed_by)
    }

    pub fn convert_to_collection(
        &self,
        institution: Uuid,
        parent: CollectionParent,
        performed_by: &str,
    ) -> Result<ConversionReport, MergeError> {
        self.write_guard()
            .convert_to_collection(institution, parent, performed_by)
    }

    // Merges stage on copies and commit with plain inserts, so a panic
    // elsewhere cannot leave a half-applied merge behind the lock.
    fn read_guard(&self) -> RwLockReadGuard<'_, Registry> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, Registry> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
