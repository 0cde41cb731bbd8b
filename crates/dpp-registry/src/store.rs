//! # Passport Repository
//!
//! [`PassportRepository`] is the seam between the services and storage.
//! Services receive an `Arc<dyn PassportRepository>`; there is no global
//! collection.
//!
//! [`InMemoryPassportStore`] keeps records behind a `parking_lot::RwLock`.
//! The lock is synchronous and never held across an `.await`. Reads clone a
//! snapshot under the read lock; every mutation goes through
//! [`PassportRepository::try_update`], which runs read-validate-mutate under a
//! single write lock so that concurrent anchor and update calls on one
//! passport cannot lose each other's changes.

use std::collections::HashMap;
use std::sync::Arc;

use dpp_core::{Passport, PassportId};
use parking_lot::RwLock;

use crate::error::RegistryError;

/// Mutation callback for [`PassportRepository::try_update`].
pub type PassportMutation<'a> = &'a mut dyn FnMut(&mut Passport) -> Result<(), RegistryError>;

/// Storage for passport records.
pub trait PassportRepository: Send + Sync + std::fmt::Debug {
    /// Clone of the record under `id`.
    fn get(&self, id: &PassportId) -> Option<Passport>;

    /// All records in insertion order.
    fn list(&self) -> Vec<Passport>;

    /// Store a new record. Fails with [`RegistryError::Duplicate`] when the
    /// id is taken.
    fn insert(&self, passport: Passport) -> Result<(), RegistryError>;

    /// Atomically read-validate-mutate the record under `id`.
    ///
    /// `f` runs on a working copy while the write lock is held. The copy
    /// replaces the stored record only when `f` returns `Ok`, so a rejected
    /// mutation leaves the record untouched. Returns the committed record.
    fn try_update(
        &self,
        id: &PassportId,
        f: PassportMutation<'_>,
    ) -> Result<Passport, RegistryError>;

    /// Undo a committed write. If the record under `committed.id` still
    /// equals `committed`, it is replaced by `previous`, or removed when
    /// `previous` is `None`. Returns whether anything changed; a record that
    /// has moved on since is left alone.
    fn revert(&self, committed: &Passport, previous: Option<Passport>) -> bool;

    /// Number of records.
    fn len(&self) -> usize;

    /// Whether the repository is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
struct Inner {
    by_id: HashMap<PassportId, Passport>,
    order: Vec<PassportId>,
}

/// Thread-safe, cloneable in-memory repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPassportStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryPassportStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PassportRepository for InMemoryPassportStore {
    fn get(&self, id: &PassportId) -> Option<Passport> {
        self.inner.read().by_id.get(id).cloned()
    }

    fn list(&self) -> Vec<Passport> {
        let guard = self.inner.read();
        guard
            .order
            .iter()
            .filter_map(|id| guard.by_id.get(id).cloned())
            .collect()
    }

    fn insert(&self, passport: Passport) -> Result<(), RegistryError> {
        let mut guard = self.inner.write();
        if guard.by_id.contains_key(&passport.id) {
            return Err(RegistryError::Duplicate(passport.id));
        }
        guard.order.push(passport.id.clone());
        guard.by_id.insert(passport.id.clone(), passport);
        Ok(())
    }

    fn try_update(
        &self,
        id: &PassportId,
        f: PassportMutation<'_>,
    ) -> Result<Passport, RegistryError> {
        let mut guard = self.inner.write();
        let stored = guard
            .by_id
            .get_mut(id)
            .ok_or_else(|| RegistryError::passport_not_found(id))?;
        let mut working = stored.clone();
        f(&mut working)?;
        *stored = working.clone();
        Ok(working)
    }

    fn revert(&self, committed: &Passport, previous: Option<Passport>) -> bool {
        let mut guard = self.inner.write();
        if guard.by_id.get(&committed.id) != Some(committed) {
            return false;
        }
        match previous {
            Some(p) => {
                guard.by_id.insert(committed.id.clone(), p);
            }
            None => {
                guard.by_id.remove(&committed.id);
                guard.order.retain(|id| id != &committed.id);
            }
        }
        true
    }

    fn len(&self) -> usize {
        self.inner.read().by_id.len()
    }
}
