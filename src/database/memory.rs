//! Process-local store used for development and tests. It mirrors the
//! Postgres schema rules (check constraints, unique indexes, foreign keys)
//! closely enough that services behave identically on both backends.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, OwnedMutexGuard};

use crate::error::{Error, Result};
use crate::models::{Category, Entity, EntityKey, Product, User};

#[derive(Debug, Clone)]
pub struct MemoryTable<E: Entity> {
    rows: BTreeMap<E::Key, E>,
    sequence: i64,
}

impl<E: Entity> Default for MemoryTable<E> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            sequence: 0,
        }
    }
}

impl<E: Entity> MemoryTable<E> {
    /// Rows ordered by key.
    pub fn rows(&self, include_deleted: bool) -> Vec<E> {
        self.live(include_deleted).cloned().collect()
    }

    pub fn get(&self, id: &E::Key, include_deleted: bool) -> Option<E> {
        self.rows
            .get(id)
            .filter(|row| include_deleted || !row.is_deleted())
            .cloned()
    }

    pub fn live(&self, include_deleted: bool) -> impl Iterator<Item = &E> + '_ {
        self.rows
            .values()
            .filter(move |row| include_deleted || !row.is_deleted())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub(crate) fn insert(&mut self, mut row: E) -> Result<E> {
        if row.id().is_unset() {
            row.set_id(E::Key::generate(&mut self.sequence));
        }
        let id = row.id();
        if self.rows.contains_key(&id) {
            return Err(Error::Constraint(format!(
                "duplicate key value {} for {}",
                id,
                E::NAME
            )));
        }
        self.rows.insert(id, row.clone());
        Ok(row)
    }

    /// Replaces a stored row. Creation audit fields are never overwritten.
    pub(crate) fn replace(&mut self, mut row: E) -> Result<E> {
        let id = row.id();
        let Some(existing) = self.rows.get(&id) else {
            return Err(Error::Conflict(format!(
                "{} with key {} no longer exists",
                E::NAME,
                id
            )));
        };
        let created_at = existing.audit().created_at;
        let created_by = existing.audit().created_by.clone();
        let audit = row.audit_mut();
        audit.created_at = created_at;
        audit.created_by = created_by;
        self.rows.insert(id, row.clone());
        Ok(row)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryTables {
    pub categories: MemoryTable<Category>,
    pub products: MemoryTable<Product>,
    pub users: MemoryTable<User>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    tables: Arc<Mutex<MemoryTables>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self) -> MutexGuard<'_, MemoryTables> {
        self.tables.lock().await
    }

    /// Exclusive access for the lifetime of a transaction.
    pub(crate) async fn lock_owned(&self) -> OwnedMutexGuard<MemoryTables> {
        self.tables.clone().lock_owned().await
    }
}

/// An open transaction on the memory store. Writers hold the store lock
/// until commit; dropping without commit restores the snapshot.
pub struct MemoryTransaction {
    tables: OwnedMutexGuard<MemoryTables>,
    snapshot: Option<MemoryTables>,
}

impl MemoryTransaction {
    pub(crate) async fn begin(db: &MemoryDatabase) -> Self {
        let tables = db.lock_owned().await;
        let snapshot = Some(tables.clone());
        Self { tables, snapshot }
    }

    pub(crate) fn tables(&self) -> &MemoryTables {
        &self.tables
    }

    pub(crate) fn tables_mut(&mut self) -> &mut MemoryTables {
        &mut self.tables
    }

    pub(crate) fn commit(mut self) {
        self.snapshot = None;
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.tables = snapshot;
        }
    }
}
