use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::table::Table;
use super::unit_of_work::{ChangeLog, SharedSession};
use crate::database::Session;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    Added,
    Modified,
    Deleted,
}

/// Handle to a staged entity. After `save_changes` it holds the stored row,
/// including generated keys and audit stamps.
#[derive(Debug)]
pub struct Tracked<E>(Arc<Mutex<E>>);

impl<E> Clone for Tracked<E> {
    fn clone(&self) -> Self {
        Tracked(self.0.clone())
    }
}

impl<E: Clone> Tracked<E> {
    fn new(entity: E) -> Self {
        Tracked(Arc::new(Mutex::new(entity)))
    }

    pub fn get(&self) -> E {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set(&self, entity: E) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = entity;
    }
}

#[async_trait]
pub(crate) trait PendingChange: Send {
    fn stamp(&mut self, now: DateTime<Utc>, actor: Option<&str>);
    async fn apply(&mut self, session: &mut Session) -> Result<()>;
}

struct Staged<E: Table> {
    state: EntityState,
    entity: E,
    tracked: Tracked<E>,
}

#[async_trait]
impl<E: Table> PendingChange for Staged<E> {
    fn stamp(&mut self, now: DateTime<Utc>, actor: Option<&str>) {
        let audit = self.entity.audit_mut();
        match self.state {
            EntityState::Added => audit.stamp_created(now, actor),
            EntityState::Modified => audit.stamp_updated(now, actor),
            EntityState::Deleted => audit.stamp_deleted(now, actor),
        }
    }

    async fn apply(&mut self, session: &mut Session) -> Result<()> {
        let saved = match self.state {
            EntityState::Added => session.insert(&self.entity).await?,
            EntityState::Modified | EntityState::Deleted => session.update(&self.entity).await?,
        };
        self.tracked.set(saved);
        Ok(())
    }
}

/// Data access for one entity type. Reads go straight to the store and never
/// return soft-deleted rows unless asked; writes are staged until the owning
/// unit of work saves.
pub struct Repository<E: Table> {
    session: SharedSession,
    changes: ChangeLog,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Table> Repository<E> {
    pub(crate) fn new(session: SharedSession, changes: ChangeLog) -> Self {
        Self {
            session,
            changes,
            _entity: PhantomData,
        }
    }

    pub async fn get_by_id(&self, id: E::Key) -> Result<Option<E>> {
        self.session.lock().await.load_one::<E>(id, false).await
    }

    pub async fn get_by_id_including_deleted(&self, id: E::Key) -> Result<Option<E>> {
        self.session.lock().await.load_one::<E>(id, true).await
    }

    pub async fn get_all(&self) -> Result<Vec<E>> {
        self.session.lock().await.load::<E>(false).await
    }

    pub async fn get_all_including_deleted(&self) -> Result<Vec<E>> {
        self.session.lock().await.load::<E>(true).await
    }

    pub async fn find<P>(&self, predicate: P) -> Result<Vec<E>>
    where
        P: Fn(&E) -> bool + Send,
    {
        let rows = self.get_all().await?;
        Ok(rows.into_iter().filter(|row| predicate(row)).collect())
    }

    /// `None` for no match, an error when more than one row matches.
    pub async fn single_or_default<P>(&self, predicate: P) -> Result<Option<E>>
    where
        P: Fn(&E) -> bool + Send,
    {
        let mut rows = self.find(predicate).await?;
        match rows.len() {
            0 | 1 => Ok(rows.pop()),
            n => Err(Error::Internal(format!(
                "Expected at most one {} but {} matched",
                E::NAME,
                n
            ))),
        }
    }

    pub async fn any<P>(&self, predicate: P) -> Result<bool>
    where
        P: Fn(&E) -> bool + Send,
    {
        Ok(!self.find(predicate).await?.is_empty())
    }

    pub async fn count<P>(&self, predicate: P) -> Result<usize>
    where
        P: Fn(&E) -> bool + Send,
    {
        Ok(self.find(predicate).await?.len())
    }

    pub fn add(&self, entity: E) -> Tracked<E> {
        self.stage(EntityState::Added, entity)
    }

    pub fn add_range(&self, entities: impl IntoIterator<Item = E>) -> Vec<Tracked<E>> {
        entities.into_iter().map(|entity| self.add(entity)).collect()
    }

    pub fn update(&self, entity: E) -> Tracked<E> {
        self.stage(EntityState::Modified, entity)
    }

    /// Soft delete: the row is flagged and stamped, never removed.
    pub fn delete(&self, mut entity: E) -> Tracked<E> {
        entity.audit_mut().is_deleted = true;
        self.stage(EntityState::Deleted, entity)
    }

    pub fn delete_range(&self, entities: impl IntoIterator<Item = E>) -> Vec<Tracked<E>> {
        entities
            .into_iter()
            .map(|entity| self.delete(entity))
            .collect()
    }

    fn stage(&self, state: EntityState, entity: E) -> Tracked<E> {
        let tracked = Tracked::new(entity.clone());
        let change = Staged {
            state,
            entity,
            tracked: tracked.clone(),
        };
        self.changes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(change));
        tracked
    }
}
