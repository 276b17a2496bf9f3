use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use super::repository::{PendingChange, Repository};
use super::table::Table;
use crate::database::{Database, Session};
use crate::error::Result;
use crate::models::{Category, Product, User};
use crate::utils::time::{Clock, SystemClock};

pub(crate) type SharedSession = Arc<tokio::sync::Mutex<Session>>;
pub(crate) type ChangeLog = Arc<Mutex<Vec<Box<dyn PendingChange>>>>;

/// Scope of one business operation: hands out one repository per entity
/// type, stamps audit fields and owns the transaction boundary.
pub struct UnitOfWork {
    session: SharedSession,
    changes: ChangeLog,
    repositories: Mutex<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
    clock: Arc<dyn Clock>,
    actor: Option<String>,
}

impl UnitOfWork {
    pub fn new(database: &Database) -> Self {
        Self::with_clock(database, Arc::new(SystemClock))
    }

    pub fn with_clock(database: &Database, clock: Arc<dyn Clock>) -> Self {
        Self {
            session: Arc::new(tokio::sync::Mutex::new(database.session())),
            changes: Arc::new(Mutex::new(Vec::new())),
            repositories: Mutex::new(HashMap::new()),
            clock,
            actor: None,
        }
    }

    /// Identity recorded in `created_by`/`updated_by`/`deleted_by`.
    pub fn with_actor(mut self, actor: Option<String>) -> Self {
        self.actor = actor;
        self
    }

    pub fn actor(&self) -> Option<&str> {
        self.actor.as_deref()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Repositories are created on first use and reused for the rest of
    /// the scope.
    pub fn repository<E: Table>(&self) -> Arc<Repository<E>> {
        let mut repositories = self
            .repositories
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let entry = repositories
            .entry(TypeId::of::<E>())
            .or_insert_with(|| {
                let repository: Arc<dyn Any + Send + Sync> = Arc::new(Repository::<E>::new(
                    self.session.clone(),
                    self.changes.clone(),
                ));
                repository
            })
            .clone();
        drop(repositories);

        match entry.downcast::<Repository<E>>() {
            Ok(repository) => repository,
            // The map is keyed by TypeId so the entry always has this type.
            Err(_) => Arc::new(Repository::new(self.session.clone(), self.changes.clone())),
        }
    }

    pub fn categories(&self) -> Arc<Repository<Category>> {
        self.repository()
    }

    pub fn products(&self) -> Arc<Repository<Product>> {
        self.repository()
    }

    pub fn users(&self) -> Arc<Repository<User>> {
        self.repository()
    }

    pub fn has_changes(&self) -> bool {
        !self
            .changes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    /// Stamps audit fields and writes every staged change in order, inside
    /// the open transaction or an implicit one. Returns the rows written.
    pub async fn save_changes(&self) -> Result<usize> {
        let mut pending: Vec<Box<dyn PendingChange>> = std::mem::take(
            &mut *self.changes.lock().unwrap_or_else(PoisonError::into_inner),
        );
        if pending.is_empty() {
            return Ok(0);
        }

        let now = self.clock.now();
        let mut session = self.session.lock().await;
        let implicit = !session.in_transaction();
        if implicit {
            session.begin().await?;
        }

        for change in pending.iter_mut() {
            change.stamp(now, self.actor.as_deref());
            if let Err(err) = change.apply(&mut session).await {
                if implicit {
                    session.rollback().await?;
                }
                return Err(err);
            }
        }

        if implicit {
            session.commit().await?;
        }
        debug!(rows = pending.len(), "Saved changes");
        Ok(pending.len())
    }

    /// No-op when a transaction is already open.
    pub async fn begin_transaction(&self) -> Result<()> {
        self.session.lock().await.begin().await
    }

    /// Saves pending changes and commits. Any failure rolls the transaction
    /// back before the error is returned.
    pub async fn commit_transaction(&self) -> Result<()> {
        let outcome = match self.save_changes().await {
            Ok(_) => self.session.lock().await.commit().await,
            Err(err) => Err(err),
        };
        if let Err(err) = outcome {
            if let Err(rollback_err) = self.rollback_transaction().await {
                warn!(error = ?rollback_err, "Rollback after failed commit also failed");
            }
            return Err(err);
        }
        Ok(())
    }

    pub async fn rollback_transaction(&self) -> Result<()> {
        self.changes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.session.lock().await.rollback().await
    }

    pub async fn has_active_transaction(&self) -> bool {
        self.session.lock().await.in_transaction()
    }

    pub async fn execute_sql(&self, sql: &str) -> Result<u64> {
        self.session.lock().await.execute_sql(sql).await
    }

    pub async fn ping(&self) -> Result<()> {
        self.session.lock().await.ping().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::utils::time::MockClock;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    fn fixed_clock(times: Vec<chrono::DateTime<Utc>>) -> Arc<dyn Clock> {
        let mut clock = MockClock::new();
        let mut seq = times.into_iter();
        clock
            .expect_now()
            .returning(move || seq.next().unwrap_or_else(Utc::now));
        Arc::new(clock)
    }

    async fn seed_category(uow: &UnitOfWork, name: &str) -> Category {
        let tracked = uow.categories().add(Category {
            name: name.into(),
            ..Category::default()
        });
        uow.save_changes().await.unwrap();
        tracked.get()
    }

    #[tokio::test]
    async fn repositories_are_cached_per_type() {
        let uow = UnitOfWork::new(&Database::memory());
        let first = uow.products();
        let second = uow.products();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn save_stamps_creation_and_update_times() {
        let t1 = Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2025, 1, 2, 10, 0, 0).unwrap();
        let db = Database::memory();
        let uow = UnitOfWork::with_clock(&db, fixed_clock(vec![t1, t2]))
            .with_actor(Some("tester".into()));

        let created = seed_category(&uow, "Books").await;
        assert_eq!(created.id, 1);
        assert_eq!(created.audit.created_at, t1);
        assert_eq!(created.audit.created_by.as_deref(), Some("tester"));
        assert!(created.audit.updated_at.is_none());

        let mut changed = created.clone();
        changed.name = "Novels".into();
        changed.audit.created_at = Utc::now();
        let tracked = uow.categories().update(changed);
        uow.save_changes().await.unwrap();

        let updated = tracked.get();
        assert_eq!(updated.audit.created_at, t1);
        assert_eq!(updated.audit.updated_at, Some(t2));
        assert_eq!(updated.name, "Novels");
    }

    #[tokio::test]
    async fn soft_deleted_rows_leave_default_reads() {
        let db = Database::memory();
        let uow = UnitOfWork::new(&db);
        let category = seed_category(&uow, "Books").await;

        uow.categories().delete(category.clone());
        uow.save_changes().await.unwrap();

        assert!(uow.categories().get_by_id(category.id).await.unwrap().is_none());
        assert!(uow.categories().get_all().await.unwrap().is_empty());
        let hidden = uow
            .categories()
            .get_by_id_including_deleted(category.id)
            .await
            .unwrap()
            .unwrap();
        assert!(hidden.audit.is_deleted);
        assert!(hidden.audit.deleted_at.is_some());
    }

    #[tokio::test]
    async fn failed_save_writes_nothing() {
        let db = Database::memory();
        let uow = UnitOfWork::new(&db);
        let category = seed_category(&uow, "Books").await;

        uow.products().add(Product {
            name: "Valid".into(),
            price: Decimal::from(10),
            category_id: category.id,
            ..Product::default()
        });
        uow.products().add(Product {
            name: "Broken".into(),
            price: Decimal::from(10),
            category_id: 404,
            ..Product::default()
        });
        let err = uow.save_changes().await.unwrap_err();
        assert!(matches!(err, Error::Constraint(_)));
        assert!(uow.products().get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn explicit_transaction_commit_and_rollback() {
        let db = Database::memory();
        let uow = UnitOfWork::new(&db);

        uow.begin_transaction().await.unwrap();
        uow.begin_transaction().await.unwrap();
        assert!(uow.has_active_transaction().await);
        uow.categories().add(Category {
            name: "Temp".into(),
            ..Category::default()
        });
        uow.save_changes().await.unwrap();
        uow.rollback_transaction().await.unwrap();
        assert!(!uow.has_active_transaction().await);
        assert!(uow.categories().get_all().await.unwrap().is_empty());

        uow.begin_transaction().await.unwrap();
        uow.categories().add(Category {
            name: "Kept".into(),
            ..Category::default()
        });
        uow.commit_transaction().await.unwrap();
        assert_eq!(uow.categories().get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_of_vanished_row_conflicts() {
        let uow = UnitOfWork::new(&Database::memory());
        uow.categories().update(Category {
            id: 77,
            name: "Ghost".into(),
            ..Category::default()
        });
        assert!(matches!(
            uow.save_changes().await,
            Err(Error::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn single_or_default_rejects_multiple_matches() {
        let uow = UnitOfWork::new(&Database::memory());
        seed_category(&uow, "A").await;
        seed_category(&uow, "B").await;
        let none = uow
            .categories()
            .single_or_default(|c| c.name == "Z")
            .await
            .unwrap();
        assert!(none.is_none());
        assert!(uow.categories().single_or_default(|_| true).await.is_err());
    }
}
