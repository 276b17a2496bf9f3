use sqlx::{PgPool, Postgres, Transaction};

use super::memory::{MemoryDatabase, MemoryTransaction};
use super::Database;
use crate::error::{Error, Result};
use crate::repositories::table::Table;

/// One logical connection to the store. Owns the open transaction, if any;
/// dropping a session with an open transaction rolls it back.
pub enum Session {
    Postgres {
        pool: PgPool,
        tx: Option<Transaction<'static, Postgres>>,
    },
    Memory {
        db: MemoryDatabase,
        tx: Option<MemoryTransaction>,
    },
}

impl Session {
    pub fn new(database: &Database) -> Self {
        match database {
            Database::Postgres(pool) => Session::Postgres {
                pool: pool.clone(),
                tx: None,
            },
            Database::Memory(db) => Session::Memory {
                db: db.clone(),
                tx: None,
            },
        }
    }

    pub fn in_transaction(&self) -> bool {
        match self {
            Session::Postgres { tx, .. } => tx.is_some(),
            Session::Memory { tx, .. } => tx.is_some(),
        }
    }

    pub async fn begin(&mut self) -> Result<()> {
        if self.in_transaction() {
            return Ok(());
        }
        match self {
            Session::Postgres { pool, tx } => *tx = Some(pool.begin().await?),
            Session::Memory { db, tx } => *tx = Some(MemoryTransaction::begin(db).await),
        }
        Ok(())
    }

    pub async fn commit(&mut self) -> Result<()> {
        match self {
            Session::Postgres { tx, .. } => {
                if let Some(open) = tx.take() {
                    open.commit().await?;
                }
            }
            Session::Memory { tx, .. } => {
                if let Some(open) = tx.take() {
                    open.commit();
                }
            }
        }
        Ok(())
    }

    pub async fn rollback(&mut self) -> Result<()> {
        match self {
            Session::Postgres { tx, .. } => {
                if let Some(open) = tx.take() {
                    open.rollback().await?;
                }
            }
            Session::Memory { tx, .. } => {
                tx.take();
            }
        }
        Ok(())
    }

    pub async fn load<E: Table>(&mut self, include_deleted: bool) -> Result<Vec<E>> {
        match self {
            Session::Postgres { tx: Some(tx), .. } => E::select_all(&mut **tx, include_deleted).await,
            Session::Postgres { pool, tx: None } => {
                let mut conn = pool.acquire().await?;
                E::select_all(&mut conn, include_deleted).await
            }
            Session::Memory { tx: Some(tx), .. } => Ok(E::memory(tx.tables()).rows(include_deleted)),
            Session::Memory { db, tx: None } => Ok(E::memory(&*db.lock().await).rows(include_deleted)),
        }
    }

    pub async fn load_one<E: Table>(
        &mut self,
        id: E::Key,
        include_deleted: bool,
    ) -> Result<Option<E>> {
        match self {
            Session::Postgres { tx: Some(tx), .. } => {
                E::select_one(&mut **tx, id, include_deleted).await
            }
            Session::Postgres { pool, tx: None } => {
                let mut conn = pool.acquire().await?;
                E::select_one(&mut conn, id, include_deleted).await
            }
            Session::Memory { tx: Some(tx), .. } => {
                Ok(E::memory(tx.tables()).get(&id, include_deleted))
            }
            Session::Memory { db, tx: None } => {
                Ok(E::memory(&*db.lock().await).get(&id, include_deleted))
            }
        }
    }

    pub async fn insert<E: Table>(&mut self, row: &E) -> Result<E> {
        match self {
            Session::Postgres { tx: Some(tx), .. } => E::insert_row(&mut **tx, row).await,
            Session::Postgres { pool, tx: None } => {
                let mut conn = pool.acquire().await?;
                E::insert_row(&mut conn, row).await
            }
            Session::Memory { tx: Some(tx), .. } => E::memory_insert(tx.tables_mut(), row),
            Session::Memory { db, tx: None } => E::memory_insert(&mut *db.lock().await, row),
        }
    }

    /// Fails with [`Error::Conflict`] when the row no longer exists.
    pub async fn update<E: Table>(&mut self, row: &E) -> Result<E> {
        let saved = match self {
            Session::Postgres { tx: Some(tx), .. } => E::update_row(&mut **tx, row).await?,
            Session::Postgres { pool, tx: None } => {
                let mut conn = pool.acquire().await?;
                E::update_row(&mut conn, row).await?
            }
            Session::Memory { tx: Some(tx), .. } => Some(E::memory_update(tx.tables_mut(), row)?),
            Session::Memory { db, tx: None } => Some(E::memory_update(&mut *db.lock().await, row)?),
        };
        saved.ok_or_else(|| {
            Error::Conflict(format!("{} with key {} no longer exists", E::NAME, row.id()))
        })
    }

    pub async fn execute_sql(&mut self, sql: &str) -> Result<u64> {
        let result = match self {
            Session::Postgres { tx: Some(tx), .. } => sqlx::query(sql).execute(&mut **tx).await?,
            Session::Postgres { pool, tx: None } => sqlx::query(sql).execute(&*pool).await?,
            Session::Memory { .. } => {
                return Err(Error::Internal(
                    "Raw SQL is not supported by the in-memory store".to_string(),
                ))
            }
        };
        Ok(result.rows_affected())
    }

    pub async fn ping(&mut self) -> Result<()> {
        match self {
            Session::Postgres { pool, .. } => {
                sqlx::query("SELECT 1").execute(&*pool).await?;
            }
            Session::Memory { db, tx } => {
                if tx.is_none() {
                    drop(db.lock().await);
                }
            }
        }
        Ok(())
    }
}
