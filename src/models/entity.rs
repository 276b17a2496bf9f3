use std::fmt::{Debug, Display};
use std::hash::Hash;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, FromRow, Postgres};
use uuid::Uuid;

/// Audit and soft-delete columns shared by every table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AuditFields {
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
}

impl Default for AuditFields {
    fn default() -> Self {
        Self {
            created_at: Utc::now(),
            updated_at: None,
            created_by: None,
            updated_by: None,
            is_deleted: false,
            deleted_at: None,
            deleted_by: None,
        }
    }
}

impl AuditFields {
    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.created_at)
    }

    pub fn last_modified_by(&self) -> Option<&str> {
        self.updated_by.as_deref().or(self.created_by.as_deref())
    }

    pub(crate) fn stamp_created(&mut self, now: DateTime<Utc>, actor: Option<&str>) {
        self.created_at = now;
        self.created_by = actor.map(str::to_string);
    }

    pub(crate) fn stamp_updated(&mut self, now: DateTime<Utc>, actor: Option<&str>) {
        self.updated_at = Some(now);
        self.updated_by = actor.map(str::to_string);
    }

    pub(crate) fn stamp_deleted(&mut self, now: DateTime<Utc>, actor: Option<&str>) {
        self.is_deleted = true;
        self.deleted_at = Some(now);
        self.deleted_by = actor.map(str::to_string);
        self.stamp_updated(now, actor);
    }
}

/// Primary key of an entity: database sequences for catalogue tables,
/// client generated UUIDs for users.
pub trait EntityKey:
    Copy
    + Eq
    + Ord
    + Hash
    + Debug
    + Display
    + Send
    + Sync
    + Unpin
    + 'static
    + for<'q> sqlx::Encode<'q, Postgres>
    + sqlx::Type<Postgres>
{
    fn is_unset(&self) -> bool;

    /// Produces the next key for stores without their own sequence.
    fn generate(sequence: &mut i64) -> Self;
}

impl EntityKey for i64 {
    fn is_unset(&self) -> bool {
        *self <= 0
    }

    fn generate(sequence: &mut i64) -> Self {
        *sequence += 1;
        *sequence
    }
}

impl EntityKey for Uuid {
    fn is_unset(&self) -> bool {
        self.is_nil()
    }

    fn generate(_sequence: &mut i64) -> Self {
        Uuid::new_v4()
    }
}

pub trait Entity:
    Clone + Debug + Send + Sync + Unpin + 'static + for<'r> FromRow<'r, PgRow>
{
    type Key: EntityKey;

    /// Name used in error messages, e.g. `Entity 'Product' with key '3' was not found`.
    const NAME: &'static str;

    fn id(&self) -> Self::Key;
    fn set_id(&mut self, id: Self::Key);
    fn audit(&self) -> &AuditFields;
    fn audit_mut(&mut self) -> &mut AuditFields;

    fn is_deleted(&self) -> bool {
        self.audit().is_deleted
    }
}
