use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::entity::{AuditFields, Entity};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub display_order: i32,
    pub is_active: bool,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: AuditFields,
}

impl Default for Category {
    fn default() -> Self {
        Self {
            id: 0,
            name: String::new(),
            description: None,
            display_order: 0,
            is_active: true,
            audit: AuditFields::default(),
        }
    }
}

impl Category {
    /// `term` must already be lowercase.
    pub fn matches_term(&self, term: &str) -> bool {
        self.name.to_lowercase().contains(term)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(term))
    }
}

impl Entity for Category {
    type Key = i64;
    const NAME: &'static str = "Category";

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn audit(&self) -> &AuditFields {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut AuditFields {
        &mut self.audit
    }
}
