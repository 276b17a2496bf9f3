use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::entity::{AuditFields, Entity};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub user_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: AuditFields,
}

impl Default for User {
    fn default() -> Self {
        Self {
            id: Uuid::nil(),
            email: String::new(),
            user_name: String::new(),
            password_hash: String::new(),
            first_name: None,
            last_name: None,
            last_login_at: None,
            is_active: true,
            audit: AuditFields::default(),
        }
    }
}

impl User {
    pub fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default()
        )
        .trim()
        .to_string()
    }

    /// Full name, falling back to the user name and then the email.
    pub fn display_name(&self) -> String {
        let full_name = self.full_name();
        if !full_name.is_empty() {
            full_name
        } else if !self.user_name.is_empty() {
            self.user_name.clone()
        } else {
            self.email.clone()
        }
    }

    /// `term` must already be lowercase.
    pub fn matches_term(&self, term: &str) -> bool {
        [self.first_name.as_deref(), self.last_name.as_deref(), Some(self.email.as_str())]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(term))
    }
}

impl Entity for User {
    type Key = Uuid;
    const NAME: &'static str = "User";

    fn id(&self) -> Uuid {
        self.id
    }

    fn set_id(&mut self, id: Uuid) {
        self.id = id;
    }

    fn audit(&self) -> &AuditFields {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut AuditFields {
        &mut self.audit
    }
}
