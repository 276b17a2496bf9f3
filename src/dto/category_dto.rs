use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::Category;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CategoryDto {
    #[serde(default)]
    pub id: i64,
    #[validate(length(min = 1, max = 100, message = "Category name is required (max 100 characters)"))]
    pub name: String,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub product_count: Option<usize>,
    #[serde(default, skip_deserializing)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_deserializing)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&Category> for CategoryDto {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id,
            name: category.name.clone(),
            description: category.description.clone(),
            display_order: category.display_order,
            is_active: category.is_active,
            product_count: None,
            created_at: Some(category.audit.created_at),
            updated_at: category.audit.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryOrder {
    pub id: i64,
    pub display_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReorderCategoriesPayload {
    pub orders: Vec<CategoryOrder>,
}
