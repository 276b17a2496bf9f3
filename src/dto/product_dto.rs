use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{Product, StockStatus};

fn default_true() -> bool {
    true
}

/// Product as exchanged with clients. Derived pricing and stock fields are
/// output only.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProductDto {
    #[serde(default)]
    pub id: i64,
    #[validate(length(min = 1, max = 200, message = "Product name is required (max 200 characters)"))]
    pub name: String,
    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,
    pub price: Decimal,
    pub sale_price: Option<Decimal>,
    #[serde(default)]
    pub stock_quantity: i32,
    #[validate(length(max = 50, message = "SKU must be at most 50 characters"))]
    pub sku: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
    pub category_id: i64,
    #[serde(default, skip_deserializing)]
    pub category_name: Option<String>,
    #[serde(default, skip_deserializing)]
    pub effective_price: Decimal,
    #[serde(default, skip_deserializing)]
    pub is_on_sale: bool,
    #[serde(default, skip_deserializing)]
    pub discount_percentage: Option<Decimal>,
    #[serde(default, skip_deserializing)]
    pub stock_status: Option<StockStatus>,
    #[serde(default, skip_deserializing)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_deserializing)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProductDto {
    /// Input DTO with defaults for everything but the required fields.
    pub fn new(name: impl Into<String>, price: Decimal, category_id: i64) -> Self {
        Self {
            id: 0,
            name: name.into(),
            description: None,
            price,
            sale_price: None,
            stock_quantity: 0,
            sku: None,
            is_active: true,
            is_featured: false,
            category_id,
            category_name: None,
            effective_price: price,
            is_on_sale: false,
            discount_percentage: None,
            stock_status: None,
            created_at: None,
            updated_at: None,
        }
    }
}

impl From<&Product> for ProductDto {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
            sale_price: product.sale_price,
            stock_quantity: product.stock_quantity,
            sku: product.sku.clone(),
            is_active: product.is_active,
            is_featured: product.is_featured,
            category_id: product.category_id,
            category_name: None,
            effective_price: product.effective_price(),
            is_on_sale: product.is_on_sale(),
            discount_percentage: product.discount_percentage(),
            stock_status: Some(product.stock_status()),
            created_at: Some(product.audit.created_at),
            updated_at: product.audit.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateStockPayload {
    #[validate(range(min = 0, message = "Stock quantity cannot be negative"))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BulkStatusPayload {
    pub ids: Vec<i64>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductSort {
    #[default]
    Name,
    Price,
    Stock,
    Category,
    Created,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductListQuery {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
    pub category_id: Option<i64>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    pub search: Option<String>,
    pub sort_by: Option<ProductSort>,
    pub sort_desc: bool,
}
