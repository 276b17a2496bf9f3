use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::entity::{AuditFields, Entity};

/// Stock at or below this level counts as low.
pub const LOW_STOCK_THRESHOLD: i32 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub sale_price: Option<Decimal>,
    pub stock_quantity: i32,
    pub sku: Option<String>,
    pub is_active: bool,
    pub is_featured: bool,
    pub category_id: i64,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub audit: AuditFields,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    OutOfStock,
    LowStock,
    InStock,
}

impl Default for Product {
    fn default() -> Self {
        Self {
            id: 0,
            name: String::new(),
            description: None,
            price: Decimal::ZERO,
            sale_price: None,
            stock_quantity: 0,
            sku: None,
            is_active: true,
            is_featured: false,
            category_id: 0,
            audit: AuditFields::default(),
        }
    }
}

impl Product {
    pub fn effective_price(&self) -> Decimal {
        self.sale_price.unwrap_or(self.price)
    }

    pub fn is_on_sale(&self) -> bool {
        matches!(self.sale_price, Some(sale) if sale < self.price)
    }

    /// Discount relative to the regular price, rounded to two places.
    pub fn discount_percentage(&self) -> Option<Decimal> {
        let sale = self.sale_price.filter(|_| self.is_on_sale())?;
        if self.price.is_zero() {
            return None;
        }
        Some(((Decimal::ONE - sale / self.price) * Decimal::ONE_HUNDRED).round_dp(2))
    }

    pub fn stock_status(&self) -> StockStatus {
        match self.stock_quantity {
            q if q <= 0 => StockStatus::OutOfStock,
            q if q <= LOW_STOCK_THRESHOLD => StockStatus::LowStock,
            _ => StockStatus::InStock,
        }
    }

    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity > 0 && self.stock_quantity <= LOW_STOCK_THRESHOLD
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.stock_quantity <= 0
    }

    /// Case-insensitive substring match on name, description and SKU.
    /// `term` must already be lowercase.
    pub fn matches_term(&self, term: &str) -> bool {
        self.name.to_lowercase().contains(term)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(term))
            || self
                .sku
                .as_deref()
                .is_some_and(|s| s.to_lowercase().contains(term))
    }
}

impl Entity for Product {
    type Key = i64;
    const NAME: &'static str = "Product";

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

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(raw: &str) -> Decimal {
        raw.parse().unwrap()
    }

    fn product(price: Decimal, sale: Option<Decimal>, stock: i32) -> Product {
        Product {
            price,
            sale_price: sale,
            stock_quantity: stock,
            ..Product::default()
        }
    }

    #[test]
    fn pricing_derivations() {
        let p = product(dec("100.00"), Some(dec("75.00")), 10);
        assert_eq!(p.effective_price(), dec("75.00"));
        assert!(p.is_on_sale());
        assert_eq!(p.discount_percentage(), Some(dec("25")));

        let regular = product(dec("19.99"), None, 10);
        assert_eq!(regular.effective_price(), dec("19.99"));
        assert!(!regular.is_on_sale());
        assert_eq!(regular.discount_percentage(), None);
    }

    #[test]
    fn discount_rounds_to_two_places() {
        let p = product(dec("3.00"), Some(dec("2.00")), 1);
        assert_eq!(p.discount_percentage(), Some(dec("33.33")));
    }

    #[test]
    fn stock_status_thresholds() {
        assert_eq!(product(dec("1"), None, 0).stock_status(), StockStatus::OutOfStock);
        assert_eq!(product(dec("1"), None, 5).stock_status(), StockStatus::LowStock);
        assert_eq!(product(dec("1"), None, 6).stock_status(), StockStatus::InStock);
        assert!(product(dec("1"), None, 1).is_low_stock());
        assert!(!product(dec("1"), None, 0).is_low_stock());
        assert!(product(dec("1"), None, 0).is_out_of_stock());
    }

    #[test]
    fn term_matching_covers_sku_and_description() {
        let p = Product {
            name: "Laptop Pro".into(),
            description: Some("Fast machine".into()),
            sku: Some("LP-001".into()),
            ..Product::default()
        };
        assert!(p.matches_term("laptop"));
        assert!(p.matches_term("machine"));
        assert!(p.matches_term("lp-0"));
        assert!(!p.matches_term("phone"));
    }
}
