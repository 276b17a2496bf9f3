use rust_decimal::Decimal;
use tracing::info;

use super::Database;
use crate::error::Result;
use crate::models::{Category, Product};
use crate::repositories::UnitOfWork;

const CATEGORIES: [(&str, &str, i32); 3] = [
    ("Electronics", "Electronic devices", 1),
    ("Clothing", "Fashion and apparel", 2),
    ("Books", "Books and publications", 3),
];

/// (name, category index, price in cents, sale price in cents, stock, sku, featured)
const PRODUCTS: [(&str, usize, i64, Option<i64>, i32, &str, bool); 5] = [
    ("Wireless Headphones", 0, 12999, Some(9999), 25, "EL-HP-001", true),
    ("USB-C Charger", 0, 2499, None, 3, "EL-CH-002", false),
    ("Linen Shirt", 1, 4500, None, 40, "CL-SH-001", false),
    ("Rain Jacket", 1, 8900, Some(6900), 0, "CL-JK-002", true),
    ("Rust in Action", 2, 3999, None, 12, "BK-RS-001", false),
];

/// Inserts demo categories and products when the catalogue is empty.
/// Returns the number of rows written.
pub async fn seed_demo_data(database: &Database) -> Result<usize> {
    let uow = UnitOfWork::new(database).with_actor(Some("seed".to_string()));
    if uow.categories().any(|_| true).await? {
        info!("Catalogue already populated, skipping demo data");
        return Ok(0);
    }

    uow.begin_transaction().await?;
    let categories = uow
        .categories()
        .add_range(CATEGORIES.iter().map(|(name, description, order)| Category {
            name: name.to_string(),
            description: Some(description.to_string()),
            display_order: *order,
            ..Category::default()
        }));
    let mut written = uow.save_changes().await?;

    let cents = |value: i64| Decimal::new(value, 2);
    uow.products().add_range(PRODUCTS.iter().map(
        |(name, category, price, sale, stock, sku, featured)| Product {
            name: name.to_string(),
            price: cents(*price),
            sale_price: sale.map(cents),
            stock_quantity: *stock,
            sku: Some(sku.to_string()),
            is_featured: *featured,
            category_id: categories[*category].get().id,
            ..Product::default()
        },
    ));
    written += uow.save_changes().await?;
    uow.commit_transaction().await?;

    info!(rows = written, "Demo data seeded");
    Ok(written)
}
