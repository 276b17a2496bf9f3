use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, warn};

use super::crud_service::{persistence_error, CrudService};
use crate::dto::paging::{normalize_page, page_offset, PagedResult};
use crate::dto::product_dto::{ProductDto, ProductListQuery, ProductSort};
use crate::error::{Error, Result};
use crate::models::{product::LOW_STOCK_THRESHOLD, Entity, Product};
use crate::repositories::UnitOfWork;

/// Upper bound for one bulk status change.
pub const MAX_BULK_SIZE: usize = 100;

#[derive(Clone)]
pub struct ProductService {
    uow: Arc<UnitOfWork>,
    crud: CrudService<ProductDto>,
}

impl ProductService {
    pub fn new(uow: Arc<UnitOfWork>) -> Self {
        Self {
            crud: CrudService::new(uow.clone()),
            uow,
        }
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<ProductDto>> {
        match self.crud.get_by_id(id).await? {
            Some(dto) => Ok(self.with_category_names(vec![dto]).await?.pop()),
            None => Ok(None),
        }
    }

    pub async fn get_all(&self) -> Result<Vec<ProductDto>> {
        let products = self.crud.get_all().await?;
        self.with_category_names(products).await
    }

    pub async fn create(&self, dto: &ProductDto) -> Result<ProductDto> {
        self.validate_product(dto, false).await?;
        let created = self.crud.create(dto).await?;
        Ok(self.with_category_names(vec![created]).await?.remove(0))
    }

    pub async fn update(&self, dto: &ProductDto) -> Result<ProductDto> {
        self.validate_product(dto, true).await?;
        let updated = self.crud.update(dto).await?;
        Ok(self.with_category_names(vec![updated]).await?.remove(0))
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.crud.delete(id).await
    }

    pub async fn get_by_category(&self, category_id: i64) -> Result<Vec<ProductDto>> {
        self.query(
            "GET_PRODUCTS_BY_CATEGORY_FAILED",
            format!("Failed to retrieve products for category {}", category_id),
            move |p| p.category_id == category_id,
            by_name,
        )
        .await
    }

    pub async fn get_active(&self) -> Result<Vec<ProductDto>> {
        self.query(
            "GET_ACTIVE_PRODUCTS_FAILED",
            "Failed to retrieve active products".to_string(),
            |p| p.is_active,
            by_name,
        )
        .await
    }

    pub async fn get_featured(&self) -> Result<Vec<ProductDto>> {
        self.query(
            "GET_FEATURED_PRODUCTS_FAILED",
            "Failed to retrieve featured products".to_string(),
            |p| p.is_featured && p.is_active,
            by_name,
        )
        .await
    }

    pub async fn get_on_sale(&self) -> Result<Vec<ProductDto>> {
        self.query(
            "GET_SALE_PRODUCTS_FAILED",
            "Failed to retrieve products on sale".to_string(),
            |p| p.is_active && p.is_on_sale(),
            by_name,
        )
        .await
    }

    /// Active products at or below the low stock threshold, emptiest first.
    pub async fn get_low_stock(&self) -> Result<Vec<ProductDto>> {
        self.query(
            "GET_LOW_STOCK_PRODUCTS_FAILED",
            "Failed to retrieve low stock products".to_string(),
            |p| p.is_active && p.stock_quantity <= LOW_STOCK_THRESHOLD,
            |a, b| {
                a.stock_quantity
                    .cmp(&b.stock_quantity)
                    .then_with(|| a.name.cmp(&b.name))
            },
        )
        .await
    }

    pub async fn get_by_sku(&self, sku: &str) -> Result<Option<ProductDto>> {
        if sku.trim().is_empty() {
            return Err(Error::field("sku", "SKU cannot be empty"));
        }
        let found = self.find_by_sku(sku).await.map_err(|err| {
            persistence_error(
                err,
                "GET_PRODUCT_BY_SKU_FAILED",
                format!("Failed to find product by SKU '{}'", sku),
            )
        })?;
        match found {
            Some(product) => Ok(self
                .with_category_names(vec![ProductDto::from(&product)])
                .await?
                .pop()),
            None => Ok(None),
        }
    }

    /// Case-insensitive match on name, description or SKU. A blank term
    /// matches nothing.
    pub async fn search(&self, term: &str) -> Result<Vec<ProductDto>> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return Ok(Vec::new());
        }
        self.query(
            "SEARCH_PRODUCTS_FAILED",
            format!("Failed to search products with term '{}'", term),
            move |p| p.matches_term(&term),
            by_name,
        )
        .await
    }

    pub async fn update_stock(&self, id: i64, quantity: i32) -> Result<ProductDto> {
        if quantity < 0 {
            return Err(Error::field(
                "stock_quantity",
                "Stock quantity cannot be negative",
            ));
        }
        let outcome: Result<Product> = async {
            let repository = self.uow.products();
            let mut product = repository
                .get_by_id(id)
                .await?
                .ok_or_else(|| Error::not_found(Product::NAME, id))?;
            product.stock_quantity = quantity;
            let tracked = repository.update(product);
            self.uow.save_changes().await?;
            Ok(tracked.get())
        }
        .await;
        let product = outcome.map_err(|err| {
            persistence_error(
                err,
                "UPDATE_STOCK_FAILED",
                format!("Failed to update stock for product {}", id),
            )
        })?;
        info!(product_id = id, quantity, "Stock updated");
        Ok(self
            .with_category_names(vec![ProductDto::from(&product)])
            .await?
            .remove(0))
    }

    /// Sets `is_active` on up to [`MAX_BULK_SIZE`] products in one save.
    /// Unknown ids are skipped.
    pub async fn bulk_update_active_status(&self, ids: &[i64], is_active: bool) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        if ids.len() > MAX_BULK_SIZE {
            return Err(Error::business(
                "BULK_LIMIT",
                format!(
                    "Operation 'Bulk Update Active Status' cannot be performed for {} items. The maximum is {}.",
                    ids.len(),
                    MAX_BULK_SIZE
                ),
            ));
        }

        let outcome: Result<usize> = async {
            let repository = self.uow.products();
            let mut touched = 0;
            for &id in ids {
                match repository.get_by_id(id).await? {
                    Some(mut product) => {
                        product.is_active = is_active;
                        repository.update(product);
                        touched += 1;
                    }
                    None => warn!(product_id = id, "Bulk status update skipped unknown product"),
                }
            }
            self.uow.save_changes().await?;
            Ok(touched)
        }
        .await;
        outcome.map_err(|err| {
            persistence_error(
                err,
                "BULK_UPDATE_ACTIVE_STATUS_FAILED",
                "Failed to bulk update product active status".to_string(),
            )
        })
    }

    pub async fn get_paged(&self, query: &ProductListQuery) -> Result<PagedResult<ProductDto>> {
        let outcome: Result<PagedResult<ProductDto>> = async {
            let (page, page_size) = normalize_page(query.page, query.page_size);
            let term = query
                .search
                .as_deref()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty());

            let filter = query.clone();
            let mut products = self
                .uow
                .products()
                .find(move |p| {
                    filter.category_id.map_or(true, |id| p.category_id == id)
                        && filter.is_active.map_or(true, |flag| p.is_active == flag)
                        && filter.is_featured.map_or(true, |flag| p.is_featured == flag)
                        && term.as_deref().map_or(true, |t| p.matches_term(t))
                })
                .await?;

            let names = self.category_names().await?;
            let sort = query.sort_by.unwrap_or_default();
            products.sort_by(|a, b| {
                let ordering = compare_products(a, b, sort, &names);
                if query.sort_desc {
                    ordering.reverse()
                } else {
                    ordering
                }
            });

            let total = products.len();
            let items: Vec<ProductDto> = products
                .iter()
                .skip(page_offset(page, page_size))
                .take(page_size)
                .map(|p| {
                    let mut dto = ProductDto::from(p);
                    dto.category_name = names.get(&p.category_id).cloned();
                    dto
                })
                .collect();
            Ok(PagedResult::new(items, page, page_size, total))
        }
        .await;
        outcome.map_err(|err| {
            persistence_error(
                err,
                "GET_PAGED_PRODUCTS_FAILED",
                "Failed to retrieve paged products".to_string(),
            )
        })
    }

    /// Business rules checked before any product write, in this order.
    async fn validate_product(&self, dto: &ProductDto, is_update: bool) -> Result<()> {
        if dto.name.trim().is_empty() {
            return Err(Error::field("name", "Product name is required"));
        }
        if dto.price <= Decimal::ZERO {
            return Err(Error::field("price", "Product price must be greater than zero"));
        }
        if let Some(sale) = dto.sale_price {
            if sale <= Decimal::ZERO {
                return Err(Error::field("sale_price", "Sale price must be greater than zero"));
            }
            if sale >= dto.price {
                if is_update && dto.id > 0 {
                    return Err(Error::business(
                        "PRICE_VALIDATION",
                        format!(
                            "Sale price ({}) must be lower than the regular price ({}).",
                            sale, dto.price
                        ),
                    ));
                }
                return Err(Error::field(
                    "sale_price",
                    "Sale price must be lower than the regular price",
                ));
            }
        }
        if dto.stock_quantity < 0 {
            return Err(Error::field(
                "stock_quantity",
                "Stock quantity cannot be negative",
            ));
        }

        let category = self
            .uow
            .categories()
            .get_by_id(dto.category_id)
            .await?
            .ok_or_else(|| Error::field("category_id", "The selected category does not exist"))?;
        if !category.is_active {
            return Err(Error::business(
                "CATEGORY_VALIDATION",
                format!(
                    "A product cannot be assigned to the inactive category '{}'.",
                    category.name
                ),
            ));
        }

        if let Some(sku) = dto.sku.as_deref().filter(|s| !s.trim().is_empty()) {
            if let Some(existing) = self.find_by_sku(sku).await? {
                if !is_update || existing.id != dto.id {
                    return Err(Error::business(
                        "SKU_UNIQUENESS",
                        format!(
                            "SKU '{}' already exists on product ID {}.",
                            sku.trim(),
                            existing.id
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    async fn find_by_sku(&self, sku: &str) -> Result<Option<Product>> {
        let sku = sku.trim().to_string();
        let mut matches = self
            .uow
            .products()
            .find(move |p| p.sku.as_deref() == Some(sku.as_str()))
            .await?;
        Ok(matches.pop())
    }

    async fn query<P, S>(
        &self,
        code: &str,
        message: String,
        predicate: P,
        order: S,
    ) -> Result<Vec<ProductDto>>
    where
        P: Fn(&Product) -> bool + Send,
        S: Fn(&Product, &Product) -> Ordering + Send,
    {
        let outcome: Result<Vec<ProductDto>> = async {
            let mut products = self.uow.products().find(predicate).await?;
            products.sort_by(|a, b| order(a, b));
            let dtos = products.iter().map(ProductDto::from).collect();
            self.with_category_names(dtos).await
        }
        .await;
        outcome.map_err(|err| persistence_error(err, code, message))
    }

    async fn category_names(&self) -> Result<HashMap<i64, String>> {
        let categories = self.uow.categories().get_all_including_deleted().await?;
        Ok(categories.into_iter().map(|c| (c.id, c.name)).collect())
    }

    async fn with_category_names(&self, mut products: Vec<ProductDto>) -> Result<Vec<ProductDto>> {
        if products.is_empty() {
            return Ok(products);
        }
        let names = self.category_names().await?;
        for product in &mut products {
            product.category_name = names.get(&product.category_id).cloned();
        }
        Ok(products)
    }
}

fn by_name(a: &Product, b: &Product) -> Ordering {
    a.name.cmp(&b.name)
}

fn compare_products(
    a: &Product,
    b: &Product,
    sort: ProductSort,
    category_names: &HashMap<i64, String>,
) -> Ordering {
    match sort {
        ProductSort::Name => a.name.cmp(&b.name),
        ProductSort::Price => a.price.cmp(&b.price),
        ProductSort::Stock => a.stock_quantity.cmp(&b.stock_quantity),
        ProductSort::Category => category_names
            .get(&a.category_id)
            .cmp(&category_names.get(&b.category_id)),
        ProductSort::Created => a.audit.created_at.cmp(&b.audit.created_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::dto::category_dto::CategoryDto;
    use crate::services::category_service::CategoryService;

    struct Fixture {
        products: ProductService,
        categories: CategoryService,
        books: i64,
    }

    async fn fixture() -> Fixture {
        let uow = Arc::new(UnitOfWork::new(&Database::memory()));
        let categories = CategoryService::new(uow.clone());
        let books = categories
            .create(&CategoryDto {
                id: 0,
                name: "Books".into(),
                description: None,
                display_order: 0,
                is_active: true,
                product_count: None,
                created_at: None,
                updated_at: None,
            })
            .await
            .unwrap()
            .id;
        Fixture {
            products: ProductService::new(uow),
            categories,
            books,
        }
    }

    fn money(v: i64) -> Decimal {
        Decimal::from(v)
    }

    #[tokio::test]
    async fn create_fills_derived_fields() {
        let f = fixture().await;
        let created = f
            .products
            .create(&ProductDto {
                sale_price: Some(money(75)),
                stock_quantity: 4,
                ..ProductDto::new("Atlas", money(100), f.books)
            })
            .await
            .unwrap();
        assert_eq!(created.category_name.as_deref(), Some("Books"));
        assert_eq!(created.effective_price, money(75));
        assert!(created.is_on_sale);
        assert_eq!(created.discount_percentage, Some(money(25)));
        assert_eq!(created.stock_status, Some(crate::models::StockStatus::LowStock));
    }

    #[tokio::test]
    async fn sale_price_must_undercut_price() {
        let f = fixture().await;
        let dto = ProductDto {
            sale_price: Some(money(100)),
            ..ProductDto::new("Atlas", money(100), f.books)
        };
        let err = f.products.create(&dto).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        let created = f
            .products
            .create(&ProductDto::new("Atlas", money(100), f.books))
            .await
            .unwrap();
        let err = f
            .products
            .update(&ProductDto {
                id: created.id,
                sale_price: Some(money(120)),
                ..ProductDto::new("Atlas", money(100), f.books)
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "PRICE_VALIDATION");
    }

    #[tokio::test]
    async fn rejects_bad_numbers_and_categories() {
        let f = fixture().await;
        let zero = ProductDto::new("Free", Decimal::ZERO, f.books);
        assert_eq!(f.products.create(&zero).await.unwrap_err().code(), "VALIDATION_ERROR");

        let negative = ProductDto {
            stock_quantity: -1,
            ..ProductDto::new("Neg", money(1), f.books)
        };
        assert_eq!(f.products.create(&negative).await.unwrap_err().code(), "VALIDATION_ERROR");

        let orphan = ProductDto::new("Orphan", money(1), 999);
        match f.products.create(&orphan).await.unwrap_err() {
            Error::Validation { errors, .. } => assert!(errors.contains_key("category_id")),
            other => panic!("unexpected {other:?}"),
        }

        let mut music = f.categories.get_by_id(f.books).await.unwrap().unwrap();
        music.id = 0;
        music.name = "Music".into();
        music.is_active = false;
        let inactive = f.categories.create(&music).await.unwrap();
        let err = f
            .products
            .create(&ProductDto::new("Vinyl", money(5), inactive.id))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CATEGORY_VALIDATION");
    }

    #[tokio::test]
    async fn duplicate_sku_is_rejected() {
        let f = fixture().await;
        let first = f
            .products
            .create(&ProductDto {
                sku: Some("BK-1".into()),
                ..ProductDto::new("One", money(5), f.books)
            })
            .await
            .unwrap();
        let err = f
            .products
            .create(&ProductDto {
                sku: Some(" BK-1 ".into()),
                ..ProductDto::new("Two", money(5), f.books)
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "SKU_UNIQUENESS");

        let same = ProductDto {
            id: first.id,
            sku: Some("BK-1".into()),
            ..ProductDto::new("One renamed", money(6), f.books)
        };
        assert!(f.products.update(&same).await.is_ok());
        assert_eq!(
            f.products.get_by_sku("BK-1").await.unwrap().unwrap().name,
            "One renamed"
        );
    }

    #[tokio::test]
    async fn queries_filter_and_order() {
        let f = fixture().await;
        for (name, stock, featured, active) in [
            ("Cobalt", 2, true, true),
            ("Amber", 2, false, true),
            ("Basalt", 9, true, false),
            ("Dune", 0, false, true),
        ] {
            f.products
                .create(&ProductDto {
                    stock_quantity: stock,
                    is_featured: featured,
                    is_active: active,
                    ..ProductDto::new(name, money(10), f.books)
                })
                .await
                .unwrap();
        }

        let names = |items: Vec<ProductDto>| items.into_iter().map(|p| p.name).collect::<Vec<_>>();
        assert_eq!(names(f.products.get_active().await.unwrap()), ["Amber", "Cobalt", "Dune"]);
        assert_eq!(names(f.products.get_featured().await.unwrap()), ["Cobalt"]);
        assert_eq!(
            names(f.products.get_low_stock().await.unwrap()),
            ["Dune", "Amber", "Cobalt"]
        );
        assert_eq!(names(f.products.search("  ALT ").await.unwrap()), ["Basalt", "Cobalt"]);
        assert!(f.products.search("   ").await.unwrap().is_empty());
        assert_eq!(f.products.get_by_category(f.books).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn stock_and_bulk_updates() {
        let f = fixture().await;
        let p = f
            .products
            .create(&ProductDto::new("Atlas", money(10), f.books))
            .await
            .unwrap();

        assert_eq!(f.products.update_stock(p.id, -1).await.unwrap_err().code(), "VALIDATION_ERROR");
        assert!(matches!(
            f.products.update_stock(404, 1).await,
            Err(Error::NotFound { .. })
        ));
        assert_eq!(f.products.update_stock(p.id, 42).await.unwrap().stock_quantity, 42);

        assert_eq!(f.products.bulk_update_active_status(&[], false).await.unwrap(), 0);
        let too_many: Vec<i64> = (1..=101).collect();
        assert_eq!(
            f.products
                .bulk_update_active_status(&too_many, false)
                .await
                .unwrap_err()
                .code(),
            "BULK_LIMIT"
        );
        assert_eq!(
            f.products
                .bulk_update_active_status(&[p.id, 999], false)
                .await
                .unwrap(),
            1
        );
        assert!(f.products.get_active().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn paging_sorts_and_slices() {
        let f = fixture().await;
        for i in 1..=12 {
            f.products
                .create(&ProductDto::new(format!("Item {:02}", i), money(i), f.books))
                .await
                .unwrap();
        }

        let page = f
            .products
            .get_paged(&ProductListQuery {
                page: Some(2),
                page_size: Some(5),
                sort_by: Some(ProductSort::Price),
                sort_desc: true,
                ..ProductListQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total_items, 12);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.start_item, 6);
        assert_eq!(page.end_item, 10);
        assert_eq!(page.items[0].price, money(7));
        assert!(page.has_previous && page.has_next);

        let filtered = f
            .products
            .get_paged(&ProductListQuery {
                search: Some("item 1".into()),
                ..ProductListQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(filtered.total_items, 3);
        assert_eq!(filtered.page_size, 10);
    }
    #[tokio::test]
    async fn page_past_the_end_is_empty() {
        let f = fixture().await;
        f.products
            .create(&ProductDto::new("Atlas", money(10), f.books))
            .await
            .unwrap();

        let page = f
            .products
            .get_paged(&ProductListQuery {
                page: Some(usize::MAX),
                page_size: Some(100),
                ..ProductListQuery::default()
            })
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total_items, 1);
        assert!(!page.has_next);
    }

    #[tokio::test]
    async fn concurrent_updates_last_write_wins() {
        let db = Database::memory();
        let setup = Arc::new(UnitOfWork::new(&db));
        let books = CategoryService::new(setup.clone())
            .create(&CategoryDto {
                id: 0,
                name: "Books".into(),
                description: None,
                display_order: 0,
                is_active: true,
                product_count: None,
                created_at: None,
                updated_at: None,
            })
            .await
            .unwrap()
            .id;
        let created = ProductService::new(setup)
            .create(&ProductDto::new("original", money(10), books))
            .await
            .unwrap();

        let first = ProductService::new(Arc::new(UnitOfWork::new(&db)));
        let second = ProductService::new(Arc::new(UnitOfWork::new(&db)));
        let rename = |name: &str| ProductDto {
            id: created.id,
            ..ProductDto::new(name, money(10), books)
        };
        let (to_first, to_second) = (rename("first"), rename("second"));
        let (a, b) = tokio::join!(first.update(&to_first), second.update(&to_second));
        assert!(a.is_ok());
        assert!(b.is_ok());

        let reader = ProductService::new(Arc::new(UnitOfWork::new(&db)));
        let stored = reader.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "second");

        // A stale copy saved after a newer write still overwrites it.
        let stale_uow = UnitOfWork::new(&db);
        let mut stale = stale_uow.products().get_by_id(created.id).await.unwrap().unwrap();
        second.update(&rename("newer")).await.unwrap();
        stale.name = "stale".into();
        stale_uow.products().update(stale);
        stale_uow.save_changes().await.unwrap();
        let stored = reader.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "stale");
    }
}
