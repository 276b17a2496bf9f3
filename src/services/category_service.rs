use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use super::crud_service::{persistence_error, CrudService};
use crate::dto::category_dto::{CategoryDto, CategoryOrder};
use crate::error::{Error, Result};
use crate::models::{Category, Entity};
use crate::repositories::UnitOfWork;

#[derive(Clone)]
pub struct CategoryService {
    uow: Arc<UnitOfWork>,
    crud: CrudService<CategoryDto>,
}

impl CategoryService {
    pub fn new(uow: Arc<UnitOfWork>) -> Self {
        Self {
            crud: CrudService::new(uow.clone()),
            uow,
        }
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<CategoryDto>> {
        self.crud.get_by_id(id).await
    }

    pub async fn get_all(&self) -> Result<Vec<CategoryDto>> {
        self.crud.get_all().await
    }

    pub async fn create(&self, dto: &CategoryDto) -> Result<CategoryDto> {
        Self::require_name(dto)?;
        if let Some(existing) = self.find_by_name(&dto.name).await? {
            return Err(Self::name_taken(&existing.name));
        }
        self.crud.create(dto).await
    }

    pub async fn update(&self, dto: &CategoryDto) -> Result<CategoryDto> {
        Self::require_name(dto)?;
        if let Some(existing) = self.find_by_name(&dto.name).await? {
            if existing.id != dto.id {
                return Err(Self::name_taken(&existing.name));
            }
        }
        self.crud.update(dto).await
    }

    /// Rejected while the category still holds products.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let category = self
            .uow
            .categories()
            .get_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found(Category::NAME, id))?;

        let product_count = self
            .uow
            .products()
            .count(|product| product.category_id == id)
            .await?;
        if product_count > 0 {
            return Err(Error::business(
                "CATEGORY_HAS_PRODUCTS",
                format!(
                    "Cannot delete category '{}' because it contains {} products",
                    category.name, product_count
                ),
            ));
        }

        self.crud.delete(id).await
    }

    /// Active categories ordered by display order, then name.
    pub async fn get_active(&self) -> Result<Vec<CategoryDto>> {
        let outcome: Result<Vec<CategoryDto>> = async {
            let mut categories = self
                .uow
                .categories()
                .find(|category| category.is_active)
                .await?;
            sort_for_display(&mut categories);
            Ok(categories.iter().map(CategoryDto::from).collect())
        }
        .await;
        outcome.map_err(|err| {
            persistence_error(
                err,
                "GET_ACTIVE_CATEGORIES_FAILED",
                "Failed to retrieve active categories".to_string(),
            )
        })
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<CategoryDto>> {
        if name.trim().is_empty() {
            return Err(Error::field("name", "Category name cannot be empty"));
        }
        let found = self.find_by_name(name).await.map_err(|err| {
            persistence_error(
                err,
                "GET_CATEGORY_BY_NAME_FAILED",
                format!("Failed to find category by name '{}'", name),
            )
        })?;
        Ok(found.as_ref().map(CategoryDto::from))
    }

    /// Every category with the number of products it holds, in display order.
    pub async fn get_with_product_counts(&self) -> Result<Vec<CategoryDto>> {
        let outcome: Result<Vec<CategoryDto>> = async {
            let mut categories = self.uow.categories().get_all().await?;
            let products = self.uow.products().get_all().await?;
            let mut counts: HashMap<i64, usize> = HashMap::new();
            for product in &products {
                *counts.entry(product.category_id).or_default() += 1;
            }

            sort_for_display(&mut categories);
            Ok(categories
                .iter()
                .map(|category| {
                    let mut dto = CategoryDto::from(category);
                    dto.product_count = Some(counts.get(&category.id).copied().unwrap_or(0));
                    dto
                })
                .collect())
        }
        .await;
        outcome.map_err(|err| {
            persistence_error(
                err,
                "GET_CATEGORIES_WITH_COUNTS_FAILED",
                "Failed to retrieve categories with product counts".to_string(),
            )
        })
    }

    /// Applies new display orders in one save. Unknown ids are skipped.
    pub async fn reorder(&self, orders: &[CategoryOrder]) -> Result<usize> {
        let outcome: Result<usize> = async {
            let repository = self.uow.categories();
            let mut touched = 0;
            for order in orders {
                if let Some(mut category) = repository.get_by_id(order.id).await? {
                    category.display_order = order.display_order;
                    repository.update(category);
                    touched += 1;
                }
            }
            self.uow.save_changes().await?;
            Ok(touched)
        }
        .await;
        let touched = outcome.map_err(|err| {
            persistence_error(
                err,
                "REORDER_CATEGORIES_FAILED",
                "Failed to reorder categories".to_string(),
            )
        })?;
        info!(count = touched, "Categories reordered");
        Ok(touched)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Category>> {
        let name = name.trim().to_string();
        let mut matches = self
            .uow
            .categories()
            .find(move |category| category.name == name)
            .await?;
        Ok(matches.pop())
    }

    fn require_name(dto: &CategoryDto) -> Result<()> {
        if dto.name.trim().is_empty() {
            return Err(Error::field("name", "Category name is required"));
        }
        Ok(())
    }

    fn name_taken(name: &str) -> Error {
        Error::business(
            "CATEGORY_NAME_EXISTS",
            format!("Category with name '{}' already exists", name),
        )
    }
}

fn sort_for_display(categories: &mut [Category]) {
    categories.sort_by(|a, b| {
        a.display_order
            .cmp(&b.display_order)
            .then_with(|| a.name.cmp(&b.name))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::dto::product_dto::ProductDto;
    use crate::services::product_service::ProductService;
    use rust_decimal::Decimal;

    fn category(name: &str, display_order: i32, is_active: bool) -> CategoryDto {
        CategoryDto {
            id: 0,
            name: name.into(),
            description: None,
            display_order,
            is_active,
            product_count: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn service() -> CategoryService {
        CategoryService::new(Arc::new(UnitOfWork::new(&Database::memory())))
    }

    #[tokio::test]
    async fn rejects_blank_and_duplicate_names() {
        let svc = service();
        let err = svc.create(&category("  ", 0, true)).await.unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");

        svc.create(&category("Books", 0, true)).await.unwrap();
        let err = svc.create(&category("Books", 1, true)).await.unwrap_err();
        assert_eq!(err.code(), "CATEGORY_NAME_EXISTS");
    }

    #[tokio::test]
    async fn update_may_keep_its_own_name() {
        let svc = service();
        let books = svc.create(&category("Books", 0, true)).await.unwrap();
        svc.create(&category("Music", 0, true)).await.unwrap();

        let mut same = books.clone();
        same.description = Some("Paper".into());
        assert!(svc.update(&same).await.is_ok());

        let mut clash = books.clone();
        clash.name = "Music".into();
        assert_eq!(svc.update(&clash).await.unwrap_err().code(), "CATEGORY_NAME_EXISTS");
    }

    #[tokio::test]
    async fn active_categories_sorted_by_order_then_name() {
        let svc = service();
        svc.create(&category("Zeta", 1, true)).await.unwrap();
        svc.create(&category("Alpha", 1, true)).await.unwrap();
        svc.create(&category("First", 0, true)).await.unwrap();
        svc.create(&category("Hidden", 0, false)).await.unwrap();

        let names: Vec<_> = svc
            .get_active()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["First", "Alpha", "Zeta"]);
    }

    #[tokio::test]
    async fn delete_is_blocked_by_products() {
        let uow = Arc::new(UnitOfWork::new(&Database::memory()));
        let svc = CategoryService::new(uow.clone());
        let books = svc.create(&category("Books", 0, true)).await.unwrap();

        let products = ProductService::new(uow.clone());
        let product = products
            .create(&ProductDto {
                stock_quantity: 3,
                ..ProductDto::new("Dune", Decimal::from(12), books.id)
            })
            .await
            .unwrap();

        let err = svc.delete(books.id).await.unwrap_err();
        assert_eq!(err.code(), "CATEGORY_HAS_PRODUCTS");
        assert_eq!(
            err.to_string(),
            "Cannot delete category 'Books' because it contains 1 products"
        );

        products.delete(product.id).await.unwrap();
        svc.delete(books.id).await.unwrap();
        assert!(svc.get_by_id(books.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn counts_and_reorder() {
        let svc = service();
        let a = svc.create(&category("A", 0, true)).await.unwrap();
        let b = svc.create(&category("B", 1, true)).await.unwrap();

        let touched = svc
            .reorder(&[
                CategoryOrder { id: a.id, display_order: 5 },
                CategoryOrder { id: 999, display_order: 0 },
            ])
            .await
            .unwrap();
        assert_eq!(touched, 1);

        let listed = svc.get_with_product_counts().await.unwrap();
        assert_eq!(listed[0].id, b.id);
        assert_eq!(listed[1].id, a.id);
        assert_eq!(listed[1].display_order, 5);
        assert_eq!(listed[0].product_count, Some(0));
    }

    #[tokio::test]
    async fn lookup_by_name_trims() {
        let svc = service();
        svc.create(&category("Books", 0, true)).await.unwrap();
        assert!(svc.get_by_name("  Books ").await.unwrap().is_some());
        assert!(svc.get_by_name("Nope").await.unwrap().is_none());
        assert_eq!(svc.get_by_name("").await.unwrap_err().code(), "VALIDATION_ERROR");
    }
}
