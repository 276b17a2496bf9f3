use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use super::crud_service::persistence_error;
use crate::dto::category_dto::CategoryDto;
use crate::dto::product_dto::ProductDto;
use crate::dto::search_dto::GlobalSearchResult;
use crate::dto::user_dto::UserDto;
use crate::error::{Error, Result};
use crate::repositories::UnitOfWork;

/// Results returned per entity type by the global search.
pub const GLOBAL_SEARCH_LIMIT: usize = 10;
/// Suggestions offered when a global search finds nothing.
pub const FALLBACK_SUGGESTIONS: usize = 5;
/// Leading characters of an unmatched query used as the suggestion prefix.
const FALLBACK_PREFIX_LEN: usize = 3;

#[derive(Clone)]
pub struct SearchService {
    uow: Arc<UnitOfWork>,
}

impl SearchService {
    pub fn new(uow: Arc<UnitOfWork>) -> Self {
        Self { uow }
    }

    /// Case-insensitive substring search over products, categories and users.
    pub async fn global_search(&self, query: &str) -> Result<GlobalSearchResult> {
        let started = Instant::now();
        let term = query.trim().to_lowercase();
        if term.is_empty() {
            return Err(Error::field("q", "Search query cannot be empty"));
        }

        let outcome: Result<(Vec<ProductDto>, Vec<CategoryDto>, Vec<UserDto>)> = async {
            let products = self.matching_products(&term, Some(GLOBAL_SEARCH_LIMIT)).await?;
            let categories = self.matching_categories(&term, Some(GLOBAL_SEARCH_LIMIT)).await?;

            let needle = term.clone();
            let users: Vec<UserDto> = self
                .uow
                .users()
                .find(move |user| user.matches_term(&needle))
                .await?
                .iter()
                .take(GLOBAL_SEARCH_LIMIT)
                .map(UserDto::from)
                .collect();
            Ok((products, categories, users))
        }
        .await;
        let (products, categories, users) = outcome.map_err(|err| {
            persistence_error(
                err,
                "GLOBAL_SEARCH_FAILED",
                format!("Global search for '{}' failed", query.trim()),
            )
        })?;

        let result_counts = BTreeMap::from([
            ("Products".to_string(), products.len()),
            ("Categories".to_string(), categories.len()),
            ("Users".to_string(), users.len()),
        ]);
        let total_results = result_counts.values().sum();

        let suggestions = if total_results == 0 {
            // The whole term matched nothing, so it cannot be a name prefix
            // either; complete from its first characters instead.
            let prefix: String = term.chars().take(FALLBACK_PREFIX_LEN).collect();
            self.suggestions(&prefix, FALLBACK_SUGGESTIONS).await
        } else {
            Vec::new()
        };

        let execution_time_ms = started.elapsed().as_millis() as u64;
        debug!(query = %term, total_results, execution_time_ms, "Global search");
        Ok(GlobalSearchResult {
            query: query.trim().to_string(),
            products,
            categories,
            users,
            result_counts,
            total_results,
            suggestions,
            execution_time_ms,
        })
    }

    pub async fn search_products(&self, query: &str) -> Result<Vec<ProductDto>> {
        let term = Self::require_term(query)?;
        self.matching_products(&term, None).await.map_err(|err| {
            persistence_error(err, "SEARCH_PRODUCTS_FAILED", "Product search failed".to_string())
        })
    }

    pub async fn search_categories(&self, query: &str) -> Result<Vec<CategoryDto>> {
        let term = Self::require_term(query)?;
        self.matching_categories(&term, None).await.map_err(|err| {
            persistence_error(err, "SEARCH_CATEGORIES_FAILED", "Category search failed".to_string())
        })
    }

    /// Product and category names starting with `partial`, at most `max / 2`
    /// of each, deduplicated. Lookup failures yield no suggestions.
    pub async fn suggestions(&self, partial: &str, max: usize) -> Vec<String> {
        let prefix = partial.trim().to_lowercase();
        if prefix.is_empty() || max == 0 {
            return Vec::new();
        }
        let per_type = max / 2;

        let outcome: Result<Vec<String>> = async {
            let mut names: Vec<String> = self
                .uow
                .products()
                .get_all()
                .await?
                .into_iter()
                .filter(|p| p.name.to_lowercase().starts_with(&prefix))
                .take(per_type)
                .map(|p| p.name)
                .collect();
            names.extend(
                self.uow
                    .categories()
                    .get_all()
                    .await?
                    .into_iter()
                    .filter(|c| c.name.to_lowercase().starts_with(&prefix))
                    .take(per_type)
                    .map(|c| c.name),
            );
            Ok(names)
        }
        .await;

        match outcome {
            Ok(names) => {
                let mut distinct: Vec<String> = Vec::with_capacity(names.len());
                for name in names {
                    if !distinct.contains(&name) {
                        distinct.push(name);
                    }
                }
                distinct.truncate(max);
                distinct
            }
            Err(err) => {
                warn!(error = ?err, "Search suggestions unavailable");
                Vec::new()
            }
        }
    }

    fn require_term(query: &str) -> Result<String> {
        let term = query.trim().to_lowercase();
        if term.is_empty() {
            return Err(Error::field("q", "Search query cannot be empty"));
        }
        Ok(term)
    }

    async fn matching_products(&self, term: &str, limit: Option<usize>) -> Result<Vec<ProductDto>> {
        let needle = term.to_string();
        let products = self
            .uow
            .products()
            .find(move |product| product.matches_term(&needle))
            .await?;
        let names: BTreeMap<i64, String> = self
            .uow
            .categories()
            .get_all_including_deleted()
            .await?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();
        Ok(products
            .iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|product| {
                let mut dto = ProductDto::from(product);
                dto.category_name = names.get(&product.category_id).cloned();
                dto
            })
            .collect())
    }

    async fn matching_categories(&self, term: &str, limit: Option<usize>) -> Result<Vec<CategoryDto>> {
        let needle = term.to_string();
        let categories = self
            .uow
            .categories()
            .find(move |category| category.matches_term(&needle))
            .await?;
        Ok(categories
            .iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(CategoryDto::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use crate::models::{Category, Product};
    use rust_decimal::Decimal;

    async fn seeded() -> SearchService {
        let uow = Arc::new(UnitOfWork::new(&Database::memory()));
        let category = uow.categories().add(Category {
            name: "Electronics".into(),
            description: Some("Gadgets and devices".into()),
            ..Category::default()
        });
        uow.save_changes().await.unwrap();
        let category_id = category.get().id;

        let products = (1..=12).map(|i| Product {
            name: format!("Laptop {:02}", i),
            price: Decimal::from(500 + i),
            category_id,
            ..Product::default()
        });
        uow.products().add_range(products);
        uow.products().add(Product {
            name: "Lamp".into(),
            price: Decimal::from(20),
            sku: Some("EL-LAMP".into()),
            category_id,
            ..Product::default()
        });
        uow.save_changes().await.unwrap();
        SearchService::new(uow)
    }

    #[tokio::test]
    async fn global_search_caps_each_type() {
        let svc = seeded().await;
        let result = svc.global_search("  LAPTOP ").await.unwrap();
        assert_eq!(result.query, "LAPTOP");
        assert_eq!(result.products.len(), GLOBAL_SEARCH_LIMIT);
        assert_eq!(result.result_counts["Products"], 10);
        assert_eq!(result.result_counts["Categories"], 0);
        assert_eq!(result.total_results, 10);
        assert!(result.suggestions.is_empty());
        assert_eq!(result.products[0].category_name.as_deref(), Some("Electronics"));
    }

    #[tokio::test]
    async fn description_and_sku_match() {
        let svc = seeded().await;
        let result = svc.global_search("gadget").await.unwrap();
        assert_eq!(result.categories.len(), 1);
        assert_eq!(svc.search_products("el-lamp").await.unwrap().len(), 1);
        assert_eq!(svc.search_products("laptop").await.unwrap().len(), 12);
    }

    #[tokio::test]
    async fn empty_results_offer_suggestions() {
        let svc = seeded().await;
        let result = svc.global_search("lapx").await.unwrap();
        assert_eq!(result.total_results, 0);
        assert_eq!(result.suggestions, ["Laptop 01", "Laptop 02"]);
    }

    #[tokio::test]
    async fn suggestions_split_between_types() {
        let svc = seeded().await;
        assert_eq!(svc.suggestions("la", 4).await, ["Laptop 01", "Laptop 02"]);
        assert_eq!(svc.suggestions("ele", 4).await, ["Electronics"]);
        assert!(svc.suggestions("", 4).await.is_empty());
    }

    #[tokio::test]
    async fn blank_query_is_rejected() {
        let svc = seeded().await;
        assert_eq!(svc.global_search("   ").await.unwrap_err().code(), "VALIDATION_ERROR");
        assert_eq!(svc.search_categories("").await.unwrap_err().code(), "VALIDATION_ERROR");
    }
}
