use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{category_dto::CategoryDto, product_dto::ProductDto, user_dto::UserDto};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionQuery {
    pub q: Option<String>,
    pub max: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalSearchResult {
    pub query: String,
    pub products: Vec<ProductDto>,
    pub categories: Vec<CategoryDto>,
    pub users: Vec<UserDto>,
    pub result_counts: BTreeMap<String, usize>,
    pub total_results: usize,
    pub suggestions: Vec<String>,
    pub execution_time_ms: u64,
}
