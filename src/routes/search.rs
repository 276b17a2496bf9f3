use axum::{
    extract::Query,
    response::{IntoResponse, Json},
};

use crate::{
    dto::search_dto::{SearchQuery, SuggestionQuery},
    error::Result,
    extract::RequestScope,
};

const DEFAULT_SUGGESTIONS: usize = 10;

#[utoipa::path(
    get,
    path = "/api/search",
    params(("q" = String, Query, description = "Search term")),
    responses(
        (status = 200, description = "Matches across products, categories and users", body = crate::dto::search_dto::GlobalSearchResult),
        (status = 400, description = "Empty search term")
    )
)]
#[axum::debug_handler(state = crate::AppState)]
pub async fn global_search(
    scope: RequestScope,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse> {
    let term = query.q.unwrap_or_default();
    Ok(Json(scope.search().global_search(&term).await?))
}

#[utoipa::path(
    get,
    path = "/api/search/suggestions",
    params(
        ("q" = String, Query, description = "Prefix to complete"),
        ("max" = Option<usize>, Query, description = "Maximum suggestions, default 10")
    ),
    responses((status = 200, description = "Product and category names", body = [String]))
)]
#[axum::debug_handler(state = crate::AppState)]
pub async fn suggestions(
    scope: RequestScope,
    Query(query): Query<SuggestionQuery>,
) -> Result<impl IntoResponse> {
    let partial = query.q.unwrap_or_default();
    let max = query.max.unwrap_or(DEFAULT_SUGGESTIONS);
    Ok(Json(scope.search().suggestions(&partial, max).await))
}
