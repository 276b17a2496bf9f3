use axum::{
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::{
    dto::category_dto::{CategoryDto, ReorderCategoriesPayload},
    error::{Error, Result},
    extract::{RequestScope, ValidatedJson},
    models::{Category, Entity},
};

#[utoipa::path(
    get,
    path = "/api/categories",
    responses(
        (status = 200, description = "Categories with product counts", body = [CategoryDto])
    )
)]
#[axum::debug_handler(state = crate::AppState)]
pub async fn list_categories(scope: RequestScope) -> Result<impl IntoResponse> {
    let categories = scope.categories().get_with_product_counts().await?;
    Ok(Json(categories))
}

#[utoipa::path(
    get,
    path = "/api/categories/active",
    responses(
        (status = 200, description = "Active categories in display order", body = [CategoryDto])
    )
)]
#[axum::debug_handler(state = crate::AppState)]
pub async fn list_active_categories(scope: RequestScope) -> Result<impl IntoResponse> {
    Ok(Json(scope.categories().get_active().await?))
}

#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    params(
        ("id" = i64, Path, description = "Category ID")
    ),
    responses(
        (status = 200, description = "Category", body = CategoryDto),
        (status = 404, description = "Category not found")
    )
)]
#[axum::debug_handler(state = crate::AppState)]
pub async fn get_category(scope: RequestScope, Path(id): Path<i64>) -> Result<impl IntoResponse> {
    let category = scope
        .categories()
        .get_by_id(id)
        .await?
        .ok_or_else(|| Error::not_found(Category::NAME, id))?;
    Ok(Json(category))
}

#[utoipa::path(
    post,
    path = "/api/categories",
    request_body = CategoryDto,
    responses(
        (status = 201, description = "Category created", body = CategoryDto),
        (status = 400, description = "Invalid payload or duplicate name"),
        (status = 401, description = "Missing or invalid token")
    )
)]
#[axum::debug_handler(state = crate::AppState)]
pub async fn create_category(
    scope: RequestScope,
    ValidatedJson(payload): ValidatedJson<CategoryDto>,
) -> Result<impl IntoResponse> {
    let category = scope.categories().create(&payload).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    put,
    path = "/api/categories/{id}",
    params(
        ("id" = i64, Path, description = "Category ID")
    ),
    request_body = CategoryDto,
    responses(
        (status = 200, description = "Category updated", body = CategoryDto),
        (status = 400, description = "Invalid payload or duplicate name"),
        (status = 404, description = "Category not found")
    )
)]
#[axum::debug_handler(state = crate::AppState)]
pub async fn update_category(
    scope: RequestScope,
    Path(id): Path<i64>,
    ValidatedJson(mut payload): ValidatedJson<CategoryDto>,
) -> Result<impl IntoResponse> {
    payload.id = id;
    Ok(Json(scope.categories().update(&payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    params(
        ("id" = i64, Path, description = "Category ID")
    ),
    responses(
        (status = 204, description = "Category soft deleted"),
        (status = 400, description = "Category still has products"),
        (status = 404, description = "Category not found")
    )
)]
#[axum::debug_handler(state = crate::AppState)]
pub async fn delete_category(scope: RequestScope, Path(id): Path<i64>) -> Result<impl IntoResponse> {
    scope.categories().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/categories/reorder",
    request_body = ReorderCategoriesPayload,
    responses(
        (status = 200, description = "Number of categories reordered")
    )
)]
#[axum::debug_handler(state = crate::AppState)]
pub async fn reorder_categories(
    scope: RequestScope,
    ValidatedJson(payload): ValidatedJson<ReorderCategoriesPayload>,
) -> Result<impl IntoResponse> {
    let updated = scope.categories().reorder(&payload.orders).await?;
    Ok(Json(json!({ "updated": updated })))
}

#[utoipa::path(
    get,
    path = "/api/categories/{id}/products",
    params(
        ("id" = i64, Path, description = "Category ID")
    ),
    responses(
        (status = 200, description = "Products in the category ordered by name")
    )
)]
#[axum::debug_handler(state = crate::AppState)]
pub async fn list_category_products(
    scope: RequestScope,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    Ok(Json(scope.products().get_by_category(id).await?))
}
