use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::{
    dto::product_dto::{BulkStatusPayload, ProductDto, ProductListQuery, UpdateStockPayload},
    error::{Error, Result},
    extract::{RequestScope, ValidatedJson},
    models::{Entity, Product},
};

#[utoipa::path(
    get,
    path = "/api/products",
    params(
        ("page" = Option<usize>, Query, description = "Page number, from 1"),
        ("page_size" = Option<usize>, Query, description = "Items per page, 1 to 100"),
        ("category_id" = Option<i64>, Query, description = "Filter by category"),
        ("is_active" = Option<bool>, Query, description = "Filter by active flag"),
        ("is_featured" = Option<bool>, Query, description = "Filter by featured flag"),
        ("search" = Option<String>, Query, description = "Search in name, description and SKU"),
        ("sort_by" = Option<String>, Query, description = "name, price, stock, category or created"),
        ("sort_desc" = Option<bool>, Query, description = "Sort descending")
    ),
    responses(
        (status = 200, description = "One page of products", body = crate::dto::paging::PagedResult<ProductDto>)
    )
)]
#[axum::debug_handler(state = crate::AppState)]
pub async fn list_products(
    scope: RequestScope,
    Query(query): Query<ProductListQuery>,
) -> Result<impl IntoResponse> {
    Ok(Json(scope.products().get_paged(&query).await?))
}

#[utoipa::path(
    get,
    path = "/api/products/active",
    responses((status = 200, description = "Active products", body = [ProductDto]))
)]
#[axum::debug_handler(state = crate::AppState)]
pub async fn list_active_products(scope: RequestScope) -> Result<impl IntoResponse> {
    Ok(Json(scope.products().get_active().await?))
}

#[utoipa::path(
    get,
    path = "/api/products/featured",
    responses((status = 200, description = "Featured active products", body = [ProductDto]))
)]
#[axum::debug_handler(state = crate::AppState)]
pub async fn list_featured_products(scope: RequestScope) -> Result<impl IntoResponse> {
    Ok(Json(scope.products().get_featured().await?))
}

#[utoipa::path(
    get,
    path = "/api/products/on-sale",
    responses((status = 200, description = "Active products with a sale price", body = [ProductDto]))
)]
#[axum::debug_handler(state = crate::AppState)]
pub async fn list_sale_products(scope: RequestScope) -> Result<impl IntoResponse> {
    Ok(Json(scope.products().get_on_sale().await?))
}

#[utoipa::path(
    get,
    path = "/api/products/low-stock",
    responses((status = 200, description = "Active products with stock at or below 5", body = [ProductDto]))
)]
#[axum::debug_handler(state = crate::AppState)]
pub async fn list_low_stock_products(scope: RequestScope) -> Result<impl IntoResponse> {
    Ok(Json(scope.products().get_low_stock().await?))
}

#[utoipa::path(
    get,
    path = "/api/products/sku/{sku}",
    params(("sku" = String, Path, description = "Stock keeping unit")),
    responses(
        (status = 200, description = "Product", body = ProductDto),
        (status = 404, description = "No product with this SKU")
    )
)]
#[axum::debug_handler(state = crate::AppState)]
pub async fn get_product_by_sku(
    scope: RequestScope,
    Path(sku): Path<String>,
) -> Result<impl IntoResponse> {
    let product = scope
        .products()
        .get_by_sku(&sku)
        .await?
        .ok_or_else(|| Error::not_found(Product::NAME, sku.trim()))?;
    Ok(Json(product))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product", body = ProductDto),
        (status = 404, description = "Product not found")
    )
)]
#[axum::debug_handler(state = crate::AppState)]
pub async fn get_product(scope: RequestScope, Path(id): Path<i64>) -> Result<impl IntoResponse> {
    let product = scope
        .products()
        .get_by_id(id)
        .await?
        .ok_or_else(|| Error::not_found(Product::NAME, id))?;
    Ok(Json(product))
}

#[utoipa::path(
    post,
    path = "/api/products",
    request_body = ProductDto,
    responses(
        (status = 201, description = "Product created", body = ProductDto),
        (status = 400, description = "Validation or business rule failure"),
        (status = 401, description = "Missing or invalid token")
    )
)]
#[axum::debug_handler(state = crate::AppState)]
pub async fn create_product(
    scope: RequestScope,
    ValidatedJson(payload): ValidatedJson<ProductDto>,
) -> Result<impl IntoResponse> {
    let product = scope.products().create(&payload).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

#[utoipa::path(
    put,
    path = "/api/products/{id}",
    params(("id" = i64, Path, description = "Product ID")),
    request_body = ProductDto,
    responses(
        (status = 200, description = "Product updated", body = ProductDto),
        (status = 400, description = "Validation or business rule failure"),
        (status = 404, description = "Product not found")
    )
)]
#[axum::debug_handler(state = crate::AppState)]
pub async fn update_product(
    scope: RequestScope,
    Path(id): Path<i64>,
    ValidatedJson(mut payload): ValidatedJson<ProductDto>,
) -> Result<impl IntoResponse> {
    payload.id = id;
    Ok(Json(scope.products().update(&payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(("id" = i64, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Product soft deleted"),
        (status = 404, description = "Product not found")
    )
)]
#[axum::debug_handler(state = crate::AppState)]
pub async fn delete_product(scope: RequestScope, Path(id): Path<i64>) -> Result<impl IntoResponse> {
    scope.products().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    patch,
    path = "/api/products/{id}/stock",
    params(("id" = i64, Path, description = "Product ID")),
    request_body = UpdateStockPayload,
    responses(
        (status = 200, description = "Stock updated", body = ProductDto),
        (status = 404, description = "Product not found")
    )
)]
#[axum::debug_handler(state = crate::AppState)]
pub async fn update_product_stock(
    scope: RequestScope,
    Path(id): Path<i64>,
    ValidatedJson(payload): ValidatedJson<UpdateStockPayload>,
) -> Result<impl IntoResponse> {
    Ok(Json(scope.products().update_stock(id, payload.quantity).await?))
}

#[utoipa::path(
    post,
    path = "/api/products/bulk-status",
    request_body = BulkStatusPayload,
    responses(
        (status = 200, description = "Number of products updated"),
        (status = 400, description = "More than 100 ids")
    )
)]
#[axum::debug_handler(state = crate::AppState)]
pub async fn bulk_update_product_status(
    scope: RequestScope,
    ValidatedJson(payload): ValidatedJson<BulkStatusPayload>,
) -> Result<impl IntoResponse> {
    let updated = scope
        .products()
        .bulk_update_active_status(&payload.ids, payload.is_active)
        .await?;
    Ok(Json(json!({ "updated": updated })))
}
