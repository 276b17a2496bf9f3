use axum::{
    extract::Query,
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};

use crate::{
    dto::export_dto::ExportQuery,
    error::Result,
    extract::RequestScope,
    services::export_service::ExportFile,
};

fn attachment(file: ExportFile) -> impl IntoResponse {
    let disposition = format!("attachment; filename=\"{}\"", file.file_name);
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
}

#[utoipa::path(
    get,
    path = "/api/export/products",
    params(
        ("format" = Option<String>, Query, description = "csv, excel, pdf or json"),
        ("active_only" = Option<bool>, Query, description = "Only active products"),
        ("category_id" = Option<i64>, Query, description = "Only products of this category")
    ),
    responses(
        (status = 200, description = "Products file attachment"),
        (status = 401, description = "Missing or invalid token")
    )
)]
#[axum::debug_handler(state = crate::AppState)]
pub async fn export_products(
    scope: RequestScope,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse> {
    let file = scope.export().export_products(&query).await?;
    Ok(attachment(file))
}

#[utoipa::path(
    get,
    path = "/api/export/categories",
    params(
        ("format" = Option<String>, Query, description = "csv, excel, pdf or json"),
        ("active_only" = Option<bool>, Query, description = "Only active categories")
    ),
    responses((status = 200, description = "Categories file attachment"))
)]
#[axum::debug_handler(state = crate::AppState)]
pub async fn export_categories(
    scope: RequestScope,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse> {
    let file = scope.export().export_categories(&query).await?;
    Ok(attachment(file))
}

#[utoipa::path(
    get,
    path = "/api/export/users",
    params(("format" = Option<String>, Query, description = "csv, excel, pdf or json")),
    responses((status = 200, description = "Users file attachment"))
)]
#[axum::debug_handler(state = crate::AppState)]
pub async fn export_users(
    scope: RequestScope,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse> {
    let file = scope.export().export_users(&query).await?;
    Ok(attachment(file))
}

#[utoipa::path(
    get,
    path = "/api/export/stats",
    responses((status = 200, description = "Record counts per entity", body = crate::dto::export_dto::ExportStats))
)]
#[axum::debug_handler(state = crate::AppState)]
pub async fn export_stats(scope: RequestScope) -> Result<impl IntoResponse> {
    Ok(Json(scope.export().stats().await?))
}
