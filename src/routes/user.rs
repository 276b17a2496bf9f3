use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;

use crate::{
    dto::user_dto::{UserDto, UserSearchQuery},
    error::{Error, Result},
    extract::{RequestScope, ValidatedJson},
    models::{Entity, User},
};

#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "All users", body = [UserDto]),
        (status = 401, description = "Missing or invalid token")
    )
)]
#[axum::debug_handler(state = crate::AppState)]
pub async fn list_users(scope: RequestScope) -> Result<impl IntoResponse> {
    Ok(Json(scope.users().get_all().await?))
}

#[utoipa::path(
    get,
    path = "/api/users/active",
    responses((status = 200, description = "Active users by name", body = [UserDto]))
)]
#[axum::debug_handler(state = crate::AppState)]
pub async fn list_active_users(scope: RequestScope) -> Result<impl IntoResponse> {
    Ok(Json(scope.users().get_active_users().await?))
}

#[utoipa::path(
    get,
    path = "/api/users/search",
    params(("q" = String, Query, description = "Matches first name, last name or email")),
    responses(
        (status = 200, description = "Matching users", body = [UserDto]),
        (status = 400, description = "Empty search term")
    )
)]
#[axum::debug_handler(state = crate::AppState)]
pub async fn search_users(
    scope: RequestScope,
    Query(query): Query<UserSearchQuery>,
) -> Result<impl IntoResponse> {
    let term = query.q.unwrap_or_default();
    Ok(Json(scope.users().search_users(&term).await?))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = UserDto),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler(state = crate::AppState)]
pub async fn get_user(scope: RequestScope, Path(id): Path<Uuid>) -> Result<impl IntoResponse> {
    let user = scope
        .users()
        .get_by_id(id)
        .await?
        .ok_or_else(|| Error::not_found(User::NAME, id))?;
    Ok(Json(user))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UserDto,
    responses(
        (status = 200, description = "User updated", body = UserDto),
        (status = 400, description = "Invalid payload or email taken"),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler(state = crate::AppState)]
pub async fn update_user(
    scope: RequestScope,
    Path(id): Path<Uuid>,
    ValidatedJson(mut payload): ValidatedJson<UserDto>,
) -> Result<impl IntoResponse> {
    payload.id = id;
    Ok(Json(scope.users().update(&payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "User soft deleted"),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler(state = crate::AppState)]
pub async fn delete_user(scope: RequestScope, Path(id): Path<Uuid>) -> Result<impl IntoResponse> {
    scope.users().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
