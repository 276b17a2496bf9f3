use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;

use crate::{
    dto::user_dto::{LoginPayload, RegisterPayload},
    error::{Error, Result},
    extract::{RequestScope, ValidatedJson},
    models::{Entity, User},
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/account/register",
    request_body = RegisterPayload,
    responses(
        (status = 201, description = "User registered", body = crate::dto::user_dto::UserDto),
        (status = 400, description = "Invalid payload or email already registered")
    )
)]
#[axum::debug_handler(state = crate::AppState)]
pub async fn register(
    scope: RequestScope,
    ValidatedJson(payload): ValidatedJson<RegisterPayload>,
) -> Result<impl IntoResponse> {
    let user = scope.users().register(&payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    post,
    path = "/api/account/login",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Signed access token", body = crate::dto::user_dto::LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    scope: RequestScope,
    ValidatedJson(payload): ValidatedJson<LoginPayload>,
) -> Result<impl IntoResponse> {
    let response = scope.users().login(&payload, &state.config).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/account/profile",
    responses(
        (status = 200, description = "The authenticated user", body = crate::dto::user_dto::UserDto),
        (status = 401, description = "Missing or invalid token")
    )
)]
#[axum::debug_handler(state = crate::AppState)]
pub async fn profile(scope: RequestScope) -> Result<impl IntoResponse> {
    let claims = scope.claims()?;
    let id = Uuid::parse_str(&claims.sub)
        .map_err(|_| Error::Unauthorized("invalid_subject".to_string()))?;
    let user = scope
        .users()
        .get_by_id(id)
        .await?
        .ok_or_else(|| Error::not_found(User::NAME, id))?;
    Ok(Json(user))
}
