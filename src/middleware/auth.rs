use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::utils::token::decode_access_token;
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub email: Option<String>,
    pub exp: usize,
    pub role: Option<String>,
}

/// Rejects requests without a valid `Authorization: Bearer` token and makes
/// the decoded [`Claims`] available to handlers as a request extension.
pub async fn require_bearer_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(auth_header) = req.headers().get(AUTHORIZATION) else {
        return Error::Unauthorized("missing_authorization".to_string()).into_response();
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return Error::Unauthorized("bad_authorization".to_string()).into_response();
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return Error::Unauthorized("unsupported_scheme".to_string()).into_response();
    };

    match decode_access_token(&state.config.jwt_secret, token.trim()) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(err) => err.into_response(),
    }
}
