use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::{Error, Result};
use crate::middleware::auth::Claims;
use crate::repositories::UnitOfWork;
use crate::services::{
    category_service::CategoryService, export_service::ExportService,
    product_service::ProductService, search_service::SearchService, user_service::UserService,
};
use crate::AppState;

/// JSON body that has passed its `validator` rules. Malformed bodies and
/// rule violations both become a 400 validation envelope.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        let Json(data) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| Error::validation(rejection.body_text()))?;
        data.validate()?;
        Ok(ValidatedJson(data))
    }
}

/// Per-request unit of work. Writes made through it are attributed to the
/// authenticated user when the route carries bearer auth.
pub struct RequestScope {
    pub uow: Arc<UnitOfWork>,
    pub claims: Option<Claims>,
}

impl RequestScope {
    pub fn new(state: &AppState, claims: Option<Claims>) -> Self {
        let uow = UnitOfWork::with_clock(&state.database, state.clock.clone())
            .with_actor(claims.as_ref().map(|c| c.sub.clone()));
        Self {
            uow: Arc::new(uow),
            claims,
        }
    }

    pub fn claims(&self) -> Result<&Claims> {
        self.claims
            .as_ref()
            .ok_or_else(|| Error::Unauthorized("missing_authorization".to_string()))
    }

    pub fn products(&self) -> ProductService {
        ProductService::new(self.uow.clone())
    }

    pub fn categories(&self) -> CategoryService {
        CategoryService::new(self.uow.clone())
    }

    pub fn users(&self) -> UserService {
        UserService::new(self.uow.clone())
    }

    pub fn search(&self) -> SearchService {
        SearchService::new(self.uow.clone())
    }

    pub fn export(&self) -> ExportService {
        ExportService::new(self.uow.clone())
    }
}

#[async_trait]
impl FromRequestParts<AppState> for RequestScope {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let claims = parts.extensions.get::<Claims>().cloned();
        Ok(RequestScope::new(state, claims))
    }
}
