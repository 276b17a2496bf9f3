use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

pub type Result<T> = std::result::Result<T, Error>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Field name to the messages reported for it.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    /// A domain rule was broken. `code` is the machine readable identifier
    /// returned to clients (`SKU_UNIQUENESS`, `CATEGORY_HAS_PRODUCTS`, ...).
    #[error("{message}")]
    Business {
        code: String,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("{message}")]
    Validation {
        message: String,
        errors: FieldErrors,
    },

    #[error("Entity '{entity}' with key '{key}' was not found")]
    NotFound { entity: String, key: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// The row an update targeted no longer exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Excel export error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

impl Error {
    pub fn business(code: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Business {
            code: code.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Wraps an unexpected failure under a business code, keeping the cause.
    pub fn business_from(
        code: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Error::Business {
            code: code.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
            errors: FieldErrors::new(),
        }
    }

    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut errors = FieldErrors::new();
        errors.insert(field.into(), vec![message.clone()]);
        Error::Validation { message, errors }
    }

    pub fn not_found(entity: impl Into<String>, key: impl ToString) -> Self {
        Error::NotFound {
            entity: entity.into(),
            key: key.to_string(),
        }
    }

    /// Business, validation and not-found errors are surfaced as they are;
    /// services wrap everything else under an operation-specific code.
    pub fn is_domain(&self) -> bool {
        matches!(
            self,
            Error::Business { .. } | Error::Validation { .. } | Error::NotFound { .. }
        )
    }

    pub fn code(&self) -> &str {
        match self {
            Error::Business { code, .. } => code,
            Error::Validation { .. } => "VALIDATION_ERROR",
            Error::NotFound { .. } => "NOT_FOUND",
            Error::Unauthorized(_) => "UNAUTHORIZED",
            Error::Forbidden(_) => "FORBIDDEN",
            Error::Json(_) => "INVALID_JSON",
            _ => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Validation { .. } | Error::Business { .. } | Error::Json(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::Forbidden(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON body returned for every failed request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub status_code: u16,
    pub message: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorEnvelope {
    pub fn internal(detail: Option<String>) -> Self {
        Self {
            status_code: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            message: "An internal server error occurred".to_string(),
            error_code: "INTERNAL_ERROR".to_string(),
            errors: None,
            detail: detail.filter(|_| expose_details()),
        }
    }
}

/// Diagnostic detail is only attached outside production.
pub fn expose_details() -> bool {
    crate::config::CONFIG
        .get()
        .map(|config| !config.is_production())
        .unwrap_or(false)
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let envelope = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = ?self, "Request failed");
            ErrorEnvelope::internal(Some(format!("{:?}", self)))
        } else {
            let errors = match &self {
                Error::Validation { errors, .. } => Some(errors.clone()),
                _ => None,
            };
            ErrorEnvelope {
                status_code: status.as_u16(),
                message: self.to_string(),
                error_code: self.code().to_string(),
                errors,
                detail: None,
            }
        };

        (status, Json(envelope)).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) if db.constraint().is_some() => {
                Error::Constraint(db.message().to_string())
            }
            other => Error::Database(other),
        }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut errors = FieldErrors::new();
        for (field, failures) in err.field_errors() {
            let messages = failures
                .iter()
                .map(|failure| match &failure.message {
                    Some(message) => message.to_string(),
                    None => format!("{} is invalid ({})", field, failure.code),
                })
                .collect();
            errors.insert(field.to_string(), messages);
        }
        Error::Validation {
            message: "One or more validation errors occurred".to_string(),
            errors,
        }
    }
}

impl From<argon2::password_hash::Error> for Error {
    fn from(err: argon2::password_hash::Error) -> Self {
        Error::Internal(format!("Password hashing failed: {}", err))
    }
}
