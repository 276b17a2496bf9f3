use std::any::Any;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use crate::error::ErrorEnvelope;

/// Renders a handler panic as the standard 500 error envelope. Used with
/// `CatchPanicLayer::custom`.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    tracing::error!(panic = %detail, "Handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorEnvelope::internal(Some(detail))),
    )
        .into_response()
}
