use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

use crate::{repositories::UnitOfWork, AppState};

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Process is alive")
    )
)]
#[axum::debug_handler]
pub async fn health() -> impl IntoResponse {
    let body = json!({
        "status": "ok",
    });
    (StatusCode::OK, Json(body))
}

#[utoipa::path(
    get,
    path = "/health/ready",
    responses(
        (status = 200, description = "Storage reachable, application ready"),
        (status = 503, description = "Storage unavailable")
    )
)]
#[axum::debug_handler]
pub async fn ready(State(state): State<AppState>) -> Response {
    let application = json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.app_env.as_str(),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    });
    let backend = state.database.backend_name();

    let uow = UnitOfWork::with_clock(&state.database, state.clock.clone());
    match uow.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "checks": {
                    "database": { "status": "healthy", "backend": backend },
                },
                "application": application,
            })),
        )
            .into_response(),
        Err(err) => {
            warn!(error = ?err, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unavailable",
                    "checks": {
                        "database": { "status": "unhealthy", "backend": backend },
                    },
                    "application": application,
                })),
            )
                .into_response()
        }
    }
}
