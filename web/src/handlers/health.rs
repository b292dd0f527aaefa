//! Liveness and readiness probes.

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use gathering_core::providers::{
    AttendanceRepository, CommunityDirectory, EventRepository, NotificationDispatcher,
    SupportDirectory,
};
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
}

/// Liveness check.
///
/// Returns 200 while the process is serving. Does not touch dependencies.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"ok","version":"0.1.0"}
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    /// Overall readiness
    pub ready: bool,
    /// Database reachable; `null` when running without one
    pub database: Option<bool>,
}

/// Readiness check.
///
/// Pings the database with `SELECT 1`. Returns 503 when it is unreachable.
pub async fn readiness_check<E, A, C, S, N>(
    State(state): State<AppState<E, A, C, S, N>>,
) -> (StatusCode, Json<ReadinessResponse>)
where
    E: EventRepository + 'static,
    A: AttendanceRepository + 'static,
    C: CommunityDirectory + 'static,
    S: SupportDirectory + 'static,
    N: NotificationDispatcher + 'static,
{
    let database = match &state.db {
        Some(pool) => Some(match sqlx::query("SELECT 1").execute(pool).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Readiness probe could not reach the database");
                false
            }
        }),
        None => None,
    };

    let ready = database.unwrap_or(true);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(ReadinessResponse { ready, database }))
}
