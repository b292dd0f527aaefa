//! Router composition.

use crate::handlers::{attendance, events, health, membership};
use crate::middleware::correlation_id_layer;
use crate::state::AppState;
use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, patch, post, put},
};
use gathering_core::providers::{
    AttendanceRepository, CommunityDirectory, EventRepository, NotificationDispatcher,
    SupportDirectory,
};
use gathering_runtime::metrics::MetricsServer;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Build the application router.
///
/// # Routes
///
/// ## Attendance
/// - `PUT /api/events/:event_id/attendance` - Set the caller's status
/// - `GET /api/events/:event_id/attendance` - Caller's status
/// - `GET /api/events/:event_id/attendees` - Attendee listing
/// - `GET /api/events/:event_id/attendance/summary` - Per-status counts
///
/// ## Organizer
/// - `PATCH /api/events/:event_id` - Update event fields and capacity
/// - `POST /api/events/:event_id/waitlist/promote` - Promote into a free slot
/// - `PUT /api/events/:event_id/attendees/:user_id/attended` - Record a check-in
///
/// ## Membership
/// - `POST /api/communities/:community_id/membership/resolve` - Run the membership gate
///
/// ## Probes
/// - `GET /health`, `GET /ready`
pub fn app_router<E, A, C, S, N>(state: AppState<E, A, C, S, N>) -> Router
where
    E: EventRepository + 'static,
    A: AttendanceRepository + 'static,
    C: CommunityDirectory + 'static,
    S: SupportDirectory + 'static,
    N: NotificationDispatcher + 'static,
{
    let api_routes = Router::new()
        // Attendance
        .route(
            "/events/:event_id/attendance",
            put(attendance::set_attendance::<E, A, C, S, N>)
                .get(attendance::get_attendance::<E, A, C, S, N>),
        )
        .route("/events/:event_id/attendees", get(attendance::list_attendees::<E, A, C, S, N>))
        .route(
            "/events/:event_id/attendance/summary",
            get(attendance::attendance_summary::<E, A, C, S, N>),
        )
        // Organizer
        .route("/events/:event_id", patch(events::update_event::<E, A, C, S, N>))
        .route(
            "/events/:event_id/waitlist/promote",
            post(events::promote_waitlist::<E, A, C, S, N>),
        )
        .route(
            "/events/:event_id/attendees/:user_id/attended",
            put(events::mark_attended::<E, A, C, S, N>),
        )
        // Membership
        .route(
            "/communities/:community_id/membership/resolve",
            post(membership::resolve_membership::<E, A, C, S, N>),
        );

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check::<E, A, C, S, N>))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(state)
}

/// Router serving `GET /metrics` in Prometheus text format.
pub fn metrics_router(metrics: Arc<MetricsServer>) -> Router {
    Router::new()
        .route("/metrics", get(render_metrics))
        .with_state(metrics)
}

#[allow(clippy::unused_async)]
async fn render_metrics(State(metrics): State<Arc<MetricsServer>>) -> impl IntoResponse {
    match metrics.render() {
        Some(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response(),
    }
}
