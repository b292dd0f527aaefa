//! RSVP endpoints.
//!
//! - `PUT /api/events/:event_id/attendance` - set the caller's status
//! - `GET /api/events/:event_id/attendance` - the caller's status and waitlist position
//! - `GET /api/events/:event_id/attendees` - paginated attendee listing
//! - `GET /api/events/:event_id/attendance/summary` - per-status counts

use super::parse_id;
use crate::WebResult;
use crate::extractors::CallerIdentity;
use crate::state::AppState;
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use gathering_core::providers::{
    AttendanceRepository, CommunityDirectory, EventRepository, NotificationDispatcher,
    SupportDirectory,
};
use gathering_core::{
    AttendanceRecord, AttendanceResult, AttendanceStatus, AttendanceStatusView,
    AttendanceSummary, AttendeeListParams, EventId, Page,
};
use serde::Deserialize;

// ============================================================================
// Request Types
// ============================================================================

/// Body of `PUT /attendance`.
#[derive(Debug, Deserialize)]
pub struct SetAttendanceRequest {
    /// Requested status
    pub status: AttendanceStatus,
}

// ============================================================================
// Handlers
// ============================================================================

/// Set the caller's attendance status.
///
/// # Example
///
/// ```bash
/// curl -X PUT http://localhost:8080/api/events/<event_id>/attendance \
///   -H "X-User-Id: <user_id>" \
///   -H "Content-Type: application/json" \
///   -d '{"status":"attending"}'
/// # {"status":"waitlisted","waitlist_position":3}
/// ```
///
/// # Errors
///
/// - 400 for a malformed id or body
/// - 401 without a caller identity
/// - 403 when the caller may not attend (ended, banned, pending join request, supporters only)
/// - 404 for an unknown event
/// - 409 when the event stays contended after retries
pub async fn set_attendance<E, A, C, S, N>(
    State(state): State<AppState<E, A, C, S, N>>,
    caller: CallerIdentity,
    Path(event_id): Path<String>,
    payload: Result<Json<SetAttendanceRequest>, JsonRejection>,
) -> WebResult<Json<AttendanceResult>>
where
    E: EventRepository + 'static,
    A: AttendanceRepository + 'static,
    C: CommunityDirectory + 'static,
    S: SupportDirectory + 'static,
    N: NotificationDispatcher + 'static,
{
    let event_id = parse_id::<EventId>(&event_id)?;
    let Json(request) = payload?;

    let result = state
        .engine
        .set_attendance_status(event_id, caller.user_id, request.status)
        .await?;

    Ok(Json(result))
}

/// The caller's attendance status.
///
/// `status` is `null` when the caller never responded.
///
/// # Errors
///
/// - 400 for a malformed id
/// - 401 without a caller identity
/// - 404 for an unknown event
pub async fn get_attendance<E, A, C, S, N>(
    State(state): State<AppState<E, A, C, S, N>>,
    caller: CallerIdentity,
    Path(event_id): Path<String>,
) -> WebResult<Json<AttendanceStatusView>>
where
    E: EventRepository + 'static,
    A: AttendanceRepository + 'static,
    C: CommunityDirectory + 'static,
    S: SupportDirectory + 'static,
    N: NotificationDispatcher + 'static,
{
    let event_id = parse_id::<EventId>(&event_id)?;
    let view = state
        .engine
        .get_attendance_status(event_id, caller.user_id)
        .await?;
    Ok(Json(view))
}

/// List an event's attendees.
///
/// Ordered attending, maybe, waitlisted, not attending; FIFO within a status.
///
/// # Example
///
/// ```bash
/// curl "http://localhost:8080/api/events/<event_id>/attendees?page=1&limit=20&status=waitlisted" \
///   -H "X-User-Id: <user_id>"
/// ```
///
/// # Errors
///
/// - 400 for a malformed id or out-of-range paging
/// - 401 without a caller identity
/// - 404 for an unknown event
pub async fn list_attendees<E, A, C, S, N>(
    State(state): State<AppState<E, A, C, S, N>>,
    _caller: CallerIdentity,
    Path(event_id): Path<String>,
    params: Result<Query<AttendeeListParams>, QueryRejection>,
) -> WebResult<Json<Page<AttendanceRecord>>>
where
    E: EventRepository + 'static,
    A: AttendanceRepository + 'static,
    C: CommunityDirectory + 'static,
    S: SupportDirectory + 'static,
    N: NotificationDispatcher + 'static,
{
    let event_id = parse_id::<EventId>(&event_id)?;
    let Query(params) = params?;

    let page = state.engine.get_event_attendees(event_id, params).await?;
    Ok(Json(page))
}

/// Per-status counts next to the stored counter.
///
/// # Errors
///
/// - 400 for a malformed id
/// - 401 without a caller identity
/// - 404 for an unknown event
pub async fn attendance_summary<E, A, C, S, N>(
    State(state): State<AppState<E, A, C, S, N>>,
    _caller: CallerIdentity,
    Path(event_id): Path<String>,
) -> WebResult<Json<AttendanceSummary>>
where
    E: EventRepository + 'static,
    A: AttendanceRepository + 'static,
    C: CommunityDirectory + 'static,
    S: SupportDirectory + 'static,
    N: NotificationDispatcher + 'static,
{
    let event_id = parse_id::<EventId>(&event_id)?;
    let summary = state.engine.attendance_summary(event_id).await?;
    Ok(Json(summary))
}
