//! Organizer endpoints.
//!
//! All of these require the `organizer` or `admin` role.
//!
//! - `PATCH /api/events/:event_id` - edit fields, reconciling capacity
//! - `POST /api/events/:event_id/waitlist/promote` - promote the waitlist head into a free slot
//! - `PUT /api/events/:event_id/attendees/:user_id/attended` - record a check-in

use super::parse_id;
use crate::WebResult;
use crate::extractors::CallerIdentity;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use gathering_core::providers::{
    AttendanceRepository, CommunityDirectory, EventRepository, NotificationDispatcher,
    SupportDirectory,
};
use gathering_core::{AttendanceRecord, Event, EventId, EventUpdate, Promotion, UserId};
use serde::{Deserialize, Serialize};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Response to an event update.
#[derive(Debug, Serialize)]
pub struct UpdateEventResponse {
    /// Event as committed
    pub event: Event,
    /// Capacity before the update (`null` = unlimited)
    pub previous_max_attendees: Option<u32>,
    /// Users moved off the waitlist, in FIFO order
    pub promotions: Vec<Promotion>,
}

/// Response to a manual promotion.
#[derive(Debug, Serialize)]
pub struct PromoteResponse {
    /// The promotion, or `null` when there was no free slot or nobody waiting
    pub promotion: Option<Promotion>,
}

/// Body of `PUT /attended`.
#[derive(Debug, Deserialize)]
pub struct MarkAttendedRequest {
    /// Whether the user showed up; `null` clears the flag
    pub attended: Option<bool>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Update an event.
///
/// `max_attendees` is tri-state: absent leaves it, `null` makes the event
/// unlimited, a number sets it. Lowering capacity below current attendance is
/// refused and leaves every field unchanged.
///
/// # Example
///
/// ```bash
/// curl -X PATCH http://localhost:8080/api/events/<event_id> \
///   -H "X-User-Id: <user_id>" -H "X-User-Role: organizer" \
///   -H "Content-Type: application/json" \
///   -d '{"max_attendees": 40}'
/// ```
///
/// # Errors
///
/// - 400 for a malformed id, an empty update, or invalid fields
/// - 403 for non-organizers, or capacity below current attendance
/// - 404 for an unknown event
pub async fn update_event<E, A, C, S, N>(
    State(state): State<AppState<E, A, C, S, N>>,
    caller: CallerIdentity,
    Path(event_id): Path<String>,
    payload: Result<Json<EventUpdate>, JsonRejection>,
) -> WebResult<Json<UpdateEventResponse>>
where
    E: EventRepository + 'static,
    A: AttendanceRepository + 'static,
    C: CommunityDirectory + 'static,
    S: SupportDirectory + 'static,
    N: NotificationDispatcher + 'static,
{
    caller.require_organizer()?;
    let event_id = parse_id::<EventId>(&event_id)?;
    let Json(update) = payload?;

    let outcome = state.engine.update_event(event_id, update).await?;

    tracing::info!(
        %event_id,
        organizer = %caller.user_id,
        promoted = outcome.promotions.len(),
        "Event updated"
    );

    Ok(Json(UpdateEventResponse {
        event: outcome.event,
        previous_max_attendees: outcome.previous_max,
        promotions: outcome.promotions,
    }))
}

/// Promote the head of the waitlist if a slot is free.
///
/// # Errors
///
/// - 400 for a malformed id
/// - 403 for non-organizers
/// - 404 for an unknown event
pub async fn promote_waitlist<E, A, C, S, N>(
    State(state): State<AppState<E, A, C, S, N>>,
    caller: CallerIdentity,
    Path(event_id): Path<String>,
) -> WebResult<Json<PromoteResponse>>
where
    E: EventRepository + 'static,
    A: AttendanceRepository + 'static,
    C: CommunityDirectory + 'static,
    S: SupportDirectory + 'static,
    N: NotificationDispatcher + 'static,
{
    caller.require_organizer()?;
    let event_id = parse_id::<EventId>(&event_id)?;

    let promotion = state.engine.promote_next(event_id).await?;
    Ok(Json(PromoteResponse { promotion }))
}

/// Record whether a user attended.
///
/// # Errors
///
/// - 400 for malformed ids or body
/// - 403 for non-organizers
/// - 404 when the user has no attendance record for the event
pub async fn mark_attended<E, A, C, S, N>(
    State(state): State<AppState<E, A, C, S, N>>,
    caller: CallerIdentity,
    Path((event_id, user_id)): Path<(String, String)>,
    payload: Result<Json<MarkAttendedRequest>, JsonRejection>,
) -> WebResult<Json<AttendanceRecord>>
where
    E: EventRepository + 'static,
    A: AttendanceRepository + 'static,
    C: CommunityDirectory + 'static,
    S: SupportDirectory + 'static,
    N: NotificationDispatcher + 'static,
{
    caller.require_organizer()?;
    let event_id = parse_id::<EventId>(&event_id)?;
    let user_id = parse_id::<UserId>(&user_id)?;
    let Json(request) = payload?;

    let record = state
        .engine
        .mark_attended(event_id, user_id, request.attended)
        .await?;
    Ok(Json(record))
}
