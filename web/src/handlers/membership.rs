//! `POST /api/communities/:community_id/membership/resolve`

use super::parse_id;
use crate::WebResult;
use crate::extractors::CallerIdentity;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
};
use gathering_core::providers::{
    AttendanceRepository, CommunityDirectory, EventRepository, NotificationDispatcher,
    SupportDirectory,
};
use gathering_core::{CommunityId, MembershipResolution};

/// Run the membership gate for the caller.
///
/// Joins a public community, or files (or reuses) a join request for a
/// private one.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/communities/<community_id>/membership/resolve \
///   -H "X-User-Id: <user_id>"
/// # {"is_member":true,"action_taken":"auto_joined"}
/// ```
///
/// # Errors
///
/// - 400 for a malformed id
/// - 403 when the caller is banned from a public community
/// - 404 for an unknown community
pub async fn resolve_membership<E, A, C, S, N>(
    State(state): State<AppState<E, A, C, S, N>>,
    caller: CallerIdentity,
    Path(community_id): Path<String>,
) -> WebResult<Json<MembershipResolution>>
where
    E: EventRepository + 'static,
    A: AttendanceRepository + 'static,
    C: CommunityDirectory + 'static,
    S: SupportDirectory + 'static,
    N: NotificationDispatcher + 'static,
{
    let community_id = parse_id::<CommunityId>(&community_id)?;

    let decision = state
        .engine
        .resolve_membership_for_attendance(community_id, caller.user_id)
        .await?;

    Ok(Json(MembershipResolution::from(&decision)))
}
