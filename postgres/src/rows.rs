//! Row decoding and integer conversions shared by the repositories.

use crate::error::db_error;
use gathering_core::error::{AttendanceError, Result};
use gathering_core::types::{
    AttendanceRecord, AttendanceStatus, Community, CommunityId, Event, EventId, JoinRequest,
    JoinRequestId, JoinRequestStatus, Membership, MembershipRole, UserId,
};
use sqlx::Row;
use sqlx::postgres::PgRow;

pub const EVENT_COLUMNS: &str = "id, community_id, title, description, starts_at, ends_at, \
     timezone, max_attendees, current_attendees, supporters_only, created_at, updated_at";

pub const RECORD_COLUMNS: &str =
    "seq, event_id, user_id, status, attended, created_at, updated_at";

/// Non-negative `INTEGER` column to `u32`.
pub fn to_u32(value: i32, column: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| AttendanceError::DatabaseError(format!("Negative {column}: {value}")))
}

/// `u32` to an `INTEGER` bind value.
pub fn to_i32(value: u32, column: &str) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| AttendanceError::InvalidArgument(format!("{column} out of range: {value}")))
}

/// `COUNT(*)` result to `u32`.
pub fn count_to_u32(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

pub fn event_from_row(row: &PgRow) -> Result<Event> {
    let decode = db_error("Failed to decode event");
    let max_attendees: Option<i32> = row.try_get("max_attendees").map_err(&decode)?;
    let current_attendees: i32 = row.try_get("current_attendees").map_err(&decode)?;

    Ok(Event {
        id: EventId::from_uuid(row.try_get("id").map_err(&decode)?),
        community_id: CommunityId::from_uuid(row.try_get("community_id").map_err(&decode)?),
        title: row.try_get("title").map_err(&decode)?,
        description: row.try_get("description").map_err(&decode)?,
        starts_at: row.try_get("starts_at").map_err(&decode)?,
        ends_at: row.try_get("ends_at").map_err(&decode)?,
        timezone: row.try_get("timezone").map_err(&decode)?,
        max_attendees: max_attendees
            .map(|max| to_u32(max, "max_attendees"))
            .transpose()?,
        current_attendees: to_u32(current_attendees, "current_attendees")?,
        supporters_only: row.try_get("supporters_only").map_err(&decode)?,
        created_at: row.try_get("created_at").map_err(&decode)?,
        updated_at: row.try_get("updated_at").map_err(&decode)?,
    })
}

pub fn record_from_row(row: &PgRow) -> Result<AttendanceRecord> {
    let decode = db_error("Failed to decode attendance record");
    let status: String = row.try_get("status").map_err(&decode)?;

    Ok(AttendanceRecord {
        event_id: EventId::from_uuid(row.try_get("event_id").map_err(&decode)?),
        user_id: UserId::from_uuid(row.try_get("user_id").map_err(&decode)?),
        status: status
            .parse::<AttendanceStatus>()
            .map_err(|e| AttendanceError::DatabaseError(e.to_string()))?,
        attended: row.try_get("attended").map_err(&decode)?,
        seq: row.try_get("seq").map_err(&decode)?,
        created_at: row.try_get("created_at").map_err(&decode)?,
        updated_at: row.try_get("updated_at").map_err(&decode)?,
    })
}

pub fn community_from_row(row: &PgRow) -> Result<Community> {
    let decode = db_error("Failed to decode community");
    Ok(Community {
        id: CommunityId::from_uuid(row.try_get("id").map_err(&decode)?),
        name: row.try_get("name").map_err(&decode)?,
        is_private: row.try_get("is_private").map_err(&decode)?,
    })
}

pub fn membership_from_row(row: &PgRow) -> Result<Membership> {
    let decode = db_error("Failed to decode membership");
    let role: String = row.try_get("role").map_err(&decode)?;
    Ok(Membership {
        community_id: CommunityId::from_uuid(row.try_get("community_id").map_err(&decode)?),
        user_id: UserId::from_uuid(row.try_get("user_id").map_err(&decode)?),
        role: MembershipRole::parse(&role)?,
        joined_at: row.try_get("joined_at").map_err(&decode)?,
    })
}

pub fn join_request_from_row(row: &PgRow) -> Result<JoinRequest> {
    let decode = db_error("Failed to decode join request");
    let status: String = row.try_get("status").map_err(&decode)?;
    Ok(JoinRequest {
        id: JoinRequestId::from_uuid(row.try_get("id").map_err(&decode)?),
        community_id: CommunityId::from_uuid(row.try_get("community_id").map_err(&decode)?),
        user_id: UserId::from_uuid(row.try_get("user_id").map_err(&decode)?),
        status: JoinRequestStatus::parse(&status)?,
        created_at: row.try_get("created_at").map_err(&decode)?,
    })
}
