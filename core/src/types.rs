//! Domain types for event attendance.
//!
//! Identifiers, the attendance status enum, and the entities the engine reads
//! and writes: events, attendance records, communities, memberships, and join
//! requests.

use crate::error::{AttendanceError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random `EventId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `EventId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EventId {
    type Err = AttendanceError;

    fn from_str(s: &str) -> Result<Self> {
        parse_uuid(s, "event id").map(Self)
    }
}

/// Unique identifier for a user
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random `UserId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `UserId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = AttendanceError;

    fn from_str(s: &str) -> Result<Self> {
        parse_uuid(s, "user id").map(Self)
    }
}

/// Unique identifier for a community
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommunityId(Uuid);

impl CommunityId {
    /// Creates a new random `CommunityId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `CommunityId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CommunityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CommunityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CommunityId {
    type Err = AttendanceError;

    fn from_str(s: &str) -> Result<Self> {
        parse_uuid(s, "community id").map(Self)
    }
}

/// Unique identifier for a community join request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JoinRequestId(Uuid);

impl JoinRequestId {
    /// Creates a new random `JoinRequestId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `JoinRequestId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for JoinRequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JoinRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn parse_uuid(s: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(s.trim())
        .map_err(|_| AttendanceError::InvalidArgument(format!("{what} is not a valid UUID: {s}")))
}

// ============================================================================
// Attendance Status
// ============================================================================

/// RSVP status of one user for one event.
///
/// There is no "unset" variant: a missing record is the implicit initial state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    /// Holds one of the event's capacity slots
    Attending,
    /// Interested, holds no slot
    Maybe,
    /// Declined or left
    NotAttending,
    /// Queued for a slot, FIFO by record creation
    Waitlisted,
}

impl AttendanceStatus {
    /// All statuses in listing priority order.
    pub const ALL: [Self; 4] = [
        Self::Attending,
        Self::Maybe,
        Self::Waitlisted,
        Self::NotAttending,
    ];

    /// Convert status to database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Attending => "attending",
            Self::Maybe => "maybe",
            Self::NotAttending => "not_attending",
            Self::Waitlisted => "waitlisted",
        }
    }

    /// Listing priority: attending < maybe < waitlisted < everything else.
    #[must_use]
    pub const fn listing_priority(&self) -> u8 {
        match self {
            Self::Attending => 0,
            Self::Maybe => 1,
            Self::Waitlisted => 2,
            Self::NotAttending => 3,
        }
    }

    /// Whether this status occupies a capacity slot.
    #[must_use]
    pub const fn holds_slot(&self) -> bool {
        matches!(self, Self::Attending)
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = AttendanceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "attending" => Ok(Self::Attending),
            "maybe" => Ok(Self::Maybe),
            "not_attending" => Ok(Self::NotAttending),
            "waitlisted" => Ok(Self::Waitlisted),
            other => Err(AttendanceError::InvalidArgument(format!(
                "invalid attendance status '{other}', expected one of: attending, maybe, not_attending, waitlisted"
            ))),
        }
    }
}

// ============================================================================
// Event
// ============================================================================

/// A schedulable activity owned by a community.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event ID
    pub id: EventId,
    /// Owning community
    pub community_id: CommunityId,
    /// Title (used in notifications)
    pub title: String,
    /// Optional long description
    pub description: Option<String>,
    /// Start time (UTC)
    pub starts_at: DateTime<Utc>,
    /// End time (UTC)
    pub ends_at: DateTime<Utc>,
    /// Originating timezone label, display only
    pub timezone: String,
    /// Capacity; `None` means unlimited
    pub max_attendees: Option<u32>,
    /// Denormalized count of `attending` records
    pub current_attendees: u32,
    /// Restricted to active supporters of the community
    pub supporters_only: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Whether the event has ended at `now`.
    #[must_use]
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        now >= self.ends_at
    }

    /// Capacity snapshot used by the transition planner.
    #[must_use]
    pub const fn capacity(&self) -> CapacitySnapshot {
        CapacitySnapshot {
            max_attendees: self.max_attendees,
            current_attendees: self.current_attendees,
        }
    }
}

/// Capacity limit plus the current occupancy counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CapacitySnapshot {
    /// Capacity; `None` means unlimited
    pub max_attendees: Option<u32>,
    /// Current `attending` count
    pub current_attendees: u32,
}

impl CapacitySnapshot {
    /// Whether one more attendee fits.
    #[must_use]
    pub const fn has_free_slot(&self) -> bool {
        match self.max_attendees {
            None => true,
            Some(max) => self.current_attendees < max,
        }
    }

    /// Number of free slots, `None` when unlimited.
    #[must_use]
    pub const fn free_slots(&self) -> Option<u32> {
        match self.max_attendees {
            None => None,
            Some(max) => Some(max.saturating_sub(self.current_attendees)),
        }
    }
}

// ============================================================================
// Attendance Record
// ============================================================================

/// One RSVP row, unique per (event, user).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// Event
    pub event_id: EventId,
    /// User
    pub user_id: UserId,
    /// Current status
    pub status: AttendanceStatus,
    /// Real-world attendance, set post-hoc by an organizer
    pub attended: Option<bool>,
    /// Insertion sequence; breaks `created_at` ties in waitlist order
    pub seq: i64,
    /// First RSVP time; the FIFO key for the waitlist
    pub created_at: DateTime<Utc>,
    /// Last status change
    pub updated_at: DateTime<Utc>,
}

/// Per-status counts for an event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceSummary {
    /// `attending` records
    pub attending: u32,
    /// `maybe` records
    pub maybe: u32,
    /// `not_attending` records
    pub not_attending: u32,
    /// `waitlisted` records
    pub waitlisted: u32,
    /// Event capacity
    pub max_attendees: Option<u32>,
    /// Denormalized counter on the event
    pub current_attendees: u32,
}

impl AttendanceSummary {
    /// Count for one status.
    #[must_use]
    pub const fn count(&self, status: AttendanceStatus) -> u32 {
        match status {
            AttendanceStatus::Attending => self.attending,
            AttendanceStatus::Maybe => self.maybe,
            AttendanceStatus::NotAttending => self.not_attending,
            AttendanceStatus::Waitlisted => self.waitlisted,
        }
    }
}

// ============================================================================
// Communities & Membership
// ============================================================================

/// A community hosting events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Community {
    /// Community ID
    pub id: CommunityId,
    /// Display name (used in notifications)
    pub name: String,
    /// Private communities require an approved join request
    pub is_private: bool,
}

/// Role of a community member.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipRole {
    /// Regular member
    Member,
    /// Moderator
    Moderator,
    /// Administrator
    Admin,
}

impl MembershipRole {
    /// Convert role to database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Moderator => "moderator",
            Self::Admin => "admin",
        }
    }

    /// Parse role from database string.
    ///
    /// # Errors
    ///
    /// Returns [`AttendanceError::DatabaseError`] for an unknown role.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "member" => Ok(Self::Member),
            "moderator" => Ok(Self::Moderator),
            "admin" => Ok(Self::Admin),
            other => Err(AttendanceError::DatabaseError(format!(
                "Invalid membership role: {other}"
            ))),
        }
    }
}

/// A user's membership in a community.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    /// Community
    pub community_id: CommunityId,
    /// Member
    pub user_id: UserId,
    /// Role
    pub role: MembershipRole,
    /// When the membership was created
    pub joined_at: DateTime<Utc>,
}

/// Status of a join request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinRequestStatus {
    /// Awaiting an admin decision
    Pending,
    /// Approved; a membership exists
    Approved,
    /// Rejected
    Rejected,
}

impl JoinRequestStatus {
    /// Convert status to database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parse status from database string.
    ///
    /// # Errors
    ///
    /// Returns [`AttendanceError::DatabaseError`] for an unknown status.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(AttendanceError::DatabaseError(format!(
                "Invalid join request status: {other}"
            ))),
        }
    }
}

/// Request to join a private community.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    /// Request ID
    pub id: JoinRequestId,
    /// Community
    pub community_id: CommunityId,
    /// Requesting user
    pub user_id: UserId,
    /// Current status
    pub status: JoinRequestStatus,
    /// When the request was created
    pub created_at: DateTime<Utc>,
}
