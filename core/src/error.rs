//! Error types for attendance operations.

use crate::types::{EventId, JoinRequestId};
use std::fmt;
use thiserror::Error;

/// Result type alias for attendance operations.
pub type Result<T> = std::result::Result<T, AttendanceError>;

/// Error taxonomy for the attendance engine.
///
/// Validation and eligibility failures are raised before any mutation.
/// Anything raised inside a repository transaction means the transaction
/// was rolled back.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AttendanceError {
    // ═══════════════════════════════════════════════════════════
    // Caller Errors
    // ═══════════════════════════════════════════════════════════

    /// Requested entity does not exist.
    #[error("{resource} not found: {id}")]
    NotFound {
        /// Kind of entity ("event", "community", "attendance record")
        resource: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Malformed input (unknown status, bad id, invalid paging or update).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Eligibility or policy gate refused the operation.
    #[error("Forbidden: {reason}")]
    Forbidden {
        /// Why the operation was refused
        reason: ForbiddenReason,
    },

    // ═══════════════════════════════════════════════════════════
    // Concurrency
    // ═══════════════════════════════════════════════════════════

    /// The store aborted the transaction because of a concurrent writer.
    #[error("Conflict: {0}")]
    Conflict(String),

    // ═══════════════════════════════════════════════════════════
    // System Errors
    // ═══════════════════════════════════════════════════════════

    /// Database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Internal error (should not be exposed to users).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Reason attached to [`AttendanceError::Forbidden`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForbiddenReason {
    /// User holds an active ban in the event's community.
    Banned,
    /// Community is private; attendance waits on this join request.
    JoinRequestPending {
        /// The pending request
        request_id: JoinRequestId,
    },
    /// Event requires an active support subscription.
    SupportersOnly,
    /// Event has already ended.
    EventEnded,
    /// Capacity change would drop below confirmed attendance.
    CapacityBelowAttendance {
        /// Requested capacity
        requested: u32,
        /// Current `attending` count
        attending: u32,
    },
}

impl ForbiddenReason {
    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Banned => "BANNED",
            Self::JoinRequestPending { .. } => "JOIN_REQUEST_PENDING",
            Self::SupportersOnly => "SUPPORTERS_ONLY",
            Self::EventEnded => "EVENT_ENDED",
            Self::CapacityBelowAttendance { .. } => "CAPACITY_BELOW_ATTENDANCE",
        }
    }
}

impl fmt::Display for ForbiddenReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Banned => write!(f, "you are banned from this community"),
            Self::JoinRequestPending { .. } => write!(
                f,
                "this community is private; your join request is pending and you cannot attend its events until an admin approves it"
            ),
            Self::SupportersOnly => write!(
                f,
                "this event is for supporters only; an active support subscription is required"
            ),
            Self::EventEnded => write!(f, "this event has already ended"),
            Self::CapacityBelowAttendance { requested, attending } => write!(
                f,
                "cannot reduce capacity below current confirmed attendance (requested {requested}, attending {attending})"
            ),
        }
    }
}

impl AttendanceError {
    /// `NotFound` for an event.
    #[must_use]
    pub fn event_not_found(event_id: EventId) -> Self {
        Self::NotFound {
            resource: "event",
            id: event_id.to_string(),
        }
    }

    /// `Forbidden` with the given reason.
    #[must_use]
    pub const fn forbidden(reason: ForbiddenReason) -> Self {
        Self::Forbidden { reason }
    }

    /// Returns `true` if this error is due to the caller's request or eligibility.
    ///
    /// # Examples
    ///
    /// ```
    /// # use gathering_core::error::{AttendanceError, ForbiddenReason};
    /// assert!(AttendanceError::forbidden(ForbiddenReason::Banned).is_user_error());
    /// assert!(!AttendanceError::Internal("boom".into()).is_user_error());
    /// ```
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::InvalidArgument(_) | Self::Forbidden { .. }
        )
    }

    /// Returns `true` if retrying the whole operation may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Stable machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::Forbidden { reason } => reason.code(),
            Self::Conflict(_) => "CONFLICT",
            Self::DatabaseError(_) | Self::Internal(_) => "INTERNAL",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_message_carries_reason() {
        let err = AttendanceError::forbidden(ForbiddenReason::CapacityBelowAttendance {
            requested: 2,
            attending: 3,
        });
        assert_eq!(
            err.to_string(),
            "Forbidden: cannot reduce capacity below current confirmed attendance (requested 2, attending 3)"
        );
        assert_eq!(err.code(), "CAPACITY_BELOW_ATTENDANCE");
    }

    #[test]
    fn only_conflict_is_retryable() {
        assert!(AttendanceError::Conflict("serialization failure".into()).is_retryable());
        assert!(!AttendanceError::DatabaseError("down".into()).is_retryable());
        assert!(!AttendanceError::InvalidArgument("bad".into()).is_retryable());
    }

    #[test]
    fn event_not_found_names_the_event() {
        let id = EventId::new();
        let err = AttendanceError::event_not_found(id);
        assert_eq!(err.to_string(), format!("event not found: {id}"));
        assert!(err.is_user_error());
    }
}
