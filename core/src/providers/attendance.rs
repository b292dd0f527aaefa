//! Attendance persistence.

use crate::attendance::TransitionOutcome;
use crate::capacity::{CapacityChangeOutcome, EventUpdate};
use crate::error::Result;
use crate::query::{AttendeeQuery, Page};
use crate::types::{AttendanceRecord, AttendanceStatus, AttendanceSummary, EventId, UserId};
use crate::waitlist::Promotion;
use chrono::{DateTime, Utc};

/// Attendance repository.
///
/// Owns attendance records and the event's `current_attendees` counter. Every
/// mutating method runs in a single transaction that first locks the event, so
/// concurrent callers on the same event are serialized.
///
/// # Implementation Notes
///
/// - Decisions come from [`crate::attendance::plan_transition`] and
///   [`crate::capacity::reconcile_capacity`], evaluated under the lock
/// - Waitlist order is `(created_at, seq)`; positions are derived at read time
/// - Store-level serialization failures surface as `AttendanceError::Conflict`
pub trait AttendanceRepository: Send + Sync {
    /// Apply an RSVP transition for `user_id`.
    ///
    /// Upserts the caller's record, adjusts the counter, and promotes the head
    /// of the waitlist when a slot is freed. A new record gets `created_at = now`;
    /// an existing record keeps its `created_at`.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Event not found → `AttendanceError::NotFound`
    /// - Database query fails (transaction rolled back)
    fn apply_transition(
        &self,
        event_id: EventId,
        user_id: UserId,
        target: AttendanceStatus,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<TransitionOutcome>> + Send;

    /// Promote the head of the waitlist if the event has a free slot.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Event not found → `AttendanceError::NotFound`
    /// - Database query fails (transaction rolled back)
    fn promote_next(
        &self,
        event_id: EventId,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Option<Promotion>>> + Send;

    /// Apply an event update, reconciling capacity first.
    ///
    /// A refused capacity change writes nothing, including unrelated fields.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Event not found → `AttendanceError::NotFound`
    /// - Invalid merged fields → `AttendanceError::InvalidArgument`
    /// - Capacity below attendance → `AttendanceError::Forbidden`
    /// - Database query fails (transaction rolled back)
    fn apply_event_update(
        &self,
        event_id: EventId,
        update: &EventUpdate,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<CapacityChangeOutcome>> + Send;

    /// Get a user's record, if any.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn get_record(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<Option<AttendanceRecord>>> + Send;

    /// Derived waitlist position, `None` unless the user is waitlisted.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn waitlist_position(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<Option<u32>>> + Send;

    /// List records in listing order, paginated.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn list_attendees(
        &self,
        event_id: EventId,
        query: AttendeeQuery,
    ) -> impl std::future::Future<Output = Result<Page<AttendanceRecord>>> + Send;

    /// Per-status counts plus the event's capacity and counter.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Event not found → `AttendanceError::NotFound`
    /// - Database query fails
    fn summary(
        &self,
        event_id: EventId,
    ) -> impl std::future::Future<Output = Result<AttendanceSummary>> + Send;

    /// Set the post-hoc `attended` flag on an existing record.
    ///
    /// Never changes status or the counter.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Record not found → `AttendanceError::NotFound`
    /// - Database query fails
    fn set_attended(
        &self,
        event_id: EventId,
        user_id: UserId,
        attended: Option<bool>,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<AttendanceRecord>> + Send;
}
