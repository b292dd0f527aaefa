//! Event lookup.

use crate::error::Result;
use crate::types::{Event, EventId};

/// Read-only event lookup.
pub trait EventRepository: Send + Sync {
    /// Get an event by ID.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Database query fails
    /// - Event not found → `AttendanceError::NotFound`
    fn get_event(
        &self,
        event_id: EventId,
    ) -> impl std::future::Future<Output = Result<Event>> + Send;
}
