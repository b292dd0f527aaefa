//! Capacity reconciliation and event updates.
//!
//! A change to `max_attendees` is checked against confirmed attendance before
//! anything is written, and growth promotes waitlisted users in FIFO order in
//! the same transaction as the field update.

use crate::error::{AttendanceError, ForbiddenReason, Result};
use crate::types::Event;
use crate::waitlist::Promotion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Outcome of reconciling a capacity change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CapacityPlan {
    /// Capacity before the change
    pub previous: Option<u32>,
    /// Capacity after the change
    pub requested: Option<u32>,
    /// Number of waitlisted users to promote
    pub promotions: u32,
}

impl CapacityPlan {
    /// Whether the capacity value actually changes.
    #[must_use]
    pub fn changes_capacity(&self) -> bool {
        self.previous != self.requested
    }
}

/// Plan a capacity change given current `attending` and `waitlisted` counts.
///
/// - Dropping below confirmed attendance is refused.
/// - Growth (a larger limit, or switching a limited event to unlimited)
///   promotes `min(free slots, waitlist length)` users.
/// - Anything else promotes nobody.
///
/// # Errors
///
/// Returns [`ForbiddenReason::CapacityBelowAttendance`] when `requested` is
/// below `attending`.
///
/// # Examples
///
/// ```
/// use gathering_core::capacity::reconcile_capacity;
///
/// let plan = reconcile_capacity(Some(1), Some(3), 1, 3).unwrap();
/// assert_eq!(plan.promotions, 2);
///
/// assert!(reconcile_capacity(Some(5), Some(2), 3, 0).is_err());
/// ```
pub fn reconcile_capacity(
    previous: Option<u32>,
    requested: Option<u32>,
    attending: u32,
    waitlisted: u32,
) -> Result<CapacityPlan> {
    if let Some(new_max) = requested {
        if new_max < attending {
            return Err(AttendanceError::forbidden(
                ForbiddenReason::CapacityBelowAttendance {
                    requested: new_max,
                    attending,
                },
            ));
        }
    }

    let grows = match (previous, requested) {
        (Some(old), Some(new)) => new > old,
        (Some(_), None) => true,
        (None, _) => false,
    };

    let promotions = if grows && waitlisted > 0 {
        requested.map_or(waitlisted, |new_max| {
            new_max.saturating_sub(attending).min(waitlisted)
        })
    } else {
        0
    };

    Ok(CapacityPlan {
        previous,
        requested,
        promotions,
    })
}

/// Partial update of an event.
///
/// `max_attendees` is tri-state: absent leaves it alone, `null` makes the event
/// unlimited, a number sets the limit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventUpdate {
    /// New title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description; `Some(None)` clears it
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    /// New start time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<DateTime<Utc>>,
    /// New end time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<DateTime<Utc>>,
    /// New timezone label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    /// New capacity; `Some(None)` means unlimited
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_attendees: Option<Option<u32>>,
}

impl EventUpdate {
    /// Update that only changes capacity.
    #[must_use]
    pub fn capacity(max_attendees: Option<u32>) -> Self {
        Self {
            max_attendees: Some(max_attendees),
            ..Self::default()
        }
    }

    /// Whether the update touches nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.starts_at.is_none()
            && self.ends_at.is_none()
            && self.timezone.is_none()
            && self.max_attendees.is_none()
    }

    /// Requested capacity after the update.
    #[must_use]
    pub fn requested_capacity(&self, event: &Event) -> Option<u32> {
        self.max_attendees.unwrap_or(event.max_attendees)
    }

    /// Apply the update to `event`, validating the merged result.
    ///
    /// Capacity is copied as requested; the caller reconciles it separately.
    ///
    /// # Errors
    ///
    /// Returns [`AttendanceError::InvalidArgument`] if the title is blank or the
    /// event would end before it starts.
    pub fn merge(&self, event: &Event, now: DateTime<Utc>) -> Result<Event> {
        let mut merged = event.clone();

        if let Some(title) = &self.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(AttendanceError::InvalidArgument(
                    "title must not be empty".to_string(),
                ));
            }
            merged.title = title.to_string();
        }
        if let Some(description) = &self.description {
            merged.description.clone_from(description);
        }
        if let Some(starts_at) = self.starts_at {
            merged.starts_at = starts_at;
        }
        if let Some(ends_at) = self.ends_at {
            merged.ends_at = ends_at;
        }
        if let Some(timezone) = &self.timezone {
            merged.timezone.clone_from(timezone);
        }
        if let Some(max_attendees) = self.max_attendees {
            merged.max_attendees = max_attendees;
        }

        if merged.ends_at <= merged.starts_at {
            return Err(AttendanceError::InvalidArgument(
                "event must end after it starts".to_string(),
            ));
        }

        merged.updated_at = now;
        Ok(merged)
    }
}

/// Distinguishes an absent field from an explicit `null`.
fn double_option<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Result of an event update or capacity change, as committed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapacityChangeOutcome {
    /// Event after the transaction
    pub event: Event,
    /// Capacity before the transaction
    pub previous_max: Option<u32>,
    /// Users promoted, in FIFO order
    pub promotions: Vec<Promotion>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use crate::types::{CommunityId, EventId};
    use chrono::Duration;
    use proptest::prelude::*;

    fn event() -> Event {
        let now = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        Event {
            id: EventId::new(),
            community_id: CommunityId::new(),
            title: "Board games".to_string(),
            description: None,
            starts_at: now + Duration::days(1),
            ends_at: now + Duration::days(1) + Duration::hours(3),
            timezone: "Europe/Amsterdam".to_string(),
            max_attendees: Some(5),
            current_attendees: 3,
            supporters_only: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn reduction_below_attendance_is_forbidden() {
        let err = reconcile_capacity(Some(5), Some(2), 3, 0).unwrap_err();
        assert_eq!(err.code(), "CAPACITY_BELOW_ATTENDANCE");
    }

    #[test]
    fn reduction_to_exact_attendance_is_allowed() {
        let plan = reconcile_capacity(Some(5), Some(3), 3, 4).unwrap();
        assert_eq!(plan.promotions, 0);
    }

    #[test]
    fn growth_promotes_up_to_free_slots() {
        let plan = reconcile_capacity(Some(1), Some(3), 1, 3).unwrap();
        assert_eq!(plan.promotions, 2);

        let plan = reconcile_capacity(Some(1), Some(10), 1, 3).unwrap();
        assert_eq!(plan.promotions, 3);
    }

    #[test]
    fn switching_to_unlimited_promotes_everyone() {
        let plan = reconcile_capacity(Some(2), None, 2, 4).unwrap();
        assert_eq!(plan.promotions, 4);
    }

    #[test]
    fn growth_without_waitlist_promotes_nobody() {
        let plan = reconcile_capacity(Some(2), Some(8), 2, 0).unwrap();
        assert_eq!(plan.promotions, 0);
        assert!(plan.changes_capacity());
    }

    #[test]
    fn merge_rejects_blank_title() {
        let update = EventUpdate {
            title: Some("   ".to_string()),
            ..EventUpdate::default()
        };
        let err = update.merge(&event(), Utc::now()).unwrap_err();
        assert!(matches!(err, AttendanceError::InvalidArgument(_)));
    }

    #[test]
    fn merge_rejects_inverted_times() {
        let original = event();
        let update = EventUpdate {
            ends_at: Some(original.starts_at - Duration::minutes(1)),
            ..EventUpdate::default()
        };
        assert!(update.merge(&original, Utc::now()).is_err());
    }

    #[test]
    fn update_distinguishes_null_from_absent_capacity() {
        let absent: EventUpdate = serde_json::from_str(r#"{"title":"Chess"}"#).unwrap();
        assert_eq!(absent.max_attendees, None);
        assert_eq!(absent.requested_capacity(&event()), Some(5));

        let unlimited: EventUpdate = serde_json::from_str(r#"{"max_attendees":null}"#).unwrap();
        assert_eq!(unlimited.max_attendees, Some(None));
        assert_eq!(unlimited.requested_capacity(&event()), None);

        let limited: EventUpdate = serde_json::from_str(r#"{"max_attendees":12}"#).unwrap();
        assert_eq!(limited.max_attendees, Some(Some(12)));
    }

    proptest! {
        #[test]
        fn promotions_never_overfill(
            old in proptest::option::of(0u32..50),
            new in proptest::option::of(0u32..50),
            attending in 0u32..50,
            waitlisted in 0u32..50,
        ) {
            match reconcile_capacity(old, new, attending, waitlisted) {
                Ok(plan) => {
                    prop_assert!(plan.promotions <= waitlisted);
                    if let Some(max) = new {
                        prop_assert!(attending + plan.promotions <= max);
                    }
                    let grows = matches!((old, new), (Some(o), Some(n)) if n > o)
                        || (old.is_some() && new.is_none());
                    if !grows {
                        prop_assert_eq!(plan.promotions, 0);
                    }
                }
                Err(err) => {
                    prop_assert!(new.is_some_and(|n| n < attending));
                    prop_assert_eq!(err.code(), "CAPACITY_BELOW_ATTENDANCE");
                }
            }
        }
    }
}
