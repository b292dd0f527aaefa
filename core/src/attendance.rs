//! Attendance state machine.
//!
//! The transition planner is a pure function of the event's capacity snapshot,
//! the user's prior status, and the requested status. Repositories call it while
//! holding the event row lock and then apply the resulting [`TransitionPlan`]
//! (record upsert, counter delta, optional promotion) in one transaction.
//!
//! ```text
//!                   ┌──────────── slot free ───────────┐
//!                   │                                  ▼
//!  (none) ── attend ┤                             attending ── maybe / not_attending ──┐
//!                   │                                  ▲              (-1, promote)    │
//!                   └── full ──► waitlisted ── promoted┘                               ▼
//!                                    │                                       maybe / not_attending
//!                                    └───── maybe / not_attending (0) ──────────────►
//! ```

use crate::error::{AttendanceError, Result};
use crate::types::{AttendanceRecord, AttendanceStatus, CapacitySnapshot, Event};
use crate::waitlist::Promotion;
use serde::Serialize;

/// What a single `set_attendance_status` call must do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransitionPlan {
    /// Status before the call (`None` when no record exists)
    pub prior: Option<AttendanceStatus>,
    /// Status after the call
    pub next: AttendanceStatus,
    /// Change to `current_attendees`: -1, 0, or +1
    pub counter_delta: i8,
    /// Promote the head of the waitlist into the freed slot
    pub promote_next: bool,
}

impl TransitionPlan {
    /// Nothing to write: the user already holds the resulting status.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.prior == Some(self.next)
    }

    /// Apply the counter delta with invariant checks.
    ///
    /// # Errors
    ///
    /// Returns [`AttendanceError::Internal`] if the counter would go negative or
    /// exceed capacity; the caller must roll back.
    pub fn apply_to_counter(&self, capacity: CapacitySnapshot) -> Result<u32> {
        let current = capacity.current_attendees;
        let next = match self.counter_delta {
            0 => Some(current),
            d if d > 0 => current.checked_add(1),
            _ => current.checked_sub(1),
        }
        .ok_or_else(|| {
            AttendanceError::Internal(format!(
                "attendee counter out of range (current {current}, delta {})",
                self.counter_delta
            ))
        })?;

        if let Some(max) = capacity.max_attendees {
            if self.counter_delta > 0 && next > max {
                return Err(AttendanceError::Internal(format!(
                    "attendee counter would exceed capacity ({next} > {max})"
                )));
            }
        }

        Ok(next)
    }
}

/// Decide the transition for one RSVP request.
///
/// - `attending` (or `waitlisted`, which is treated as a request to attend):
///   take a free slot, or queue on the waitlist when full. Already attending is
///   a no-op; already waitlisted on a full event stays in place.
/// - `maybe` / `not_attending`: leaving `attending` frees a slot, so the
///   counter drops by one and the head of the waitlist is promoted. Leaving
///   the waitlist needs no renumbering because positions are derived.
#[must_use]
pub fn plan_transition(
    capacity: CapacitySnapshot,
    prior: Option<AttendanceStatus>,
    target: AttendanceStatus,
) -> TransitionPlan {
    let keep = |status| TransitionPlan {
        prior,
        next: status,
        counter_delta: 0,
        promote_next: false,
    };

    match target {
        AttendanceStatus::Attending | AttendanceStatus::Waitlisted => match prior {
            Some(AttendanceStatus::Attending) => keep(AttendanceStatus::Attending),
            Some(AttendanceStatus::Waitlisted)
                if matches!(target, AttendanceStatus::Waitlisted) =>
            {
                keep(AttendanceStatus::Waitlisted)
            }
            _ if capacity.has_free_slot() => TransitionPlan {
                prior,
                next: AttendanceStatus::Attending,
                counter_delta: 1,
                promote_next: false,
            },
            _ => keep(AttendanceStatus::Waitlisted),
        },
        AttendanceStatus::Maybe | AttendanceStatus::NotAttending => match prior {
            Some(AttendanceStatus::Attending) => TransitionPlan {
                prior,
                next: target,
                counter_delta: -1,
                promote_next: true,
            },
            _ => keep(target),
        },
    }
}

/// Result of an atomic transition, as committed by the repository.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionOutcome {
    /// Event after the transaction (counter included)
    pub event: Event,
    /// The caller's record after the transaction
    pub record: AttendanceRecord,
    /// Caller's status before the call
    pub prior: Option<AttendanceStatus>,
    /// Caller's derived waitlist position, when waitlisted
    pub waitlist_position: Option<u32>,
    /// Waitlisted user promoted into the freed slot
    pub promotion: Option<Promotion>,
}

impl TransitionOutcome {
    /// Whether the call changed the caller's status.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.prior != Some(self.record.status)
    }
}

/// Caller-facing result of `set_attendance_status`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AttendanceResult {
    /// Resulting status
    pub status: AttendanceStatus,
    /// 1-based waitlist position when waitlisted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waitlist_position: Option<u32>,
    /// Human-readable explanation, set when the caller was waitlisted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<&TransitionOutcome> for AttendanceResult {
    fn from(outcome: &TransitionOutcome) -> Self {
        let status = outcome.record.status;
        let waitlist_position = outcome.waitlist_position;
        let message = match (status, waitlist_position) {
            (AttendanceStatus::Waitlisted, Some(position)) => Some(format!(
                "This event is full. You are #{position} on the waitlist and will be moved to attending automatically when a spot opens."
            )),
            (AttendanceStatus::Waitlisted, None) => Some(
                "This event is full. You are on the waitlist and will be moved to attending automatically when a spot opens."
                    .to_string(),
            ),
            _ => None,
        };

        Self {
            status,
            waitlist_position,
            message,
        }
    }
}
