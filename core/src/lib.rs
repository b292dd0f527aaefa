//! # Gathering Core
//!
//! Domain types and decision logic for event attendance with capacity limits
//! and a FIFO waitlist.
//!
//! This crate holds everything that can be decided without I/O. Stores and
//! external systems are reached through the traits in [`providers`], and the
//! orchestration lives in `gathering-runtime`.
//!
//! ## Components
//!
//! - **Membership gate** ([`membership`]): auto-join, join request, or blocked
//! - **Attendance state machine** ([`attendance`]): per-user RSVP transitions
//! - **Waitlist promoter** ([`waitlist`]): FIFO order and derived positions
//! - **Capacity reconciler** ([`capacity`]): capacity changes and event updates
//! - **Attendance queries** ([`query`]): status views and paginated listings
//!
//! ## Invariants
//!
//! - `current_attendees` equals the number of `attending` records
//! - `current_attendees` never exceeds `max_attendees` when set
//! - Waitlist positions are dense and follow `(created_at, seq)` order
//!
//! ## Example
//!
//! ```
//! use gathering_core::attendance::plan_transition;
//! use gathering_core::types::{AttendanceStatus, CapacitySnapshot};
//!
//! let full = CapacitySnapshot { max_attendees: Some(2), current_attendees: 2 };
//! let plan = plan_transition(full, None, AttendanceStatus::Attending);
//!
//! assert_eq!(plan.next, AttendanceStatus::Waitlisted);
//! assert_eq!(plan.counter_delta, 0);
//! ```

pub mod attendance;
pub mod capacity;
pub mod environment;
pub mod error;
pub mod membership;
pub mod providers;
pub mod query;
pub mod types;
pub mod waitlist;

// Re-export commonly used types
pub use attendance::{AttendanceResult, TransitionOutcome, TransitionPlan, plan_transition};
pub use capacity::{CapacityChangeOutcome, CapacityPlan, EventUpdate, reconcile_capacity};
pub use environment::{Clock, SystemClock};
pub use error::{AttendanceError, ForbiddenReason, Result};
pub use membership::{MembershipAction, MembershipDecision, MembershipGate, MembershipResolution};
pub use query::{AttendanceStatusView, AttendeeListParams, AttendeeQuery, Page, PageLimits};
pub use types::{
    AttendanceRecord, AttendanceStatus, AttendanceSummary, CapacitySnapshot, Community,
    CommunityId, Event, EventId, JoinRequest, JoinRequestId, JoinRequestStatus, Membership,
    MembershipRole, UserId,
};
pub use waitlist::{Promotion, PromotionTrigger};
