//! Collaborator interfaces.
//!
//! The engine reaches every store and external system through these traits.
//! `gathering-postgres` implements them against `PostgreSQL`, and
//! `gathering-testing` provides in-memory versions.
//!
//! ```text
//!                 ┌──────────────────────┐
//!   RSVP ────────►│  AttendanceEngine    │
//!                 └──┬───────┬────────┬──┘
//!        eligibility │       │ atomic │ post-commit
//!                    ▼       ▼        ▼
//!   CommunityDirectory   AttendanceRepository   NotificationDispatcher
//!   SupportDirectory     (event row lock, record
//!   EventRepository       upsert, counter, promotion)
//! ```
//!
//! Every mutating `AttendanceRepository` method is one transaction: either all
//! of its writes commit or none do.

pub mod attendance;
pub mod community;
pub mod event;
pub mod notification;
pub mod support;

pub use attendance::AttendanceRepository;
pub use community::CommunityDirectory;
pub use event::EventRepository;
pub use notification::{NotificationDispatcher, WaitlistPromotionNotice};
pub use support::SupportDirectory;
