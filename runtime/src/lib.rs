//! # Gathering Runtime
//!
//! The [`AttendanceEngine`] ties the decision logic in `gathering-core` to
//! concrete providers and adds the operational concerns around it.
//!
//! ## Core Components
//!
//! - **Engine**: eligibility checks, atomic repository calls, post-commit notifications
//! - **Retry**: exponential backoff for transactions aborted by concurrent writers
//! - **Metrics**: Prometheus counters for transitions, promotions, and failures
//! - **Notifier**: [`TracingNotifier`], a log-only dispatcher
//!
//! ## Example
//!
//! ```ignore
//! use gathering_runtime::{AttendanceEngine, AttendanceEnvironment, EngineConfig};
//!
//! let env = AttendanceEnvironment::new(events, attendance, communities, support, notifier, clock);
//! let engine = AttendanceEngine::new(env, EngineConfig::default());
//!
//! let result = engine
//!     .set_attendance_status(event_id, user_id, AttendanceStatus::Attending)
//!     .await?;
//! ```

/// Engine configuration
pub mod config;

/// Attendance engine and its environment
pub mod engine;

/// Prometheus metrics for observability
pub mod metrics;

/// Log-only notification dispatcher
pub mod notifier;

/// Retry logic with exponential backoff
pub mod retry;

pub use config::{EngineConfig, EngineConfigBuilder};
pub use engine::{AttendanceEngine, AttendanceEnvironment};
pub use notifier::TracingNotifier;
pub use retry::RetryPolicy;
