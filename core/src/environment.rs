//! Time abstraction injected into the engine.

use chrono::{DateTime, Utc};

/// Clock trait - abstracts time operations for testability
///
/// Every timestamp the engine writes (record `created_at`, promotion times,
/// event `updated_at`) and every "has the event ended" check goes through
/// this trait, so tests can pin time with a fixed clock.
///
/// # Examples
///
/// ```
/// use gathering_core::environment::{Clock, SystemClock};
///
/// let clock = SystemClock;
/// let earlier = clock.now();
/// assert!(clock.now() >= earlier);
/// ```
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
