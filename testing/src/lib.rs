//! # Gathering Testing
//!
//! Testing utilities for the attendance engine.
//!
//! This crate provides:
//! - In-memory implementations of every provider trait
//! - A deterministic, manually advanced clock
//! - Recording and failing notification dispatchers
//! - Fixture builders and a ready-wired [`TestHarness`]
//!
//! ## Example
//!
//! ```
//! use gathering_core::types::AttendanceStatus;
//! use gathering_testing::TestHarness;
//!
//! # async fn example() -> gathering_core::Result<()> {
//! let harness = TestHarness::new();
//! let community = harness.public_community();
//! let event = harness.event(&community, Some(2));
//!
//! for _ in 0..3 {
//!     let user = harness.member(&community);
//!     harness.engine.set_attendance_status(event.id, user, AttendanceStatus::Attending).await?;
//! }
//!
//! let summary = harness.engine.attendance_summary(event.id).await?;
//! assert_eq!((summary.attending, summary.waitlisted), (2, 1));
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use gathering_core::environment::Clock;

/// Mock implementations of environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use chrono::Duration;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Fixed clock for deterministic tests
    ///
    /// Returns the same time until explicitly advanced. Clones share the time.
    ///
    /// # Example
    ///
    /// ```
    /// use gathering_testing::mocks::FixedClock;
    /// use gathering_core::environment::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// assert_eq!(time1, clock.now());
    ///
    /// clock.advance(Duration::seconds(5));
    /// assert_eq!(clock.now() - time1, Duration::seconds(5));
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        micros: Arc<AtomicI64>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                micros: Arc::new(AtomicI64::new(time.timestamp_micros())),
            }
        }

        /// Move the clock forward.
        pub fn advance(&self, by: Duration) {
            let delta = by.num_microseconds().unwrap_or(i64::MAX);
            self.micros.fetch_add(delta, Ordering::SeqCst);
        }

        /// Set the clock to `time`.
        pub fn set(&self, time: DateTime<Utc>) {
            self.micros.store(time.timestamp_micros(), Ordering::SeqCst);
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            DateTime::from_timestamp_micros(self.micros.load(Ordering::SeqCst)).unwrap_or_default()
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::from_timestamp(1_735_689_600, 0).unwrap_or_default())
    }
}

/// Fixture builders
pub mod fixtures;

/// Engine wired to in-memory providers
pub mod harness;

/// In-memory provider implementations
pub mod memory;

/// Notification dispatchers for tests
pub mod notifiers;

pub use fixtures::{EventBuilder, private_community, public_community};
pub use harness::{InMemoryEngine, TestHarness};
pub use memory::{
    InMemoryAttendanceRepository, InMemoryCommunityDirectory, InMemorySupportDirectory,
};
pub use mocks::{FixedClock, test_clock};
pub use notifiers::{FailingNotifier, HangingNotifier, RecordingNotifier};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;

    #[test]
    fn test_clock_is_fixed() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn clones_share_time() {
        let clock = test_clock();
        let other = clock.clone();
        clock.advance(chrono::Duration::minutes(1));
        assert_eq!(clock.now(), other.now());
    }
}
