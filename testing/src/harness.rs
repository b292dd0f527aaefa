//! Engine wired to in-memory providers.

use crate::fixtures::{EventBuilder, private_community, public_community};
use crate::memory::{
    InMemoryAttendanceRepository, InMemoryCommunityDirectory, InMemorySupportDirectory,
};
use crate::mocks::{FixedClock, test_clock};
use crate::notifiers::RecordingNotifier;
use gathering_core::environment::Clock;
use gathering_core::providers::NotificationDispatcher;
use gathering_core::types::{Community, Event, MembershipRole, UserId};
use gathering_runtime::{AttendanceEngine, AttendanceEnvironment, EngineConfig, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;

/// Engine over in-memory providers.
pub type InMemoryEngine<N = RecordingNotifier> = AttendanceEngine<
    InMemoryAttendanceRepository,
    InMemoryAttendanceRepository,
    InMemoryCommunityDirectory,
    InMemorySupportDirectory,
    N,
>;

/// An engine plus handles to every provider behind it.
///
/// # Example
///
/// ```
/// use gathering_core::types::AttendanceStatus;
/// use gathering_testing::TestHarness;
///
/// # async fn example() -> gathering_core::Result<()> {
/// let harness = TestHarness::new();
/// let community = harness.public_community();
/// let event = harness.event(&community, Some(1));
///
/// let result = harness
///     .engine
///     .set_attendance_status(event.id, harness.member(&community), AttendanceStatus::Attending)
///     .await?;
/// assert_eq!(result.status, AttendanceStatus::Attending);
/// # Ok(())
/// # }
/// ```
pub struct TestHarness<N = RecordingNotifier> {
    /// Engine under test
    pub engine: InMemoryEngine<N>,
    /// Events and attendance records
    pub attendance: InMemoryAttendanceRepository,
    /// Communities, memberships, bans
    pub communities: InMemoryCommunityDirectory,
    /// Support subscriptions
    pub support: InMemorySupportDirectory,
    /// Notification dispatcher
    pub notifier: N,
    /// Shared clock
    pub clock: FixedClock,
}

impl TestHarness<RecordingNotifier> {
    /// Harness with a [`RecordingNotifier`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_notifier(RecordingNotifier::new())
    }
}

impl Default for TestHarness<RecordingNotifier> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N> TestHarness<N>
where
    N: NotificationDispatcher + Clone,
{
    /// Harness with the given notifier and fast retries.
    #[must_use]
    pub fn with_notifier(notifier: N) -> Self {
        let config = EngineConfig::builder()
            .retry(
                RetryPolicy::builder()
                    .max_retries(3)
                    .initial_delay(Duration::from_millis(1))
                    .max_delay(Duration::from_millis(5))
                    .build(),
            )
            .notification_timeout(Duration::from_millis(200))
            .build();
        Self::with_config(notifier, config)
    }

    /// Harness with the given notifier and configuration.
    #[must_use]
    pub fn with_config(notifier: N, config: EngineConfig) -> Self {
        let attendance = InMemoryAttendanceRepository::new();
        let communities = InMemoryCommunityDirectory::new();
        let support = InMemorySupportDirectory::new();
        let clock = test_clock();

        let env = AttendanceEnvironment::new(
            attendance.clone(),
            attendance.clone(),
            communities.clone(),
            support.clone(),
            notifier.clone(),
            Arc::new(clock.clone()),
        );

        Self {
            engine: AttendanceEngine::new(env, config),
            attendance,
            communities,
            support,
            notifier,
            clock,
        }
    }

    /// Create and store a public community.
    #[must_use]
    pub fn public_community(&self) -> Community {
        let community = public_community("Trail Runners");
        self.communities.insert_community(community.clone());
        community
    }

    /// Create and store a private community.
    #[must_use]
    pub fn private_community(&self) -> Community {
        let community = private_community("Inner Circle");
        self.communities.insert_community(community.clone());
        community
    }

    /// Create and store an event with the given capacity.
    #[must_use]
    pub fn event(&self, community: &Community, max_attendees: Option<u32>) -> Event {
        let mut builder = EventBuilder::new(community.id);
        if let Some(max) = max_attendees {
            builder = builder.max_attendees(max);
        }
        self.insert_event(builder.build())
    }

    /// Store a prebuilt event.
    pub fn insert_event(&self, event: Event) -> Event {
        self.attendance.insert_event(event.clone());
        event
    }

    /// Create a new user who is already a member of `community`.
    #[must_use]
    pub fn member(&self, community: &Community) -> UserId {
        let user_id = UserId::new();
        self.communities
            .add_member(community.id, user_id, MembershipRole::Member, self.clock.now());
        user_id
    }
}
