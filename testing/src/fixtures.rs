//! Fixture builders.

use crate::mocks::test_clock;
use chrono::{DateTime, Duration, Utc};
use gathering_core::environment::Clock;
use gathering_core::types::{Community, CommunityId, Event, EventId};

/// Builder for [`Event`] fixtures.
///
/// Defaults: starts one day after [`test_clock`], lasts three hours,
/// unlimited capacity, open to everyone.
///
/// # Example
///
/// ```
/// use gathering_core::types::CommunityId;
/// use gathering_testing::EventBuilder;
///
/// let event = EventBuilder::new(CommunityId::new())
///     .title("Bouldering night")
///     .max_attendees(12)
///     .build();
/// assert_eq!(event.max_attendees, Some(12));
/// assert_eq!(event.current_attendees, 0);
/// ```
#[derive(Clone, Debug)]
pub struct EventBuilder {
    event: Event,
}

impl EventBuilder {
    /// Start building an event owned by `community_id`.
    #[must_use]
    pub fn new(community_id: CommunityId) -> Self {
        let now = test_clock().now();
        Self {
            event: Event {
                id: EventId::new(),
                community_id,
                title: "Community meetup".to_string(),
                description: None,
                starts_at: now + Duration::days(1),
                ends_at: now + Duration::days(1) + Duration::hours(3),
                timezone: "UTC".to_string(),
                max_attendees: None,
                current_attendees: 0,
                supporters_only: false,
                created_at: now,
                updated_at: now,
            },
        }
    }

    /// Set the title.
    #[must_use]
    pub fn title(mut self, title: &str) -> Self {
        self.event.title = title.to_string();
        self
    }

    /// Set a capacity limit.
    #[must_use]
    pub const fn max_attendees(mut self, max: u32) -> Self {
        self.event.max_attendees = Some(max);
        self
    }

    /// Restrict to active supporters.
    #[must_use]
    pub const fn supporters_only(mut self) -> Self {
        self.event.supporters_only = true;
        self
    }

    /// Set start and end times.
    #[must_use]
    pub const fn between(mut self, starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Self {
        self.event.starts_at = starts_at;
        self.event.ends_at = ends_at;
        self
    }

    /// Place the event entirely before [`test_clock`].
    #[must_use]
    pub fn already_ended(self) -> Self {
        let now = test_clock().now();
        self.between(now - Duration::hours(5), now - Duration::hours(2))
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> Event {
        self.event
    }
}

/// A public community fixture.
#[must_use]
pub fn public_community(name: &str) -> Community {
    Community {
        id: CommunityId::new(),
        name: name.to_string(),
        is_private: false,
    }
}

/// A private community fixture.
#[must_use]
pub fn private_community(name: &str) -> Community {
    Community {
        id: CommunityId::new(),
        name: name.to_string(),
        is_private: true,
    }
}
