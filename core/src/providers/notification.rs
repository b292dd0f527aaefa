//! Notification dispatch.

use crate::error::Result;
use crate::types::{CommunityId, EventId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payload sent to a user promoted off the waitlist.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitlistPromotionNotice {
    /// Promoted user
    pub recipient: UserId,
    /// Event
    pub event_id: EventId,
    /// Event title
    pub event_title: String,
    /// Hosting community
    pub community_id: CommunityId,
    /// Hosting community name
    pub community_name: String,
    /// When the promotion committed
    pub promoted_at: DateTime<Utc>,
}

impl WaitlistPromotionNotice {
    /// Notification title.
    #[must_use]
    pub fn title(&self) -> String {
        format!("You're in: {}", self.event_title)
    }

    /// Notification body.
    #[must_use]
    pub fn body(&self) -> String {
        format!(
            "A spot opened up for {} in {}. You have been moved from the waitlist to attending.",
            self.event_title, self.community_name
        )
    }
}

/// Best-effort delivery of user notifications.
///
/// Called after the attendance transaction has committed, on a detached task
/// that owns its own clone of the dispatcher. Failures are logged by the engine
/// and never undo the promotion.
pub trait NotificationDispatcher: Clone + Send + Sync + 'static {
    /// Notify a user that they were promoted from the waitlist.
    ///
    /// # Errors
    ///
    /// Returns error if delivery fails.
    fn notify_waitlist_promotion(
        &self,
        notice: &WaitlistPromotionNotice,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
