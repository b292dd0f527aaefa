//! Log-only notification dispatcher.

use gathering_core::error::Result;
use gathering_core::providers::{NotificationDispatcher, WaitlistPromotionNotice};

/// Writes promotion notices to the log instead of delivering them.
///
/// Used where no notification store is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl NotificationDispatcher for TracingNotifier {
    async fn notify_waitlist_promotion(&self, notice: &WaitlistPromotionNotice) -> Result<()> {
        tracing::info!(
            recipient = %notice.recipient,
            event_id = %notice.event_id,
            title = %notice.title(),
            "Waitlist promotion notice"
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use gathering_core::types::{CommunityId, EventId, UserId};

    #[tokio::test]
    async fn always_succeeds() {
        let notice = WaitlistPromotionNotice {
            recipient: UserId::new(),
            event_id: EventId::new(),
            event_title: "Board games".to_string(),
            community_id: CommunityId::new(),
            community_name: "Meeple Club".to_string(),
            promoted_at: chrono::Utc::now(),
        };
        tokio_test::assert_ok!(TracingNotifier.notify_waitlist_promotion(&notice).await);
    }
}
