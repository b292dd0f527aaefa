//! Notifications persisted to the `notifications` table.

use crate::error::db_error;
use gathering_core::error::{AttendanceError, Result};
use gathering_core::providers::{NotificationDispatcher, WaitlistPromotionNotice};
use sqlx::PgPool;

/// Notification kind stored for waitlist promotions.
pub const WAITLIST_PROMOTED: &str = "waitlist_promoted";

/// Inserts one `notifications` row per notice.
///
/// Delivery to devices or email is handled by whatever consumes the table.
#[derive(Clone, Debug)]
pub struct PostgresNotificationDispatcher {
    pool: PgPool,
}

impl PostgresNotificationDispatcher {
    /// Create a dispatcher over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl NotificationDispatcher for PostgresNotificationDispatcher {
    async fn notify_waitlist_promotion(&self, notice: &WaitlistPromotionNotice) -> Result<()> {
        let payload = serde_json::to_value(notice)
            .map_err(|e| AttendanceError::Internal(format!("Failed to encode notice: {e}")))?;

        sqlx::query(
            r"
            INSERT INTO notifications (recipient_id, kind, title, body, payload, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(notice.recipient.as_uuid())
        .bind(WAITLIST_PROMOTED)
        .bind(notice.title())
        .bind(notice.body())
        .bind(payload)
        .bind(notice.promoted_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to insert notification"))?;

        metrics::counter!("gathering_notifications_stored_total", "kind" => WAITLIST_PROMOTED)
            .increment(1);

        Ok(())
    }
}
