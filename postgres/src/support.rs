//! `PostgreSQL` support subscription lookup.

use crate::error::db_error;
use chrono::{DateTime, Utc};
use gathering_core::error::Result;
use gathering_core::providers::SupportDirectory;
use gathering_core::types::{CommunityId, UserId};
use sqlx::PgPool;

/// Reads `support_subscriptions`.
///
/// A subscription is active when its status is `active` and it has no expiry
/// or expires after the time asked about.
#[derive(Clone, Debug)]
pub struct PostgresSupportDirectory {
    pool: PgPool,
}

impl PostgresSupportDirectory {
    /// Create a directory over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record an active subscription.
    ///
    /// # Errors
    ///
    /// Returns [`gathering_core::AttendanceError::DatabaseError`] if the insert fails.
    pub async fn add_supporter(
        &self,
        community_id: CommunityId,
        user_id: UserId,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO support_subscriptions (community_id, user_id, status, expires_at)
            VALUES ($1, $2, 'active', $3)
            ",
        )
        .bind(community_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to insert support subscription"))?;
        Ok(())
    }
}

impl SupportDirectory for PostgresSupportDirectory {
    async fn has_active_support(
        &self,
        community_id: CommunityId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        sqlx::query_scalar(
            r"
            SELECT EXISTS(
                SELECT 1 FROM support_subscriptions
                WHERE community_id = $1
                  AND user_id = $2
                  AND status = 'active'
                  AND (expires_at IS NULL OR expires_at > $3)
            )
            ",
        )
        .bind(community_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to check support subscription"))
    }
}
