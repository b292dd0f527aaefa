//! Support subscription lookup.

use crate::error::Result;
use crate::types::{CommunityId, UserId};
use chrono::{DateTime, Utc};

/// Answers whether a user currently supports a community.
///
/// Subscriptions are managed elsewhere; the engine only asks.
pub trait SupportDirectory: Send + Sync {
    /// Whether `user_id` holds an active support subscription to `community_id` at `now`.
    ///
    /// # Errors
    ///
    /// Returns error if the lookup fails.
    fn has_active_support(
        &self,
        community_id: CommunityId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;
}
