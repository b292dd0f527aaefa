//! Community membership, bans, and join requests.

use crate::error::Result;
use crate::types::{Community, CommunityId, JoinRequest, Membership, UserId};
use chrono::{DateTime, Utc};

/// Community membership and privacy lookups.
///
/// The engine may ask for a membership or join request to be created through
/// [`CommunityDirectory::join_public`] and [`CommunityDirectory::request_to_join`];
/// it never changes roles or bans.
pub trait CommunityDirectory: Send + Sync {
    /// Get a community by ID.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Database query fails
    /// - Community not found → `AttendanceError::NotFound`
    fn get_community(
        &self,
        community_id: CommunityId,
    ) -> impl std::future::Future<Output = Result<Community>> + Send;

    /// Get a user's membership, if any.
    ///
    /// # Errors
    ///
    /// Returns error if the lookup fails.
    fn get_membership(
        &self,
        community_id: CommunityId,
        user_id: UserId,
    ) -> impl std::future::Future<Output = Result<Option<Membership>>> + Send;

    /// Whether the user holds a ban that is active at `now`.
    ///
    /// A ban is active when it has no expiry or expires after `now`.
    ///
    /// # Errors
    ///
    /// Returns error if the lookup fails.
    fn is_banned(
        &self,
        community_id: CommunityId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<bool>> + Send;

    /// Join a public community as `member`.
    ///
    /// The ban check and the insert happen atomically. Returns the existing
    /// membership if one was created concurrently.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Database query fails
    /// - User is actively banned → `AttendanceError::Forbidden` (`Banned`)
    fn join_public(
        &self,
        community_id: CommunityId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Membership>> + Send;

    /// Create a pending join request, or return the existing pending one.
    ///
    /// # Errors
    ///
    /// Returns error if the insert fails.
    fn request_to_join(
        &self,
        community_id: CommunityId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<JoinRequest>> + Send;
}
