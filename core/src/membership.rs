//! Membership gate.
//!
//! Decides, before an RSVP, whether a non-member joins the event's community
//! on the spot (public), has to wait on a join request (private), or is
//! blocked by a ban.

use crate::error::{AttendanceError, ForbiddenReason, Result};
use crate::providers::CommunityDirectory;
use crate::types::{CommunityId, JoinRequest, Membership, UserId};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// What the gate did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipAction {
    /// User was already a member
    None,
    /// User was added to a public community
    AutoJoined,
    /// A join request to a private community exists
    JoinRequestSent,
}

/// Three-way outcome of the membership gate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MembershipDecision {
    /// User already had a membership row.
    AlreadyMember {
        /// Existing membership
        membership: Membership,
    },
    /// User was just added to a public community.
    AutoJoined {
        /// New membership
        membership: Membership,
    },
    /// Community is private; attendance waits on this request.
    JoinRequestSent {
        /// New or existing pending request
        request: JoinRequest,
    },
}

impl MembershipDecision {
    /// Whether the user is a member after the gate ran.
    #[must_use]
    pub const fn is_member(&self) -> bool {
        !matches!(self, Self::JoinRequestSent { .. })
    }

    /// The gate's action.
    #[must_use]
    pub const fn action_taken(&self) -> MembershipAction {
        match self {
            Self::AlreadyMember { .. } => MembershipAction::None,
            Self::AutoJoined { .. } => MembershipAction::AutoJoined,
            Self::JoinRequestSent { .. } => MembershipAction::JoinRequestSent,
        }
    }

    /// Human-readable reason, set when attendance is blocked.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        match self {
            Self::JoinRequestSent { request } => Some(
                ForbiddenReason::JoinRequestPending {
                    request_id: request.id,
                }
                .to_string(),
            ),
            Self::AlreadyMember { .. } | Self::AutoJoined { .. } => None,
        }
    }

    /// Turn the decision into an attendance eligibility result.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` (`JoinRequestPending`) when the user is not a member.
    pub fn into_eligibility(self) -> Result<Membership> {
        match self {
            Self::AlreadyMember { membership } | Self::AutoJoined { membership } => Ok(membership),
            Self::JoinRequestSent { request } => Err(AttendanceError::forbidden(
                ForbiddenReason::JoinRequestPending {
                    request_id: request.id,
                },
            )),
        }
    }
}

/// Caller-facing summary of a [`MembershipDecision`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MembershipResolution {
    /// Whether the user is a member now
    pub is_member: bool,
    /// What the gate did
    pub action_taken: MembershipAction,
    /// Why attendance is blocked, if it is
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<&MembershipDecision> for MembershipResolution {
    fn from(decision: &MembershipDecision) -> Self {
        Self {
            is_member: decision.is_member(),
            action_taken: decision.action_taken(),
            reason: decision.reason(),
        }
    }
}

/// Membership policy over a [`CommunityDirectory`].
#[derive(Debug)]
pub struct MembershipGate<'a, C> {
    directory: &'a C,
}

impl<'a, C: CommunityDirectory> MembershipGate<'a, C> {
    /// Create a gate over `directory`.
    #[must_use]
    pub const fn new(directory: &'a C) -> Self {
        Self { directory }
    }

    /// Resolve membership for an attendance request.
    ///
    /// Creates at most one membership row or one join request, never both.
    /// Re-running it for a user with a pending request returns that request.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Community not found → `AttendanceError::NotFound`
    /// - Public community and user is banned → `AttendanceError::Forbidden` (`Banned`)
    /// - Directory lookup or insert fails
    pub async fn resolve(
        &self,
        community_id: CommunityId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<MembershipDecision> {
        if let Some(membership) = self.directory.get_membership(community_id, user_id).await? {
            return Ok(MembershipDecision::AlreadyMember { membership });
        }

        let community = self.directory.get_community(community_id).await?;

        if community.is_private {
            let request = self
                .directory
                .request_to_join(community_id, user_id, now)
                .await?;
            Ok(MembershipDecision::JoinRequestSent { request })
        } else {
            let membership = self.directory.join_public(community_id, user_id, now).await?;
            Ok(MembershipDecision::AutoJoined { membership })
        }
    }
}
