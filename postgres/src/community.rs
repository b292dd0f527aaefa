//! `PostgreSQL` community directory.

use crate::error::db_error;
use crate::rows::{community_from_row, join_request_from_row, membership_from_row};
use chrono::{DateTime, Utc};
use gathering_core::error::{AttendanceError, ForbiddenReason, Result};
use gathering_core::providers::CommunityDirectory;
use gathering_core::types::{
    Community, CommunityId, JoinRequest, JoinRequestId, Membership, MembershipRole, UserId,
};
use sqlx::{PgConnection, PgPool};

const ACTIVE_BAN: &str = r"
    SELECT EXISTS(
        SELECT 1 FROM community_bans
        WHERE community_id = $1
          AND user_id = $2
          AND (expires_at IS NULL OR expires_at > $3)
    )
";

/// `PostgreSQL` community directory.
///
/// Reads communities, memberships, and bans. Writes only the two things the
/// attendance flow may create: a `member` row for a public community and a
/// pending join request for a private one.
#[derive(Clone, Debug)]
pub struct PostgresCommunityDirectory {
    pool: PgPool,
}

impl PostgresCommunityDirectory {
    /// Create a directory over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a community row.
    ///
    /// # Errors
    ///
    /// Returns [`AttendanceError::DatabaseError`] if the insert fails.
    pub async fn insert_community(&self, community: &Community) -> Result<()> {
        sqlx::query("INSERT INTO communities (id, name, is_private) VALUES ($1, $2, $3)")
            .bind(community.id.as_uuid())
            .bind(&community.name)
            .bind(community.is_private)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to insert community"))?;
        Ok(())
    }

    /// Add a member with the given role.
    ///
    /// # Errors
    ///
    /// Returns [`AttendanceError::DatabaseError`] if the insert fails.
    pub async fn add_member(
        &self,
        community_id: CommunityId,
        user_id: UserId,
        role: MembershipRole,
        joined_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO community_members (community_id, user_id, role, joined_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (community_id, user_id) DO UPDATE SET role = EXCLUDED.role
            ",
        )
        .bind(community_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(role.as_str())
        .bind(joined_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to add member"))?;
        Ok(())
    }

    /// Ban a user, optionally until `expires_at`.
    ///
    /// Takes the community row `FOR UPDATE`, so it waits for any join that
    /// holds the row `FOR SHARE` and every later join sees the ban.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Community not found → [`AttendanceError::NotFound`]
    /// - The lock or insert fails → [`AttendanceError::DatabaseError`]
    pub async fn ban(
        &self,
        community_id: CommunityId,
        user_id: UserId,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        sqlx::query("SELECT 1 FROM communities WHERE id = $1 FOR UPDATE")
            .bind(community_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error("Failed to lock community"))?
            .ok_or_else(|| AttendanceError::NotFound {
                resource: "community",
                id: community_id.to_string(),
            })?;

        sqlx::query(
            "INSERT INTO community_bans (community_id, user_id, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(community_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(expires_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to insert ban"))?;

        tx.commit().await.map_err(db_error("Failed to commit ban"))?;
        Ok(())
    }
}

async fn fetch_membership(
    conn: &mut PgConnection,
    community_id: CommunityId,
    user_id: UserId,
) -> Result<Option<Membership>> {
    sqlx::query(
        r"
        SELECT community_id, user_id, role, joined_at
        FROM community_members
        WHERE community_id = $1 AND user_id = $2
        ",
    )
    .bind(community_id.as_uuid())
    .bind(user_id.as_uuid())
    .fetch_optional(&mut *conn)
    .await
    .map_err(db_error("Failed to get membership"))?
    .as_ref()
    .map(membership_from_row)
    .transpose()
}

async fn has_active_ban(
    conn: &mut PgConnection,
    community_id: CommunityId,
    user_id: UserId,
    now: DateTime<Utc>,
) -> Result<bool> {
    sqlx::query_scalar(ACTIVE_BAN)
        .bind(community_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(now)
        .fetch_one(&mut *conn)
        .await
        .map_err(db_error("Failed to check ban"))
}

impl CommunityDirectory for PostgresCommunityDirectory {
    async fn get_community(&self, community_id: CommunityId) -> Result<Community> {
        let row = sqlx::query("SELECT id, name, is_private FROM communities WHERE id = $1")
            .bind(community_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to get community"))?
            .ok_or_else(|| AttendanceError::NotFound {
                resource: "community",
                id: community_id.to_string(),
            })?;

        community_from_row(&row)
    }

    async fn get_membership(
        &self,
        community_id: CommunityId,
        user_id: UserId,
    ) -> Result<Option<Membership>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(db_error("Failed to acquire connection"))?;
        fetch_membership(&mut conn, community_id, user_id).await
    }

    async fn is_banned(
        &self,
        community_id: CommunityId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(db_error("Failed to acquire connection"))?;
        has_active_ban(&mut conn, community_id, user_id, now).await
    }

    async fn join_public(
        &self,
        community_id: CommunityId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Membership> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        // Conflicts with the FOR UPDATE taken by `ban`
        sqlx::query("SELECT 1 FROM communities WHERE id = $1 FOR SHARE")
            .bind(community_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to lock community"))?;

        if has_active_ban(&mut tx, community_id, user_id, now).await? {
            return Err(AttendanceError::forbidden(ForbiddenReason::Banned));
        }

        sqlx::query(
            r"
            INSERT INTO community_members (community_id, user_id, role, joined_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (community_id, user_id) DO NOTHING
            ",
        )
        .bind(community_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(MembershipRole::Member.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to join community"))?;

        let membership = fetch_membership(&mut tx, community_id, user_id)
            .await?
            .ok_or_else(|| AttendanceError::Internal("membership missing after join".to_string()))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit membership"))?;

        tracing::info!(%community_id, %user_id, "User joined public community");
        Ok(membership)
    }

    async fn request_to_join(
        &self,
        community_id: CommunityId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<JoinRequest> {
        sqlx::query(
            r"
            INSERT INTO join_requests (id, community_id, user_id, status, created_at)
            VALUES ($1, $2, $3, 'pending', $4)
            ON CONFLICT (community_id, user_id) WHERE status = 'pending' DO NOTHING
            ",
        )
        .bind(JoinRequestId::new().as_uuid())
        .bind(community_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to create join request"))?;

        let row = sqlx::query(
            r"
            SELECT id, community_id, user_id, status, created_at
            FROM join_requests
            WHERE community_id = $1 AND user_id = $2 AND status = 'pending'
            ",
        )
        .bind(community_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to get join request"))?;

        join_request_from_row(&row)
    }
}
