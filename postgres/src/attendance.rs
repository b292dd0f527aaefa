//! `PostgreSQL` event and attendance repository.

use crate::error::db_error;
use crate::rows::{
    EVENT_COLUMNS, RECORD_COLUMNS, count_to_u32, event_from_row, record_from_row, to_i32,
};
use chrono::{DateTime, Utc};
use gathering_core::attendance::{TransitionOutcome, TransitionPlan, plan_transition};
use gathering_core::capacity::{CapacityChangeOutcome, EventUpdate, reconcile_capacity};
use gathering_core::error::{AttendanceError, Result};
use gathering_core::providers::{AttendanceRepository, EventRepository};
use gathering_core::query::{AttendeeQuery, Page};
use gathering_core::types::{
    AttendanceRecord, AttendanceStatus, AttendanceSummary, Event, EventId, UserId,
};
use gathering_core::waitlist::Promotion;
use sqlx::{PgConnection, PgPool, Row};

/// `PostgreSQL` attendance repository.
///
/// Implements both [`EventRepository`] and [`AttendanceRepository`]. Every
/// mutating call is a single transaction that locks the event row before it
/// reads the counter or the waitlist.
///
/// # Example
///
/// ```no_run
/// use gathering_core::providers::AttendanceRepository;
/// use gathering_core::types::{AttendanceStatus, EventId, UserId};
/// use gathering_postgres::PostgresAttendanceRepository;
///
/// # async fn example(pool: sqlx::PgPool, event_id: EventId, user_id: UserId) -> gathering_core::Result<()> {
/// let repo = PostgresAttendanceRepository::new(pool);
/// let outcome = repo
///     .apply_transition(event_id, user_id, AttendanceStatus::Attending, chrono::Utc::now())
///     .await?;
/// println!("now {}", outcome.record.status);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct PostgresAttendanceRepository {
    pool: PgPool,
}

impl PostgresAttendanceRepository {
    /// Create a repository over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert an event row.
    ///
    /// Events are authored outside the attendance engine; this is for seeding
    /// and for callers that own event creation.
    ///
    /// # Errors
    ///
    /// Returns [`AttendanceError::DatabaseError`] if the insert fails.
    pub async fn insert_event(&self, event: &Event) -> Result<()> {
        let max_attendees = event
            .max_attendees
            .map(|max| to_i32(max, "max_attendees"))
            .transpose()?;

        sqlx::query(
            r"
            INSERT INTO events (
                id, community_id, title, description, starts_at, ends_at, timezone,
                max_attendees, current_attendees, supporters_only, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ",
        )
        .bind(event.id.as_uuid())
        .bind(event.community_id.as_uuid())
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.starts_at)
        .bind(event.ends_at)
        .bind(&event.timezone)
        .bind(max_attendees)
        .bind(to_i32(event.current_attendees, "current_attendees")?)
        .bind(event.supporters_only)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to insert event"))?;

        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Statements shared across transactions
// ═══════════════════════════════════════════════════════════════════════════

/// Lock the event row for the rest of the transaction.
async fn lock_event(conn: &mut PgConnection, event_id: EventId) -> Result<Event> {
    let row = sqlx::query(&format!(
        "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 FOR UPDATE"
    ))
    .bind(event_id.as_uuid())
    .fetch_optional(&mut *conn)
    .await
    .map_err(db_error("Failed to lock event"))?
    .ok_or_else(|| AttendanceError::event_not_found(event_id))?;

    event_from_row(&row)
}

async fn fetch_record(
    conn: &mut PgConnection,
    event_id: EventId,
    user_id: UserId,
) -> Result<Option<AttendanceRecord>> {
    sqlx::query(&format!(
        "SELECT {RECORD_COLUMNS} FROM attendance_records WHERE event_id = $1 AND user_id = $2"
    ))
    .bind(event_id.as_uuid())
    .bind(user_id.as_uuid())
    .fetch_optional(&mut *conn)
    .await
    .map_err(db_error("Failed to get attendance record"))?
    .as_ref()
    .map(record_from_row)
    .transpose()
}

async fn store_counter(conn: &mut PgConnection, event_id: EventId, counter: u32) -> Result<()> {
    sqlx::query("UPDATE events SET current_attendees = $2 WHERE id = $1")
        .bind(event_id.as_uuid())
        .bind(to_i32(counter, "current_attendees")?)
        .execute(&mut *conn)
        .await
        .map_err(db_error("Failed to update attendee counter"))?;
    Ok(())
}

/// 1-based position among waitlisted records, `None` if not waitlisted.
async fn position_of(
    conn: &mut PgConnection,
    event_id: EventId,
    user_id: UserId,
) -> Result<Option<u32>> {
    let ahead: i64 = sqlx::query_scalar(
        r"
        SELECT COUNT(*)
        FROM attendance_records me
        JOIN attendance_records w
          ON w.event_id = me.event_id
         AND w.status = 'waitlisted'
         AND (w.created_at, w.seq) <= (me.created_at, me.seq)
        WHERE me.event_id = $1 AND me.user_id = $2 AND me.status = 'waitlisted'
        ",
    )
    .bind(event_id.as_uuid())
    .bind(user_id.as_uuid())
    .fetch_one(&mut *conn)
    .await
    .map_err(db_error("Failed to compute waitlist position"))?;

    Ok((ahead > 0).then(|| count_to_u32(ahead)))
}

/// Per-status counts for an event.
async fn status_counts(conn: &mut PgConnection, event_id: EventId) -> Result<AttendanceSummary> {
    let rows = sqlx::query(
        r"
        SELECT status, COUNT(*) AS n
        FROM attendance_records
        WHERE event_id = $1
        GROUP BY status
        ",
    )
    .bind(event_id.as_uuid())
    .fetch_all(&mut *conn)
    .await
    .map_err(db_error("Failed to count attendance"))?;

    let mut summary = AttendanceSummary::default();
    for row in &rows {
        let status: String = row.try_get("status").map_err(db_error("Failed to decode status"))?;
        let n: i64 = row.try_get("n").map_err(db_error("Failed to decode count"))?;
        let n = count_to_u32(n);
        match status
            .parse::<AttendanceStatus>()
            .map_err(|e| AttendanceError::DatabaseError(e.to_string()))?
        {
            AttendanceStatus::Attending => summary.attending = n,
            AttendanceStatus::Maybe => summary.maybe = n,
            AttendanceStatus::NotAttending => summary.not_attending = n,
            AttendanceStatus::Waitlisted => summary.waitlisted = n,
        }
    }
    Ok(summary)
}

/// Move the head of the waitlist to `attending`, keeping `event` in sync.
///
/// The caller must hold the event row lock.
async fn promote_head(
    conn: &mut PgConnection,
    event: &mut Event,
    now: DateTime<Utc>,
) -> Result<Option<Promotion>> {
    let head: Option<uuid::Uuid> = sqlx::query_scalar(
        r"
        SELECT user_id
        FROM attendance_records
        WHERE event_id = $1 AND status = 'waitlisted'
        ORDER BY created_at ASC, seq ASC
        LIMIT 1
        ",
    )
    .bind(event.id.as_uuid())
    .fetch_optional(&mut *conn)
    .await
    .map_err(db_error("Failed to read waitlist head"))?;

    let Some(user_id) = head.map(UserId::from_uuid) else {
        return Ok(None);
    };

    let plan = TransitionPlan {
        prior: Some(AttendanceStatus::Waitlisted),
        next: AttendanceStatus::Attending,
        counter_delta: 1,
        promote_next: false,
    };
    let counter = plan.apply_to_counter(event.capacity())?;

    sqlx::query(
        r"
        UPDATE attendance_records
        SET status = 'attending', updated_at = $3
        WHERE event_id = $1 AND user_id = $2
        ",
    )
    .bind(event.id.as_uuid())
    .bind(user_id.as_uuid())
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(db_error("Failed to promote from waitlist"))?;

    store_counter(conn, event.id, counter).await?;
    event.current_attendees = counter;

    Ok(Some(Promotion {
        event_id: event.id,
        user_id,
        promoted_at: now,
    }))
}

// ═══════════════════════════════════════════════════════════════════════════
// Provider implementations
// ═══════════════════════════════════════════════════════════════════════════

impl EventRepository for PostgresAttendanceRepository {
    async fn get_event(&self, event_id: EventId) -> Result<Event> {
        let row = sqlx::query(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
            .bind(event_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to get event"))?
            .ok_or_else(|| AttendanceError::event_not_found(event_id))?;

        event_from_row(&row)
    }
}

impl AttendanceRepository for PostgresAttendanceRepository {
    async fn apply_transition(
        &self,
        event_id: EventId,
        user_id: UserId,
        target: AttendanceStatus,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let mut event = lock_event(&mut tx, event_id).await?;
        let capacity = event.capacity();
        let prior = fetch_record(&mut tx, event_id, user_id)
            .await?
            .map(|record| record.status);

        let plan = plan_transition(capacity, prior, target);
        let counter = plan.apply_to_counter(capacity)?;

        if !plan.is_noop() {
            // created_at is the waitlist key and survives every later change
            sqlx::query(
                r"
                INSERT INTO attendance_records (event_id, user_id, status, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $4)
                ON CONFLICT (event_id, user_id)
                DO UPDATE SET status = EXCLUDED.status, updated_at = EXCLUDED.updated_at
                ",
            )
            .bind(event_id.as_uuid())
            .bind(user_id.as_uuid())
            .bind(plan.next.as_str())
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to upsert attendance record"))?;

            if plan.counter_delta != 0 {
                store_counter(&mut tx, event_id, counter).await?;
                event.current_attendees = counter;
            }
        }

        let promotion = if plan.promote_next {
            promote_head(&mut tx, &mut event, now).await?
        } else {
            None
        };

        let record = fetch_record(&mut tx, event_id, user_id)
            .await?
            .ok_or_else(|| AttendanceError::Internal("record missing after upsert".to_string()))?;
        let waitlist_position = position_of(&mut tx, event_id, user_id).await?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit attendance transition"))?;

        Ok(TransitionOutcome {
            event,
            record,
            prior,
            waitlist_position,
            promotion,
        })
    }

    async fn promote_next(
        &self,
        event_id: EventId,
        now: DateTime<Utc>,
    ) -> Result<Option<Promotion>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let mut event = lock_event(&mut tx, event_id).await?;
        if !event.capacity().has_free_slot() {
            return Ok(None);
        }

        let promotion = promote_head(&mut tx, &mut event, now).await?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit promotion"))?;

        Ok(promotion)
    }

    async fn apply_event_update(
        &self,
        event_id: EventId,
        update: &EventUpdate,
        now: DateTime<Utc>,
    ) -> Result<CapacityChangeOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let event = lock_event(&mut tx, event_id).await?;
        let counts = status_counts(&mut tx, event_id).await?;
        let plan = reconcile_capacity(
            event.max_attendees,
            update.requested_capacity(&event),
            counts.attending,
            counts.waitlisted,
        )?;
        let mut merged = update.merge(&event, now)?;

        let max_attendees = merged
            .max_attendees
            .map(|max| to_i32(max, "max_attendees"))
            .transpose()?;

        sqlx::query(
            r"
            UPDATE events
            SET title = $2,
                description = $3,
                starts_at = $4,
                ends_at = $5,
                timezone = $6,
                max_attendees = $7,
                updated_at = $8
            WHERE id = $1
            ",
        )
        .bind(event_id.as_uuid())
        .bind(&merged.title)
        .bind(&merged.description)
        .bind(merged.starts_at)
        .bind(merged.ends_at)
        .bind(&merged.timezone)
        .bind(max_attendees)
        .bind(merged.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to update event"))?;

        let mut promotions = Vec::new();
        for _ in 0..plan.promotions {
            match promote_head(&mut tx, &mut merged, now).await? {
                Some(promotion) => promotions.push(promotion),
                None => break,
            }
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit event update"))?;

        Ok(CapacityChangeOutcome {
            event: merged,
            previous_max: event.max_attendees,
            promotions,
        })
    }

    async fn get_record(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Option<AttendanceRecord>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(db_error("Failed to acquire connection"))?;
        fetch_record(&mut conn, event_id, user_id).await
    }

    async fn waitlist_position(&self, event_id: EventId, user_id: UserId) -> Result<Option<u32>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(db_error("Failed to acquire connection"))?;
        position_of(&mut conn, event_id, user_id).await
    }

    async fn list_attendees(
        &self,
        event_id: EventId,
        query: AttendeeQuery,
    ) -> Result<Page<AttendanceRecord>> {
        let status = query.status.map(|s| s.as_str());
        let offset = i64::try_from(query.offset()).unwrap_or(i64::MAX);

        let total: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*)
            FROM attendance_records
            WHERE event_id = $1 AND ($2::TEXT IS NULL OR status = $2)
            ",
        )
        .bind(event_id.as_uuid())
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to count attendees"))?;

        let rows = sqlx::query(&format!(
            r"
            SELECT {RECORD_COLUMNS}
            FROM attendance_records
            WHERE event_id = $1 AND ($2::TEXT IS NULL OR status = $2)
            ORDER BY
                CASE status
                    WHEN 'attending' THEN 0
                    WHEN 'maybe' THEN 1
                    WHEN 'waitlisted' THEN 2
                    ELSE 3
                END,
                created_at ASC,
                seq ASC
            LIMIT $3 OFFSET $4
            "
        ))
        .bind(event_id.as_uuid())
        .bind(status)
        .bind(i64::from(query.limit))
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list attendees"))?;

        let items = rows.iter().map(record_from_row).collect::<Result<Vec<_>>>()?;

        Ok(Page {
            items,
            page: query.page,
            limit: query.limit,
            total: u64::try_from(total).unwrap_or_default(),
        })
    }

    async fn summary(&self, event_id: EventId) -> Result<AttendanceSummary> {
        let event = self.get_event(event_id).await?;
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(db_error("Failed to acquire connection"))?;
        let counts = status_counts(&mut conn, event_id).await?;

        Ok(AttendanceSummary {
            max_attendees: event.max_attendees,
            current_attendees: event.current_attendees,
            ..counts
        })
    }

    async fn set_attended(
        &self,
        event_id: EventId,
        user_id: UserId,
        attended: Option<bool>,
        now: DateTime<Utc>,
    ) -> Result<AttendanceRecord> {
        let row = sqlx::query(&format!(
            r"
            UPDATE attendance_records
            SET attended = $3, updated_at = $4
            WHERE event_id = $1 AND user_id = $2
            RETURNING {RECORD_COLUMNS}
            "
        ))
        .bind(event_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(attended)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to mark attendance"))?
        .ok_or_else(|| AttendanceError::NotFound {
            resource: "attendance record",
            id: format!("{event_id}/{user_id}"),
        })?;

        record_from_row(&row)
    }
}
