//! Attendance engine.
//!
//! Each mutating operation follows the same shape:
//!
//! 1. Read-only validation and eligibility checks (no writes on failure)
//! 2. One atomic repository call, rerun on `Conflict`
//! 3. Post-commit promotion notifications on a detached task, best-effort
//!    with a per-notice timeout

use crate::config::EngineConfig;
use crate::metrics::AttendanceMetrics;
use crate::retry::retry_with_predicate;
use gathering_core::environment::Clock;
use gathering_core::providers::{
    AttendanceRepository, CommunityDirectory, EventRepository, NotificationDispatcher,
    SupportDirectory, WaitlistPromotionNotice,
};
use gathering_core::{
    AttendanceError, AttendanceRecord, AttendanceResult, AttendanceStatus, AttendanceStatusView,
    AttendanceSummary, AttendeeListParams, AttendeeQuery, CapacityChangeOutcome, CommunityId,
    Event, EventId, EventUpdate, ForbiddenReason, MembershipDecision, MembershipGate, Page,
    Promotion, PromotionTrigger, Result, UserId,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, debug, info, warn};

/// Attendance environment.
///
/// Contains all external dependencies needed by the engine.
///
/// # Type Parameters
///
/// - `E`: Event repository
/// - `A`: Attendance repository
/// - `C`: Community directory
/// - `S`: Support directory
/// - `N`: Notification dispatcher
#[derive(Clone)]
pub struct AttendanceEnvironment<E, A, C, S, N> {
    /// Event lookup.
    pub events: E,

    /// Attendance records and counters.
    pub attendance: A,

    /// Membership, bans, and join requests.
    pub communities: C,

    /// Support subscriptions.
    pub support: S,

    /// Post-commit notifications.
    pub notifier: N,

    /// Clock for every timestamp and "has ended" check.
    pub clock: Arc<dyn Clock>,
}

impl<E, A, C, S, N> AttendanceEnvironment<E, A, C, S, N> {
    /// Create a new attendance environment.
    #[must_use]
    pub fn new(
        events: E,
        attendance: A,
        communities: C,
        support: S,
        notifier: N,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            events,
            attendance,
            communities,
            support,
            notifier,
            clock,
        }
    }
}

/// Orchestrates membership gating, RSVP transitions, waitlist promotion, and
/// capacity reconciliation over the injected providers.
#[derive(Clone)]
pub struct AttendanceEngine<E, A, C, S, N> {
    env: AttendanceEnvironment<E, A, C, S, N>,
    config: EngineConfig,
}

impl<E, A, C, S, N> AttendanceEngine<E, A, C, S, N>
where
    E: EventRepository,
    A: AttendanceRepository,
    C: CommunityDirectory,
    S: SupportDirectory,
    N: NotificationDispatcher,
{
    /// Create a new engine.
    #[must_use]
    pub const fn new(env: AttendanceEnvironment<E, A, C, S, N>, config: EngineConfig) -> Self {
        Self { env, config }
    }

    /// The injected providers.
    #[must_use]
    pub const fn environment(&self) -> &AttendanceEnvironment<E, A, C, S, N> {
        &self.env
    }

    /// The engine configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Membership
    // ═══════════════════════════════════════════════════════════════════════

    /// Run the membership gate for `user_id` in `community_id`.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Community not found → `NotFound`
    /// - Public community and user is banned → `Forbidden` (`Banned`)
    /// - Directory lookup or insert fails
    #[tracing::instrument(skip(self))]
    pub async fn resolve_membership_for_attendance(
        &self,
        community_id: CommunityId,
        user_id: UserId,
    ) -> Result<MembershipDecision> {
        let now = self.env.clock.now();
        let decision = MembershipGate::new(&self.env.communities)
            .resolve(community_id, user_id, now)
            .await?;

        match &decision {
            MembershipDecision::AlreadyMember { .. } => {
                debug!("User is already a member");
            }
            MembershipDecision::AutoJoined { .. } => {
                info!("User auto-joined public community");
            }
            MembershipDecision::JoinRequestSent { request } => {
                info!(request_id = %request.id, "Join request pending for private community");
            }
        }

        Ok(decision)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // RSVP
    // ═══════════════════════════════════════════════════════════════════════

    /// Set the caller's attendance status.
    ///
    /// Attending takes a free slot or joins the waitlist. Leaving `attending`
    /// promotes the head of the waitlist in the same transaction. Repeating the
    /// current status is a successful no-op.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Event not found → `NotFound`
    /// - Event ended, user banned, join request pending, or supporters-only → `Forbidden`
    /// - Transaction keeps conflicting → `Conflict`
    /// - Store failure → `DatabaseError` / `Internal`
    #[tracing::instrument(skip(self))]
    pub async fn set_attendance_status(
        &self,
        event_id: EventId,
        user_id: UserId,
        target: AttendanceStatus,
    ) -> Result<AttendanceResult> {
        let now = self.env.clock.now();
        let event = self.env.events.get_event(event_id).await?;

        self.check_eligibility(&event, user_id).await?;

        let outcome = self
            .with_retry(|| {
                self.env
                    .attendance
                    .apply_transition(event_id, user_id, target, now)
            })
            .await?;

        if outcome.changed() {
            AttendanceMetrics::record_transition(outcome.prior, outcome.record.status);
            info!(
                from = outcome.prior.map_or("none", |s| s.as_str()),
                to = %outcome.record.status,
                current_attendees = outcome.event.current_attendees,
                waitlist_position = outcome.waitlist_position,
                "Attendance status changed"
            );
        } else {
            debug!(status = %outcome.record.status, "Attendance status unchanged");
        }

        if let Some(promotion) = outcome.promotion {
            AttendanceMetrics::record_promotions(PromotionTrigger::Cancellation, 1);
            info!(promoted_user = %promotion.user_id, "Promoted next waitlisted user");
            self.notify_promotions(&outcome.event, &[promotion]).await;
        }

        Ok(AttendanceResult::from(&outcome))
    }

    /// Eligibility checks, in order: event not ended, user not banned,
    /// supporters-only subscription, membership gate.
    ///
    /// The gate is last because it may write a membership or join request;
    /// every read-only refusal comes first.
    async fn check_eligibility(&self, event: &Event, user_id: UserId) -> Result<()> {
        let now = self.env.clock.now();

        if event.has_ended(now) {
            return Err(AttendanceError::forbidden(ForbiddenReason::EventEnded));
        }

        if self
            .env
            .communities
            .is_banned(event.community_id, user_id, now)
            .await?
        {
            return Err(AttendanceError::forbidden(ForbiddenReason::Banned));
        }

        if event.supporters_only
            && !self
                .env
                .support
                .has_active_support(event.community_id, user_id, now)
                .await?
        {
            return Err(AttendanceError::forbidden(ForbiddenReason::SupportersOnly));
        }

        self.resolve_membership_for_attendance(event.community_id, user_id)
            .await?
            .into_eligibility()?;

        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Waitlist & Capacity
    // ═══════════════════════════════════════════════════════════════════════

    /// Promote the head of the waitlist into a free slot, if there is one.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Event not found → `NotFound`
    /// - Transaction keeps conflicting → `Conflict`
    /// - Store failure → `DatabaseError` / `Internal`
    #[tracing::instrument(skip(self))]
    pub async fn promote_next(&self, event_id: EventId) -> Result<Option<Promotion>> {
        let now = self.env.clock.now();
        let promotion = self
            .with_retry(|| self.env.attendance.promote_next(event_id, now))
            .await?;

        match promotion {
            Some(promotion) => {
                AttendanceMetrics::record_promotions(PromotionTrigger::Manual, 1);
                info!(promoted_user = %promotion.user_id, "Promoted next waitlisted user");
                let event = self.env.events.get_event(event_id).await?;
                self.notify_promotions(&event, &[promotion]).await;
                Ok(Some(promotion))
            }
            None => {
                debug!("No promotion possible");
                Ok(None)
            }
        }
    }

    /// Change an event's capacity, promoting waitlisted users on growth.
    ///
    /// The previous capacity is read under the event lock. Returns the
    /// promotions in FIFO order.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Event not found → `NotFound`
    /// - New capacity below confirmed attendance → `Forbidden`
    /// - Transaction keeps conflicting → `Conflict`
    #[tracing::instrument(skip(self))]
    pub async fn apply_capacity_change(
        &self,
        event_id: EventId,
        new_max: Option<u32>,
    ) -> Result<Vec<Promotion>> {
        self.update_event(event_id, EventUpdate::capacity(new_max))
            .await
            .map(|outcome| outcome.promotions)
    }

    /// Update event fields, reconciling capacity first.
    ///
    /// A refused capacity change leaves every field unchanged.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Update is empty or fields are invalid → `InvalidArgument`
    /// - Event not found → `NotFound`
    /// - New capacity below confirmed attendance → `Forbidden`
    /// - Transaction keeps conflicting → `Conflict`
    #[tracing::instrument(skip(self, update))]
    pub async fn update_event(
        &self,
        event_id: EventId,
        update: EventUpdate,
    ) -> Result<CapacityChangeOutcome> {
        if update.is_empty() {
            return Err(AttendanceError::InvalidArgument(
                "event update contains no fields".to_string(),
            ));
        }

        let now = self.env.clock.now();
        let result = self
            .with_retry(|| self.env.attendance.apply_event_update(event_id, &update, now))
            .await;

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                if matches!(
                    err,
                    AttendanceError::Forbidden {
                        reason: ForbiddenReason::CapacityBelowAttendance { .. }
                    }
                ) {
                    AttendanceMetrics::record_capacity_change("rejected");
                    warn!(error = %err, "Capacity change rejected");
                }
                return Err(err);
            }
        };

        if update.max_attendees.is_some() {
            let label = match (outcome.previous_max, outcome.event.max_attendees) {
                (old, new) if old == new => "unchanged",
                (Some(_), None) => "increased",
                (Some(old), Some(new)) if new > old => "increased",
                _ => "decreased",
            };
            AttendanceMetrics::record_capacity_change(label);
            info!(
                previous_max = ?outcome.previous_max,
                new_max = ?outcome.event.max_attendees,
                promoted = outcome.promotions.len(),
                "Event capacity updated"
            );
        } else {
            info!("Event updated");
        }

        if !outcome.promotions.is_empty() {
            AttendanceMetrics::record_promotions(
                PromotionTrigger::CapacityIncrease,
                outcome.promotions.len(),
            );
            self.notify_promotions(&outcome.event, &outcome.promotions)
                .await;
        }

        Ok(outcome)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════════════════

    /// A user's attendance status; `status` is `None` without a record.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Event not found → `NotFound`
    /// - Store failure
    #[tracing::instrument(skip(self))]
    pub async fn get_attendance_status(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<AttendanceStatusView> {
        self.env.events.get_event(event_id).await?;

        let Some(record) = self.env.attendance.get_record(event_id, user_id).await? else {
            return Ok(AttendanceStatusView::none(event_id, user_id));
        };

        let waitlist_position = if record.status == AttendanceStatus::Waitlisted {
            self.env
                .attendance
                .waitlist_position(event_id, user_id)
                .await?
        } else {
            None
        };

        Ok(AttendanceStatusView {
            event_id,
            user_id,
            status: Some(record.status),
            waitlist_position,
            attended: record.attended,
        })
    }

    /// Paginated attendee listing in status-priority order.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - `page` or `limit` is zero → `InvalidArgument`
    /// - Event not found → `NotFound`
    /// - Store failure
    #[tracing::instrument(skip(self))]
    pub async fn get_event_attendees(
        &self,
        event_id: EventId,
        params: AttendeeListParams,
    ) -> Result<Page<AttendanceRecord>> {
        let query = AttendeeQuery::from_params(params, self.config.page_limits)?;
        self.env.events.get_event(event_id).await?;
        self.env.attendance.list_attendees(event_id, query).await
    }

    /// Per-status counts for an event.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Event not found → `NotFound`
    /// - Store failure
    #[tracing::instrument(skip(self))]
    pub async fn attendance_summary(&self, event_id: EventId) -> Result<AttendanceSummary> {
        self.env.attendance.summary(event_id).await
    }

    /// Record whether a user actually showed up.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - No record for the user → `NotFound`
    /// - Store failure
    #[tracing::instrument(skip(self))]
    pub async fn mark_attended(
        &self,
        event_id: EventId,
        user_id: UserId,
        attended: Option<bool>,
    ) -> Result<AttendanceRecord> {
        let now = self.env.clock.now();
        let record = self
            .env
            .attendance
            .set_attended(event_id, user_id, attended, now)
            .await?;
        info!(attended = ?record.attended, "Real-world attendance recorded");
        Ok(record)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Internals
    // ═══════════════════════════════════════════════════════════════════════

    async fn with_retry<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        retry_with_predicate(&self.config.retry, operation, AttendanceError::is_retryable).await
    }

    /// Hands promotion notices to a detached task once the transaction has
    /// committed. The caller never waits on delivery.
    async fn notify_promotions(&self, event: &Event, promotions: &[Promotion]) {
        let community_name = match self.env.communities.get_community(event.community_id).await {
            Ok(community) => community.name,
            Err(err) => {
                warn!(error = %err, "Could not load community for promotion notice");
                String::new()
            }
        };

        let notices: Vec<_> = promotions
            .iter()
            .map(|promotion| WaitlistPromotionNotice {
                recipient: promotion.user_id,
                event_id: event.id,
                event_title: event.title.clone(),
                community_id: event.community_id,
                community_name: community_name.clone(),
                promoted_at: promotion.promoted_at,
            })
            .collect();

        tokio::spawn(
            deliver_notices(
                self.env.notifier.clone(),
                notices,
                self.config.notification_timeout,
            )
            .in_current_span(),
        );
    }
}

/// Sends notices in FIFO order. Failures and timeouts are logged and counted,
/// never returned.
async fn deliver_notices<N: NotificationDispatcher>(
    notifier: N,
    notices: Vec<WaitlistPromotionNotice>,
    timeout: Duration,
) {
    for notice in notices {
        let delivery =
            tokio::time::timeout(timeout, notifier.notify_waitlist_promotion(&notice)).await;

        match delivery {
            Ok(Ok(())) => {
                debug!(recipient = %notice.recipient, "Promotion notice sent");
            }
            Ok(Err(err)) => {
                AttendanceMetrics::record_notification_failure();
                warn!(
                    recipient = %notice.recipient,
                    error = %err,
                    "Promotion notice failed; promotion stands"
                );
            }
            Err(_) => {
                AttendanceMetrics::record_notification_failure();
                warn!(
                    recipient = %notice.recipient,
                    timeout_ms = timeout.as_millis(),
                    "Promotion notice timed out; promotion stands"
                );
            }
        }
    }
}
