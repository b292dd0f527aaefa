//! In-memory provider implementations.
//!
//! Deterministic stand-ins for the `PostgreSQL` providers:
//! - [`InMemoryAttendanceRepository`]: events, records, counter, waitlist
//! - [`InMemoryCommunityDirectory`]: communities, memberships, bans, join requests
//! - [`InMemorySupportDirectory`]: support subscriptions
//!
//! Each mutating call runs against a copy of the state under one mutex and
//! swaps it in only on success, so a failure part-way leaves nothing behind.
//! Faults can be injected to exercise rollback and retry paths.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on poisoned locks

use chrono::{DateTime, Utc};
use gathering_core::attendance::{TransitionOutcome, TransitionPlan, plan_transition};
use gathering_core::capacity::{CapacityChangeOutcome, EventUpdate, reconcile_capacity};
use gathering_core::error::{AttendanceError, ForbiddenReason, Result};
use gathering_core::providers::{
    AttendanceRepository, CommunityDirectory, EventRepository, SupportDirectory,
};
use gathering_core::query::{AttendeeQuery, Page};
use gathering_core::types::{
    AttendanceRecord, AttendanceStatus, AttendanceSummary, Community, CommunityId, Event, EventId,
    JoinRequest, JoinRequestId, JoinRequestStatus, Membership, MembershipRole, UserId,
};
use gathering_core::waitlist::{Promotion, next_in_line, waitlist_position};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

// ============================================================================
// Attendance
// ============================================================================

#[derive(Clone, Debug, Default)]
struct AttendanceState {
    events: HashMap<EventId, Event>,
    records: HashMap<(EventId, UserId), AttendanceRecord>,
    next_seq: i64,
}

impl AttendanceState {
    fn event(&self, event_id: EventId) -> Result<&Event> {
        self.events
            .get(&event_id)
            .ok_or_else(|| AttendanceError::event_not_found(event_id))
    }

    fn event_records(&self, event_id: EventId) -> impl Iterator<Item = &AttendanceRecord> + Clone {
        self.records.values().filter(move |r| r.event_id == event_id)
    }

    fn count(&self, event_id: EventId, status: AttendanceStatus) -> u32 {
        let n = self.event_records(event_id).filter(|r| r.status == status).count();
        u32::try_from(n).unwrap_or(u32::MAX)
    }

    fn position(&self, event_id: EventId, user_id: UserId) -> Option<u32> {
        waitlist_position(self.event_records(event_id), user_id)
    }

    /// Move the head of the waitlist to `attending`.
    fn promote_head(
        &mut self,
        event_id: EventId,
        now: DateTime<Utc>,
        faults: &Faults,
    ) -> Result<Option<Promotion>> {
        let Some(user_id) = next_in_line(self.event_records(event_id)).map(|r| r.user_id) else {
            return Ok(None);
        };

        if faults.take_promotion_failure() {
            return Err(AttendanceError::DatabaseError(
                "injected failure while promoting from waitlist".to_string(),
            ));
        }

        let event = self
            .events
            .get_mut(&event_id)
            .ok_or_else(|| AttendanceError::event_not_found(event_id))?;
        let plan = TransitionPlan {
            prior: Some(AttendanceStatus::Waitlisted),
            next: AttendanceStatus::Attending,
            counter_delta: 1,
            promote_next: false,
        };
        event.current_attendees = plan.apply_to_counter(event.capacity())?;

        let record = self
            .records
            .get_mut(&(event_id, user_id))
            .ok_or_else(|| AttendanceError::Internal("waitlist head vanished".to_string()))?;
        record.status = AttendanceStatus::Attending;
        record.updated_at = now;

        Ok(Some(Promotion {
            event_id,
            user_id,
            promoted_at: now,
        }))
    }
}

#[derive(Debug, Default)]
struct Faults {
    promotion_failures: Mutex<usize>,
    conflicts: Mutex<usize>,
}

impl Faults {
    fn take(counter: &Mutex<usize>) -> bool {
        let mut remaining = counter.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            true
        } else {
            false
        }
    }

    fn take_promotion_failure(&self) -> bool {
        Self::take(&self.promotion_failures)
    }

    fn take_conflict(&self) -> bool {
        Self::take(&self.conflicts)
    }
}

/// In-memory events and attendance records.
///
/// Implements both [`EventRepository`] and [`AttendanceRepository`]; clones
/// share state.
///
/// # Example
///
/// ```
/// use gathering_core::providers::AttendanceRepository;
/// use gathering_core::types::{AttendanceStatus, CommunityId, UserId};
/// use gathering_testing::{EventBuilder, InMemoryAttendanceRepository, test_clock};
/// use gathering_core::environment::Clock;
///
/// # async fn example() -> gathering_core::Result<()> {
/// let repo = InMemoryAttendanceRepository::new();
/// let event = EventBuilder::new(CommunityId::new()).max_attendees(1).build();
/// repo.insert_event(event.clone());
///
/// let now = test_clock().now();
/// let outcome = repo
///     .apply_transition(event.id, UserId::new(), AttendanceStatus::Attending, now)
///     .await?;
/// assert_eq!(outcome.event.current_attendees, 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryAttendanceRepository {
    state: Arc<Mutex<AttendanceState>>,
    faults: Arc<Faults>,
}

impl InMemoryAttendanceRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an event.
    pub fn insert_event(&self, event: Event) {
        self.state.lock().unwrap().events.insert(event.id, event);
    }

    /// Current copy of an event.
    #[must_use]
    pub fn event(&self, event_id: EventId) -> Option<Event> {
        self.state.lock().unwrap().events.get(&event_id).cloned()
    }

    /// All records of an event, in insertion order.
    #[must_use]
    pub fn records(&self, event_id: EventId) -> Vec<AttendanceRecord> {
        let state = self.state.lock().unwrap();
        let mut records: Vec<_> = state.event_records(event_id).cloned().collect();
        records.sort_by_key(|r| r.seq);
        records
    }

    /// Number of records with `status`.
    #[must_use]
    pub fn count(&self, event_id: EventId, status: AttendanceStatus) -> u32 {
        self.state.lock().unwrap().count(event_id, status)
    }

    /// Make the next `n` promotions fail inside their transaction.
    pub fn fail_next_promotions(&self, n: usize) {
        *self.faults.promotion_failures.lock().unwrap() = n;
    }

    /// Make the next `n` mutating calls abort with `Conflict` before doing anything.
    pub fn inject_conflicts(&self, n: usize) {
        *self.faults.conflicts.lock().unwrap() = n;
    }

    /// Run `f` against a working copy and commit it only on success.
    fn transaction<T>(
        &self,
        f: impl FnOnce(&mut AttendanceState, &Faults) -> Result<T>,
    ) -> Result<T> {
        if self.faults.take_conflict() {
            return Err(AttendanceError::Conflict(
                "could not serialize access due to concurrent update".to_string(),
            ));
        }

        let mut guard = self.state.lock().unwrap();
        let mut working = guard.clone();
        let value = f(&mut working, &self.faults)?;
        *guard = working;
        Ok(value)
    }

    fn read<T>(&self, f: impl FnOnce(&AttendanceState) -> Result<T>) -> Result<T> {
        f(&self.state.lock().unwrap())
    }
}

impl EventRepository for InMemoryAttendanceRepository {
    fn get_event(&self, event_id: EventId) -> impl Future<Output = Result<Event>> + Send {
        let result = self.read(|s| s.event(event_id).cloned());
        async move { result }
    }
}

impl AttendanceRepository for InMemoryAttendanceRepository {
    fn apply_transition(
        &self,
        event_id: EventId,
        user_id: UserId,
        target: AttendanceStatus,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<TransitionOutcome>> + Send {
        let result = self.transaction(|state, faults| {
            let capacity = state.event(event_id)?.capacity();
            let key = (event_id, user_id);
            let prior = state.records.get(&key).map(|r| r.status);

            let plan = plan_transition(capacity, prior, target);
            let counter = plan.apply_to_counter(capacity)?;

            if !plan.is_noop() {
                if let Some(record) = state.records.get_mut(&key) {
                    record.status = plan.next;
                    record.updated_at = now;
                } else {
                    state.next_seq += 1;
                    state.records.insert(
                        key,
                        AttendanceRecord {
                            event_id,
                            user_id,
                            status: plan.next,
                            attended: None,
                            seq: state.next_seq,
                            created_at: now,
                            updated_at: now,
                        },
                    );
                }
                if let Some(event) = state.events.get_mut(&event_id) {
                    event.current_attendees = counter;
                }
            }

            let promotion = if plan.promote_next {
                state.promote_head(event_id, now, faults)?
            } else {
                None
            };

            let record = state
                .records
                .get(&key)
                .cloned()
                .ok_or_else(|| {
                    AttendanceError::Internal("record missing after upsert".to_string())
                })?;
            let waitlist_position = state.position(event_id, user_id);

            Ok(TransitionOutcome {
                event: state.event(event_id)?.clone(),
                record,
                prior,
                waitlist_position,
                promotion,
            })
        });
        async move { result }
    }

    fn promote_next(
        &self,
        event_id: EventId,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<Promotion>>> + Send {
        let result = self.transaction(|state, faults| {
            if !state.event(event_id)?.capacity().has_free_slot() {
                return Ok(None);
            }
            state.promote_head(event_id, now, faults)
        });
        async move { result }
    }

    fn apply_event_update(
        &self,
        event_id: EventId,
        update: &EventUpdate,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<CapacityChangeOutcome>> + Send {
        let result = self.transaction(|state, faults| {
            let event = state.event(event_id)?.clone();
            let plan = reconcile_capacity(
                event.max_attendees,
                update.requested_capacity(&event),
                state.count(event_id, AttendanceStatus::Attending),
                state.count(event_id, AttendanceStatus::Waitlisted),
            )?;
            let merged = update.merge(&event, now)?;
            state.events.insert(event_id, merged);

            let mut promotions = Vec::new();
            for _ in 0..plan.promotions {
                match state.promote_head(event_id, now, faults)? {
                    Some(promotion) => promotions.push(promotion),
                    None => break,
                }
            }

            Ok(CapacityChangeOutcome {
                event: state.event(event_id)?.clone(),
                previous_max: event.max_attendees,
                promotions,
            })
        });
        async move { result }
    }

    fn get_record(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> impl Future<Output = Result<Option<AttendanceRecord>>> + Send {
        let result = self.read(|s| Ok(s.records.get(&(event_id, user_id)).cloned()));
        async move { result }
    }

    fn waitlist_position(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> impl Future<Output = Result<Option<u32>>> + Send {
        let result = self.read(|s| Ok(s.position(event_id, user_id)));
        async move { result }
    }

    fn list_attendees(
        &self,
        event_id: EventId,
        query: AttendeeQuery,
    ) -> impl Future<Output = Result<Page<AttendanceRecord>>> + Send {
        let result = self.read(|s| Ok(query.apply(s.event_records(event_id))));
        async move { result }
    }

    fn summary(&self, event_id: EventId) -> impl Future<Output = Result<AttendanceSummary>> + Send {
        let result = self.read(|s| {
            let event = s.event(event_id)?;
            Ok(AttendanceSummary {
                attending: s.count(event_id, AttendanceStatus::Attending),
                maybe: s.count(event_id, AttendanceStatus::Maybe),
                not_attending: s.count(event_id, AttendanceStatus::NotAttending),
                waitlisted: s.count(event_id, AttendanceStatus::Waitlisted),
                max_attendees: event.max_attendees,
                current_attendees: event.current_attendees,
            })
        });
        async move { result }
    }

    fn set_attended(
        &self,
        event_id: EventId,
        user_id: UserId,
        attended: Option<bool>,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<AttendanceRecord>> + Send {
        let result = self.transaction(|state, _| {
            let record = state
                .records
                .get_mut(&(event_id, user_id))
                .ok_or_else(|| AttendanceError::NotFound {
                    resource: "attendance record",
                    id: format!("{event_id}/{user_id}"),
                })?;
            record.attended = attended;
            record.updated_at = now;
            Ok(record.clone())
        });
        async move { result }
    }
}

// ============================================================================
// Communities
// ============================================================================

#[derive(Clone, Debug)]
struct Ban {
    community_id: CommunityId,
    user_id: UserId,
    expires_at: Option<DateTime<Utc>>,
}

impl Ban {
    fn is_active(&self, community_id: CommunityId, user_id: UserId, now: DateTime<Utc>) -> bool {
        self.community_id == community_id
            && self.user_id == user_id
            && self.expires_at.is_none_or(|expires_at| expires_at > now)
    }
}

#[derive(Clone, Debug, Default)]
struct CommunityState {
    communities: HashMap<CommunityId, Community>,
    memberships: HashMap<(CommunityId, UserId), Membership>,
    bans: Vec<Ban>,
    join_requests: Vec<JoinRequest>,
}

/// In-memory communities, memberships, bans, and join requests.
#[derive(Clone, Debug, Default)]
pub struct InMemoryCommunityDirectory {
    state: Arc<Mutex<CommunityState>>,
}

impl InMemoryCommunityDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a community.
    pub fn insert_community(&self, community: Community) {
        self.state
            .lock()
            .unwrap()
            .communities
            .insert(community.id, community);
    }

    /// Add a membership directly.
    pub fn add_member(
        &self,
        community_id: CommunityId,
        user_id: UserId,
        role: MembershipRole,
        joined_at: DateTime<Utc>,
    ) {
        self.state.lock().unwrap().memberships.insert(
            (community_id, user_id),
            Membership {
                community_id,
                user_id,
                role,
                joined_at,
            },
        );
    }

    /// Ban a user; `expires_at = None` is permanent.
    pub fn ban(
        &self,
        community_id: CommunityId,
        user_id: UserId,
        expires_at: Option<DateTime<Utc>>,
    ) {
        self.state.lock().unwrap().bans.push(Ban {
            community_id,
            user_id,
            expires_at,
        });
    }

    /// Whether a membership row exists.
    #[must_use]
    pub fn is_member(&self, community_id: CommunityId, user_id: UserId) -> bool {
        self.state
            .lock()
            .unwrap()
            .memberships
            .contains_key(&(community_id, user_id))
    }

    /// All join requests for a community.
    #[must_use]
    pub fn join_requests(&self, community_id: CommunityId) -> Vec<JoinRequest> {
        self.state
            .lock()
            .unwrap()
            .join_requests
            .iter()
            .filter(|r| r.community_id == community_id)
            .cloned()
            .collect()
    }
}

impl CommunityDirectory for InMemoryCommunityDirectory {
    fn get_community(
        &self,
        community_id: CommunityId,
    ) -> impl Future<Output = Result<Community>> + Send {
        let result = self
            .state
            .lock()
            .unwrap()
            .communities
            .get(&community_id)
            .cloned()
            .ok_or_else(|| AttendanceError::NotFound {
                resource: "community",
                id: community_id.to_string(),
            });
        async move { result }
    }

    fn get_membership(
        &self,
        community_id: CommunityId,
        user_id: UserId,
    ) -> impl Future<Output = Result<Option<Membership>>> + Send {
        let membership = self
            .state
            .lock()
            .unwrap()
            .memberships
            .get(&(community_id, user_id))
            .cloned();
        async move { Ok(membership) }
    }

    fn is_banned(
        &self,
        community_id: CommunityId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool>> + Send {
        let banned = self
            .state
            .lock()
            .unwrap()
            .bans
            .iter()
            .any(|b| b.is_active(community_id, user_id, now));
        async move { Ok(banned) }
    }

    fn join_public(
        &self,
        community_id: CommunityId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Membership>> + Send {
        let result = {
            let mut state = self.state.lock().unwrap();
            if state.bans.iter().any(|b| b.is_active(community_id, user_id, now)) {
                Err(AttendanceError::forbidden(ForbiddenReason::Banned))
            } else {
                Ok(state
                    .memberships
                    .entry((community_id, user_id))
                    .or_insert_with(|| Membership {
                        community_id,
                        user_id,
                        role: MembershipRole::Member,
                        joined_at: now,
                    })
                    .clone())
            }
        };
        async move { result }
    }

    fn request_to_join(
        &self,
        community_id: CommunityId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<JoinRequest>> + Send {
        let request = {
            let mut state = self.state.lock().unwrap();
            let pending = state.join_requests.iter().find(|r| {
                r.community_id == community_id
                    && r.user_id == user_id
                    && r.status == JoinRequestStatus::Pending
            });
            if let Some(existing) = pending {
                existing.clone()
            } else {
                let request = JoinRequest {
                    id: JoinRequestId::new(),
                    community_id,
                    user_id,
                    status: JoinRequestStatus::Pending,
                    created_at: now,
                };
                state.join_requests.push(request.clone());
                request
            }
        };
        async move { Ok(request) }
    }
}

// ============================================================================
// Support
// ============================================================================

/// In-memory support subscriptions.
#[derive(Clone, Debug, Default)]
pub struct InMemorySupportDirectory {
    subscriptions: Arc<Mutex<HashMap<(CommunityId, UserId), Option<DateTime<Utc>>>>>,
}

impl InMemorySupportDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a subscription; `expires_at = None` never lapses.
    pub fn add_supporter(
        &self,
        community_id: CommunityId,
        user_id: UserId,
        expires_at: Option<DateTime<Utc>>,
    ) {
        self.subscriptions
            .lock()
            .unwrap()
            .insert((community_id, user_id), expires_at);
    }
}

impl SupportDirectory for InMemorySupportDirectory {
    fn has_active_support(
        &self,
        community_id: CommunityId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool>> + Send {
        let active = self
            .subscriptions
            .lock()
            .unwrap()
            .get(&(community_id, user_id))
            .is_some_and(|expires_at| expires_at.is_none_or(|at| at > now));
        async move { Ok(active) }
    }
}
