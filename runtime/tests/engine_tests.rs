//! Engine tests over in-memory providers.
//!
//! Covers the RSVP scenarios end to end: capacity and waitlist, promotion on
//! cancellation and on capacity growth, rejected reductions, membership gating,
//! idempotence, rollback, conflict retries, and notification failures.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code

use chrono::Duration as ChronoDuration;
use gathering_core::providers::NotificationDispatcher;
use gathering_core::{
    AttendanceError, AttendanceResult, AttendanceStatus, AttendeeListParams, Clock, EventId,
    EventUpdate, ForbiddenReason, MembershipAction, UserId,
};
use gathering_testing::{EventBuilder, FailingNotifier, HangingNotifier, TestHarness};
use std::sync::Arc;
use std::time::Instant;

// ============================================================================
// Helpers
// ============================================================================

async fn rsvp<N: NotificationDispatcher + Clone>(
    harness: &TestHarness<N>,
    event_id: EventId,
    user: UserId,
    status: AttendanceStatus,
) -> AttendanceResult {
    harness
        .engine
        .set_attendance_status(event_id, user, status)
        .await
        .unwrap()
}

async fn assert_counter_consistent(harness: &TestHarness, event_id: EventId) {
    let summary = harness.engine.attendance_summary(event_id).await.unwrap();
    assert_eq!(summary.current_attendees, summary.attending);
    if let Some(max) = summary.max_attendees {
        assert!(summary.attending <= max);
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn full_event_waitlists_in_arrival_order() {
    let harness = TestHarness::new();
    let community = harness.public_community();
    let event = harness.event(&community, Some(2));
    let users: Vec<_> = (0..4).map(|_| harness.member(&community)).collect();

    for user in &users[..2] {
        let result = rsvp(&harness, event.id, *user, AttendanceStatus::Attending).await;
        assert_eq!(result.status, AttendanceStatus::Attending);
        assert!(result.message.is_none());
    }

    let third = rsvp(&harness, event.id, users[2], AttendanceStatus::Attending).await;
    assert_eq!(third.status, AttendanceStatus::Waitlisted);
    assert_eq!(third.waitlist_position, Some(1));
    assert!(third.message.unwrap().contains("#1"));

    let fourth = rsvp(&harness, event.id, users[3], AttendanceStatus::Attending).await;
    assert_eq!(fourth.waitlist_position, Some(2));

    assert_eq!(harness.attendance.event(event.id).unwrap().current_attendees, 2);
    assert_counter_consistent(&harness, event.id).await;
}

#[tokio::test]
async fn cancellation_promotes_head_and_compacts_positions() {
    let harness = TestHarness::new();
    let community = harness.public_community();
    let event = harness.event(&community, Some(2));
    let users: Vec<_> = (0..4).map(|_| harness.member(&community)).collect();
    for user in &users {
        rsvp(&harness, event.id, *user, AttendanceStatus::Attending).await;
    }

    let result = rsvp(&harness, event.id, users[0], AttendanceStatus::NotAttending).await;
    assert_eq!(result.status, AttendanceStatus::NotAttending);

    let promoted = harness.engine.get_attendance_status(event.id, users[2]).await.unwrap();
    assert_eq!(promoted.status, Some(AttendanceStatus::Attending));
    assert_eq!(promoted.waitlist_position, None);

    let remaining = harness.engine.get_attendance_status(event.id, users[3]).await.unwrap();
    assert_eq!(remaining.status, Some(AttendanceStatus::Waitlisted));
    assert_eq!(remaining.waitlist_position, Some(1));

    assert_eq!(harness.attendance.event(event.id).unwrap().current_attendees, 2);
    assert_counter_consistent(&harness, event.id).await;

    let sent = harness.notifier.wait_for(1).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, users[2]);
    assert_eq!(sent[0].event_title, event.title);
    assert_eq!(sent[0].community_name, community.name);
}

#[tokio::test]
async fn capacity_increase_promotes_in_fifo_order() {
    let harness = TestHarness::new();
    let community = harness.public_community();
    let event = harness.event(&community, Some(1));
    let users: Vec<_> = (0..4).map(|_| harness.member(&community)).collect();
    for user in &users {
        rsvp(&harness, event.id, *user, AttendanceStatus::Attending).await;
        harness.clock.advance(ChronoDuration::seconds(1));
    }

    let promotions = harness.engine.apply_capacity_change(event.id, Some(3)).await.unwrap();
    let promoted: Vec<_> = promotions.iter().map(|p| p.user_id).collect();
    assert_eq!(promoted, vec![users[1], users[2]]);

    let last = harness.engine.get_attendance_status(event.id, users[3]).await.unwrap();
    assert_eq!(last.waitlist_position, Some(1));

    let summary = harness.engine.attendance_summary(event.id).await.unwrap();
    assert_eq!((summary.attending, summary.waitlisted, summary.current_attendees), (3, 1, 3));
    assert_eq!(harness.notifier.wait_for(2).await.len(), 2);
}

#[tokio::test]
async fn capacity_reduction_below_attendance_changes_nothing() {
    let harness = TestHarness::new();
    let community = harness.public_community();
    let event = harness.event(&community, Some(5));
    for _ in 0..3 {
        let user = harness.member(&community);
        rsvp(&harness, event.id, user, AttendanceStatus::Attending).await;
    }
    let before = harness.attendance.event(event.id).unwrap();

    let update = EventUpdate {
        title: Some("Renamed".to_string()),
        max_attendees: Some(Some(2)),
        ..EventUpdate::default()
    };
    let err = harness.engine.update_event(event.id, update).await.unwrap_err();

    assert_eq!(
        err,
        AttendanceError::forbidden(ForbiddenReason::CapacityBelowAttendance {
            requested: 2,
            attending: 3
        })
    );
    assert_eq!(harness.attendance.event(event.id).unwrap(), before);
}

#[tokio::test]
async fn private_community_blocks_rsvp_with_join_request() {
    let harness = TestHarness::new();
    let community = harness.private_community();
    let event = harness.event(&community, Some(10));
    let outsider = UserId::new();

    let err = harness
        .engine
        .set_attendance_status(event.id, outsider, AttendanceStatus::Attending)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AttendanceError::Forbidden {
            reason: ForbiddenReason::JoinRequestPending { .. }
        }
    ));
    assert!(harness.attendance.records(event.id).is_empty());
    assert_eq!(harness.communities.join_requests(community.id).len(), 1);

    // Retrying reuses the pending request.
    let _ = harness
        .engine
        .set_attendance_status(event.id, outsider, AttendanceStatus::Attending)
        .await;
    assert_eq!(harness.communities.join_requests(community.id).len(), 1);
}

// ============================================================================
// Eligibility
// ============================================================================

#[tokio::test]
async fn public_community_auto_joins_on_first_rsvp() {
    let harness = TestHarness::new();
    let community = harness.public_community();
    let event = harness.event(&community, None);
    let newcomer = UserId::new();

    let result = rsvp(&harness, event.id, newcomer, AttendanceStatus::Attending).await;
    assert_eq!(result.status, AttendanceStatus::Attending);
    assert!(harness.communities.is_member(community.id, newcomer));

    let decision = harness
        .engine
        .resolve_membership_for_attendance(community.id, newcomer)
        .await
        .unwrap();
    assert_eq!(decision.action_taken(), MembershipAction::None);
}

#[tokio::test]
async fn banned_member_is_refused() {
    let harness = TestHarness::new();
    let community = harness.public_community();
    let event = harness.event(&community, None);
    let user = harness.member(&community);
    harness.communities.ban(community.id, user, None);

    let err = harness
        .engine
        .set_attendance_status(event.id, user, AttendanceStatus::Attending)
        .await
        .unwrap_err();
    assert_eq!(err, AttendanceError::forbidden(ForbiddenReason::Banned));
    assert!(harness.attendance.records(event.id).is_empty());
}

#[tokio::test]
async fn expired_ban_does_not_block() {
    let harness = TestHarness::new();
    let community = harness.public_community();
    let event = harness.event(&community, None);
    let user = UserId::new();
    harness
        .communities
        .ban(community.id, user, Some(harness.clock.now() - ChronoDuration::hours(1)));

    let result = rsvp(&harness, event.id, user, AttendanceStatus::Maybe).await;
    assert_eq!(result.status, AttendanceStatus::Maybe);
}

#[tokio::test]
async fn supporters_only_requires_active_support() {
    let harness = TestHarness::new();
    let community = harness.public_community();
    let event = harness.insert_event(EventBuilder::new(community.id).supporters_only().build());
    let user = harness.member(&community);

    let err = harness
        .engine
        .set_attendance_status(event.id, user, AttendanceStatus::Attending)
        .await
        .unwrap_err();
    assert_eq!(err, AttendanceError::forbidden(ForbiddenReason::SupportersOnly));

    harness.support.add_supporter(community.id, user, None);
    let result = rsvp(&harness, event.id, user, AttendanceStatus::Attending).await;
    assert_eq!(result.status, AttendanceStatus::Attending);
}

#[tokio::test]
async fn supporters_only_refusal_leaves_membership_untouched() {
    let harness = TestHarness::new();
    let public = harness.public_community();
    let private = harness.private_community();

    for community in [&public, &private] {
        let event =
            harness.insert_event(EventBuilder::new(community.id).supporters_only().build());
        let outsider = UserId::new();

        let err = harness
            .engine
            .set_attendance_status(event.id, outsider, AttendanceStatus::Attending)
            .await
            .unwrap_err();
        assert_eq!(err, AttendanceError::forbidden(ForbiddenReason::SupportersOnly));
        assert!(!harness.communities.is_member(community.id, outsider));
        assert!(harness.communities.join_requests(community.id).is_empty());
        assert!(harness.attendance.records(event.id).is_empty());
    }
}

#[tokio::test]
async fn ended_event_is_refused() {
    let harness = TestHarness::new();
    let community = harness.public_community();
    let event = harness.insert_event(EventBuilder::new(community.id).already_ended().build());
    let user = harness.member(&community);

    let err = harness
        .engine
        .set_attendance_status(event.id, user, AttendanceStatus::Attending)
        .await
        .unwrap_err();
    assert_eq!(err, AttendanceError::forbidden(ForbiddenReason::EventEnded));
}

#[tokio::test]
async fn unknown_event_is_not_found() {
    let harness = TestHarness::new();
    let err = harness
        .engine
        .set_attendance_status(EventId::new(), UserId::new(), AttendanceStatus::Attending)
        .await
        .unwrap_err();
    assert!(matches!(err, AttendanceError::NotFound { resource: "event", .. }));
}

// ============================================================================
// Idempotence & Re-RSVP
// ============================================================================

#[tokio::test]
async fn repeating_current_status_is_a_noop() {
    let harness = TestHarness::new();
    let community = harness.public_community();
    let event = harness.event(&community, Some(1));
    let (attendee, waiter) = (harness.member(&community), harness.member(&community));

    let first = rsvp(&harness, event.id, attendee, AttendanceStatus::Attending).await;
    let second = rsvp(&harness, event.id, attendee, AttendanceStatus::Attending).await;
    assert_eq!(first, second);
    assert_eq!(harness.attendance.event(event.id).unwrap().current_attendees, 1);

    let queued = rsvp(&harness, event.id, waiter, AttendanceStatus::Attending).await;
    let reconfirmed = rsvp(&harness, event.id, waiter, AttendanceStatus::Waitlisted).await;
    assert_eq!(queued, reconfirmed);
    assert_eq!(reconfirmed.waitlist_position, Some(1));
}

#[tokio::test]
async fn re_rsvp_keeps_original_queue_position() {
    let harness = TestHarness::new();
    let community = harness.public_community();
    let event = harness.event(&community, Some(1));
    let users: Vec<_> = (0..3).map(|_| harness.member(&community)).collect();

    rsvp(&harness, event.id, users[0], AttendanceStatus::Attending).await;
    rsvp(&harness, event.id, users[1], AttendanceStatus::Maybe).await;
    harness.clock.advance(ChronoDuration::minutes(5));
    rsvp(&harness, event.id, users[2], AttendanceStatus::Attending).await;
    harness.clock.advance(ChronoDuration::minutes(5));

    // users[1] first RSVP'd before users[2], so joins the waitlist ahead of them.
    let result = rsvp(&harness, event.id, users[1], AttendanceStatus::Attending).await;
    assert_eq!(result.status, AttendanceStatus::Waitlisted);
    assert_eq!(result.waitlist_position, Some(1));

    let later = harness.engine.get_attendance_status(event.id, users[2]).await.unwrap();
    assert_eq!(later.waitlist_position, Some(2));
}

#[tokio::test]
async fn leaving_waitlist_needs_no_promotion() {
    let harness = TestHarness::new();
    let community = harness.public_community();
    let event = harness.event(&community, Some(1));
    let users: Vec<_> = (0..3).map(|_| harness.member(&community)).collect();
    for user in &users {
        rsvp(&harness, event.id, *user, AttendanceStatus::Attending).await;
    }

    rsvp(&harness, event.id, users[1], AttendanceStatus::NotAttending).await;

    let last = harness.engine.get_attendance_status(event.id, users[2]).await.unwrap();
    assert_eq!(last.waitlist_position, Some(1));
    assert!(harness.notifier.sent().is_empty());
    assert_eq!(harness.attendance.event(event.id).unwrap().current_attendees, 1);
}

// ============================================================================
// Atomicity & Concurrency
// ============================================================================

#[tokio::test]
async fn failed_promotion_rolls_back_the_cancellation() {
    let harness = TestHarness::new();
    let community = harness.public_community();
    let event = harness.event(&community, Some(1));
    let (leaver, waiter) = (harness.member(&community), harness.member(&community));
    rsvp(&harness, event.id, leaver, AttendanceStatus::Attending).await;
    rsvp(&harness, event.id, waiter, AttendanceStatus::Attending).await;

    harness.attendance.fail_next_promotions(1);
    let err = harness
        .engine
        .set_attendance_status(event.id, leaver, AttendanceStatus::NotAttending)
        .await
        .unwrap_err();
    assert!(matches!(err, AttendanceError::DatabaseError(_)));

    let leaver_view = harness.engine.get_attendance_status(event.id, leaver).await.unwrap();
    assert_eq!(leaver_view.status, Some(AttendanceStatus::Attending));
    let waiter_view = harness.engine.get_attendance_status(event.id, waiter).await.unwrap();
    assert_eq!(waiter_view.status, Some(AttendanceStatus::Waitlisted));
    assert_counter_consistent(&harness, event.id).await;
    assert!(harness.notifier.sent().is_empty());
}

#[tokio::test]
async fn conflicts_are_retried() {
    let harness = TestHarness::new();
    let community = harness.public_community();
    let event = harness.event(&community, Some(3));
    let user = harness.member(&community);

    harness.attendance.inject_conflicts(2);
    let result = rsvp(&harness, event.id, user, AttendanceStatus::Attending).await;
    assert_eq!(result.status, AttendanceStatus::Attending);
}

#[tokio::test]
async fn exhausted_conflicts_surface_as_conflict() {
    let harness = TestHarness::new();
    let community = harness.public_community();
    let event = harness.event(&community, Some(3));
    let user = harness.member(&community);

    harness.attendance.inject_conflicts(10);
    let err = harness
        .engine
        .set_attendance_status(event.id, user, AttendanceStatus::Attending)
        .await
        .unwrap_err();
    assert!(matches!(err, AttendanceError::Conflict(_)));
    assert!(harness.attendance.records(event.id).is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_for_the_last_slot_admits_exactly_one() {
    let harness = Arc::new(TestHarness::new());
    let community = harness.public_community();
    let event = harness.event(&community, Some(1));
    let users: Vec<_> = (0..16).map(|_| harness.member(&community)).collect();

    let tasks: Vec<_> = users
        .iter()
        .map(|user| {
            let harness = Arc::clone(&harness);
            let user = *user;
            tokio::spawn(async move {
                harness
                    .engine
                    .set_attendance_status(event.id, user, AttendanceStatus::Attending)
                    .await
                    .unwrap()
                    .status
            })
        })
        .collect();

    let mut attending = 0;
    for task in tasks {
        if task.await.unwrap() == AttendanceStatus::Attending {
            attending += 1;
        }
    }

    assert_eq!(attending, 1);
    let summary = harness.engine.attendance_summary(event.id).await.unwrap();
    assert_eq!((summary.attending, summary.waitlisted, summary.current_attendees), (1, 15, 1));
}

// ============================================================================
// Notifications
// ============================================================================

#[tokio::test]
async fn failed_notification_does_not_undo_promotion() {
    let harness = TestHarness::with_notifier(FailingNotifier::new());
    let community = harness.public_community();
    let event = harness.event(&community, Some(1));
    let (leaver, waiter) = (harness.member(&community), harness.member(&community));
    rsvp(&harness, event.id, leaver, AttendanceStatus::Attending).await;
    rsvp(&harness, event.id, waiter, AttendanceStatus::Attending).await;

    let result = rsvp(&harness, event.id, leaver, AttendanceStatus::Maybe).await;
    assert_eq!(result.status, AttendanceStatus::Maybe);
    assert_eq!(harness.notifier.wait_for_attempts(1).await, 1);

    let view = harness.engine.get_attendance_status(event.id, waiter).await.unwrap();
    assert_eq!(view.status, Some(AttendanceStatus::Attending));
}

#[tokio::test]
async fn hanging_notification_times_out() {
    let harness = TestHarness::with_notifier(HangingNotifier);
    let community = harness.public_community();
    let event = harness.event(&community, Some(1));
    let (leaver, waiter) = (harness.member(&community), harness.member(&community));
    rsvp(&harness, event.id, leaver, AttendanceStatus::Attending).await;
    rsvp(&harness, event.id, waiter, AttendanceStatus::Attending).await;

    let result = rsvp(&harness, event.id, leaver, AttendanceStatus::NotAttending).await;
    assert_eq!(result.status, AttendanceStatus::NotAttending);

    let view = harness.engine.get_attendance_status(event.id, waiter).await.unwrap();
    assert_eq!(view.status, Some(AttendanceStatus::Attending));
}

#[tokio::test]
async fn slow_notifier_does_not_hold_the_caller() {
    let harness = TestHarness::with_notifier(HangingNotifier);
    let community = harness.public_community();
    let event = harness.event(&community, Some(1));
    for _ in 0..6 {
        let user = harness.member(&community);
        rsvp(&harness, event.id, user, AttendanceStatus::Attending).await;
    }

    let started = Instant::now();
    let promotions = harness.engine.apply_capacity_change(event.id, None).await.unwrap();
    let waited = started.elapsed();

    assert_eq!(promotions.len(), 5);
    assert!(
        waited < harness.engine.config().notification_timeout,
        "caller waited {waited:?} on notification delivery"
    );
}

// ============================================================================
// Organizer Operations & Queries
// ============================================================================

#[tokio::test]
async fn manual_promotion_fills_only_free_slots() {
    let harness = TestHarness::new();
    let community = harness.public_community();
    let event = harness.event(&community, Some(1));
    let (first, second) = (harness.member(&community), harness.member(&community));
    rsvp(&harness, event.id, first, AttendanceStatus::Attending).await;
    rsvp(&harness, event.id, second, AttendanceStatus::Attending).await;

    assert!(harness.engine.promote_next(event.id).await.unwrap().is_none());

    // Raising the limit through a direct store write leaves a free slot for the tool.
    let mut raised = harness.attendance.event(event.id).unwrap();
    raised.max_attendees = Some(2);
    harness.attendance.insert_event(raised);

    let promotion = harness.engine.promote_next(event.id).await.unwrap().unwrap();
    assert_eq!(promotion.user_id, second);
    assert_eq!(harness.notifier.wait_for(1).await.len(), 1);
}

#[tokio::test]
async fn switching_to_unlimited_promotes_everyone() {
    let harness = TestHarness::new();
    let community = harness.public_community();
    let event = harness.event(&community, Some(1));
    for _ in 0..4 {
        let user = harness.member(&community);
        rsvp(&harness, event.id, user, AttendanceStatus::Attending).await;
    }

    let promotions = harness.engine.apply_capacity_change(event.id, None).await.unwrap();
    assert_eq!(promotions.len(), 3);
    let summary = harness.engine.attendance_summary(event.id).await.unwrap();
    assert_eq!((summary.attending, summary.waitlisted, summary.max_attendees), (4, 0, None));
}

#[tokio::test]
async fn attendee_listing_orders_by_status_priority() {
    let harness = TestHarness::new();
    let community = harness.public_community();
    let event = harness.event(&community, Some(1));
    let statuses = [
        AttendanceStatus::NotAttending,
        AttendanceStatus::Attending,
        AttendanceStatus::Attending,
        AttendanceStatus::Maybe,
    ];
    for status in statuses {
        let user = harness.member(&community);
        rsvp(&harness, event.id, user, status).await;
        harness.clock.advance(ChronoDuration::seconds(1));
    }

    let page = harness
        .engine
        .get_event_attendees(event.id, AttendeeListParams::default())
        .await
        .unwrap();
    let listed: Vec<_> = page.items.iter().map(|r| r.status).collect();
    assert_eq!(
        listed,
        vec![
            AttendanceStatus::Attending,
            AttendanceStatus::Maybe,
            AttendanceStatus::Waitlisted,
            AttendanceStatus::NotAttending,
        ]
    );
    assert_eq!(page.total, 4);

    let err = harness
        .engine
        .get_event_attendees(
            event.id,
            AttendeeListParams {
                page: Some(0),
                ..AttendeeListParams::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AttendanceError::InvalidArgument(_)));
}

#[tokio::test]
async fn status_lookup_without_record_is_none() {
    let harness = TestHarness::new();
    let community = harness.public_community();
    let event = harness.event(&community, None);

    let view = harness.engine.get_attendance_status(event.id, UserId::new()).await.unwrap();
    assert_eq!(view.status, None);
    assert_eq!(view.waitlist_position, None);
}

#[tokio::test]
async fn marking_attendance_leaves_status_alone() {
    let harness = TestHarness::new();
    let community = harness.public_community();
    let event = harness.event(&community, None);
    let user = harness.member(&community);
    rsvp(&harness, event.id, user, AttendanceStatus::Attending).await;

    let record = harness.engine.mark_attended(event.id, user, Some(true)).await.unwrap();
    assert_eq!(record.attended, Some(true));
    assert_eq!(record.status, AttendanceStatus::Attending);

    let err = harness
        .engine
        .mark_attended(event.id, UserId::new(), Some(false))
        .await
        .unwrap_err();
    assert!(matches!(err, AttendanceError::NotFound { .. }));
}
