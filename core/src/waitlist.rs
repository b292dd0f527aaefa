//! Waitlist ordering and promotion rules.
//!
//! Positions are never stored. The waitlist is the set of `waitlisted` records of
//! an event ordered by `(created_at, seq)`, and a position is the 1-based rank in
//! that order. Removing or promoting a record compacts everyone behind it.

use crate::types::{AttendanceRecord, AttendanceStatus, EventId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// What triggered a promotion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionTrigger {
    /// An attendee left and freed a slot
    Cancellation,
    /// The event's capacity grew
    CapacityIncrease,
    /// Explicit `promote_next` call
    Manual,
}

impl PromotionTrigger {
    /// Metric label value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cancellation => "cancellation",
            Self::CapacityIncrease => "capacity_increase",
            Self::Manual => "manual",
        }
    }
}

/// A waitlisted user moved to `attending`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promotion {
    /// Event
    pub event_id: EventId,
    /// Promoted user
    pub user_id: UserId,
    /// Commit time of the promotion
    pub promoted_at: DateTime<Utc>,
}

/// FIFO order of two records: earlier `created_at` first, insertion sequence breaks ties.
#[must_use]
pub fn fifo_order(a: &AttendanceRecord, b: &AttendanceRecord) -> Ordering {
    a.created_at.cmp(&b.created_at).then(a.seq.cmp(&b.seq))
}

/// `true` if `a` is ahead of `b` in the waitlist.
#[must_use]
pub fn is_ahead_of(a: &AttendanceRecord, b: &AttendanceRecord) -> bool {
    fifo_order(a, b) == Ordering::Less
}

/// Derived 1-based position of `user_id` among the event's waitlisted records.
///
/// Returns `None` if the user is not waitlisted.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, Utc};
/// use gathering_core::types::{AttendanceRecord, AttendanceStatus, EventId, UserId};
/// use gathering_core::waitlist::waitlist_position;
///
/// let event_id = EventId::new();
/// let now = Utc::now();
/// let record = |seq: i64, status| AttendanceRecord {
///     event_id,
///     user_id: UserId::new(),
///     status,
///     attended: None,
///     seq,
///     created_at: now + Duration::seconds(seq),
///     updated_at: now,
/// };
/// let records = vec![
///     record(1, AttendanceStatus::Waitlisted),
///     record(2, AttendanceStatus::Attending),
///     record(3, AttendanceStatus::Waitlisted),
/// ];
///
/// assert_eq!(waitlist_position(&records, records[2].user_id), Some(2));
/// assert_eq!(waitlist_position(&records, records[1].user_id), None);
/// ```
#[must_use]
pub fn waitlist_position<'a, I>(records: I, user_id: UserId) -> Option<u32>
where
    I: IntoIterator<Item = &'a AttendanceRecord>,
    I::IntoIter: Clone,
{
    let records = records.into_iter();
    let target = records
        .clone()
        .find(|r| r.user_id == user_id && r.status == AttendanceStatus::Waitlisted)?;

    let ahead = records
        .filter(|r| r.status == AttendanceStatus::Waitlisted && is_ahead_of(r, target))
        .count();

    u32::try_from(ahead).ok().map(|n| n.saturating_add(1))
}

/// The first `n` waitlisted records in FIFO order.
#[must_use]
pub fn first_in_line<'a, I>(records: I, n: usize) -> Vec<&'a AttendanceRecord>
where
    I: IntoIterator<Item = &'a AttendanceRecord>,
{
    let mut waitlisted: Vec<_> = records
        .into_iter()
        .filter(|r| r.status == AttendanceStatus::Waitlisted)
        .collect();
    waitlisted.sort_by(|a, b| fifo_order(a, b));
    waitlisted.truncate(n);
    waitlisted
}

/// The head of the waitlist.
#[must_use]
pub fn next_in_line<'a, I>(records: I) -> Option<&'a AttendanceRecord>
where
    I: IntoIterator<Item = &'a AttendanceRecord>,
{
    records
        .into_iter()
        .filter(|r| r.status == AttendanceStatus::Waitlisted)
        .min_by(|a, b| fifo_order(a, b))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn record(
        event_id: EventId,
        seq: i64,
        offset_secs: i64,
        status: AttendanceStatus,
    ) -> AttendanceRecord {
        let base = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        AttendanceRecord {
            event_id,
            user_id: UserId::new(),
            status,
            attended: None,
            seq,
            created_at: base + Duration::seconds(offset_secs),
            updated_at: base,
        }
    }

    #[test]
    fn ties_on_created_at_fall_back_to_sequence() {
        let event_id = EventId::new();
        let first = record(event_id, 7, 0, AttendanceStatus::Waitlisted);
        let second = record(event_id, 9, 0, AttendanceStatus::Waitlisted);
        let records = [second.clone(), first.clone()];

        assert_eq!(next_in_line(&records).unwrap().user_id, first.user_id);
        assert_eq!(waitlist_position(&records, second.user_id), Some(2));
    }

    #[test]
    fn positions_compact_after_head_leaves() {
        let event_id = EventId::new();
        let mut records = vec![
            record(event_id, 1, 0, AttendanceStatus::Waitlisted),
            record(event_id, 2, 1, AttendanceStatus::Waitlisted),
            record(event_id, 3, 2, AttendanceStatus::Waitlisted),
        ];
        let last = records[2].user_id;
        assert_eq!(waitlist_position(&records, last), Some(3));

        records[0].status = AttendanceStatus::Attending;
        assert_eq!(waitlist_position(&records, last), Some(2));
    }

    #[test]
    fn first_in_line_skips_other_statuses() {
        let event_id = EventId::new();
        let records = vec![
            record(event_id, 1, 0, AttendanceStatus::Attending),
            record(event_id, 2, 1, AttendanceStatus::Waitlisted),
            record(event_id, 3, 2, AttendanceStatus::Maybe),
            record(event_id, 4, 3, AttendanceStatus::Waitlisted),
        ];
        let picked: Vec<_> = first_in_line(&records, 5).iter().map(|r| r.seq).collect();
        assert_eq!(picked, vec![2, 4]);
    }

    #[test]
    fn empty_waitlist_has_no_head() {
        let records: Vec<AttendanceRecord> = Vec::new();
        assert!(next_in_line(&records).is_none());
    }

    proptest! {
        #[test]
        fn positions_are_dense_and_follow_fifo(
            offsets in proptest::collection::vec(0i64..20, 1..30)
        ) {
            let event_id = EventId::new();
            let records: Vec<_> = offsets
                .iter()
                .enumerate()
                .map(|(i, off)| {
                    let seq = i64::try_from(i).unwrap();
                    record(event_id, seq, *off, AttendanceStatus::Waitlisted)
                })
                .collect();

            let mut positions: Vec<(u32, &AttendanceRecord)> = records
                .iter()
                .map(|r| (waitlist_position(&records, r.user_id).unwrap(), r))
                .collect();
            positions.sort_by_key(|(p, _)| *p);

            for (expected, (position, _)) in positions.iter().enumerate() {
                prop_assert_eq!(*position as usize, expected + 1);
            }
            for pair in positions.windows(2) {
                prop_assert_eq!(fifo_order(pair[0].1, pair[1].1), Ordering::Less);
            }
        }
    }
}
