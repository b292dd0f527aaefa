//! Read-side query types: single-user status and paginated attendee listing.

use crate::error::{AttendanceError, Result};
use crate::types::{AttendanceRecord, AttendanceStatus, EventId, UserId};
use crate::waitlist::fifo_order;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Default page size for attendee listings.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Maximum page size for attendee listings.
pub const MAX_PAGE_SIZE: u32 = 100;

/// A user's attendance as seen by `get_attendance_status`.
///
/// `status` is `None` when the user never RSVP'd.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AttendanceStatusView {
    /// Event
    pub event_id: EventId,
    /// User
    pub user_id: UserId,
    /// Current status, if any record exists
    pub status: Option<AttendanceStatus>,
    /// 1-based waitlist position when waitlisted
    pub waitlist_position: Option<u32>,
    /// Real-world attendance flag
    pub attended: Option<bool>,
}

impl AttendanceStatusView {
    /// View for a user without a record.
    #[must_use]
    pub const fn none(event_id: EventId, user_id: UserId) -> Self {
        Self {
            event_id,
            user_id,
            status: None,
            waitlist_position: None,
            attended: None,
        }
    }
}

/// Raw listing parameters as received from a caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct AttendeeListParams {
    /// 1-based page number
    pub page: Option<u32>,
    /// Page size
    pub limit: Option<u32>,
    /// Only records with this status
    pub status: Option<AttendanceStatus>,
}

/// Page size bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageLimits {
    /// Used when the caller gives no limit
    pub default_limit: u32,
    /// Upper bound on any limit
    pub max_limit: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_PAGE_SIZE,
            max_limit: MAX_PAGE_SIZE,
        }
    }
}

/// Validated attendee listing query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttendeeQuery {
    /// 1-based page number
    pub page: u32,
    /// Page size
    pub limit: u32,
    /// Only records with this status
    pub status: Option<AttendanceStatus>,
}

impl AttendeeQuery {
    /// Validate raw parameters.
    ///
    /// Limits above the maximum are clamped.
    ///
    /// # Errors
    ///
    /// Returns [`AttendanceError::InvalidArgument`] if `page` or `limit` is zero.
    pub fn from_params(params: AttendeeListParams, limits: PageLimits) -> Result<Self> {
        let page = params.page.unwrap_or(1);
        if page < 1 {
            return Err(AttendanceError::InvalidArgument(
                "page must be at least 1".to_string(),
            ));
        }

        let limit = params.limit.unwrap_or(limits.default_limit);
        if limit < 1 {
            return Err(AttendanceError::InvalidArgument(
                "limit must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            page,
            limit: limit.min(limits.max_limit),
            status: params.status,
        })
    }

    /// Number of rows to skip.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    /// Apply filter, ordering and pagination to an in-memory record set.
    #[must_use]
    pub fn apply<'a, I>(&self, records: I) -> Page<AttendanceRecord>
    where
        I: IntoIterator<Item = &'a AttendanceRecord>,
    {
        let mut matching: Vec<&AttendanceRecord> = records
            .into_iter()
            .filter(|r| self.status.is_none_or(|s| r.status == s))
            .collect();
        matching.sort_by(|a, b| listing_order(a, b));

        let total = matching.len() as u64;
        let skip = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        let items = matching
            .into_iter()
            .skip(skip)
            .take(self.limit as usize)
            .cloned()
            .collect();

        Page {
            items,
            page: self.page,
            limit: self.limit,
            total,
        }
    }
}

/// Listing order: status priority, then `created_at`, then insertion sequence.
#[must_use]
pub fn listing_order(a: &AttendanceRecord, b: &AttendanceRecord) -> Ordering {
    a.status
        .listing_priority()
        .cmp(&b.status.listing_priority())
        .then_with(|| fifo_order(a, b))
}

/// One page of results.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// 1-based page number
    pub page: u32,
    /// Page size
    pub limit: u32,
    /// Total matching items across all pages
    pub total: u64,
}

impl<T> Page<T> {
    /// Map the items, keeping paging metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            limit: self.limit,
            total: self.total,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};

    fn record(seq: i64, status: AttendanceStatus) -> AttendanceRecord {
        let base = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        AttendanceRecord {
            event_id: EventId::new(),
            user_id: UserId::new(),
            status,
            attended: None,
            seq,
            created_at: base + Duration::seconds(seq),
            updated_at: base,
        }
    }

    #[test]
    fn defaults_and_clamping() {
        let q = AttendeeQuery::from_params(AttendeeListParams::default(), PageLimits::default())
            .unwrap();
        assert_eq!((q.page, q.limit), (1, DEFAULT_PAGE_SIZE));

        let q = AttendeeQuery::from_params(
            AttendeeListParams { limit: Some(500), ..AttendeeListParams::default() },
            PageLimits::default(),
        )
        .unwrap();
        assert_eq!(q.limit, MAX_PAGE_SIZE);
    }

    #[test]
    fn zero_page_or_limit_is_invalid() {
        let zero_page = AttendeeListParams { page: Some(0), ..AttendeeListParams::default() };
        assert!(AttendeeQuery::from_params(zero_page, PageLimits::default()).is_err());

        let zero_limit = AttendeeListParams { limit: Some(0), ..AttendeeListParams::default() };
        assert!(AttendeeQuery::from_params(zero_limit, PageLimits::default()).is_err());
    }

    #[test]
    fn listing_groups_by_status_priority() {
        let records = vec![
            record(1, AttendanceStatus::NotAttending),
            record(2, AttendanceStatus::Waitlisted),
            record(3, AttendanceStatus::Attending),
            record(4, AttendanceStatus::Maybe),
            record(5, AttendanceStatus::Attending),
        ];
        let query = AttendeeQuery { page: 1, limit: 10, status: None };
        let seqs: Vec<_> = query.apply(&records).items.iter().map(|r| r.seq).collect();
        assert_eq!(seqs, vec![3, 5, 4, 2, 1]);
    }

    #[test]
    fn pagination_reports_total_for_filter() {
        let records: Vec<_> = (1..=7).map(|i| record(i, AttendanceStatus::Attending)).collect();
        let query = AttendeeQuery { page: 2, limit: 3, status: Some(AttendanceStatus::Attending) };
        let page = query.apply(&records);
        assert_eq!(page.total, 7);
        assert_eq!(page.items.iter().map(|r| r.seq).collect::<Vec<_>>(), vec![4, 5, 6]);

        let query = AttendeeQuery { page: 4, limit: 3, status: None };
        assert!(query.apply(&records).items.is_empty());
    }
}
