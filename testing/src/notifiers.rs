//! Notification dispatchers for tests.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on poisoned locks

use gathering_core::error::{AttendanceError, Result};
use gathering_core::providers::{NotificationDispatcher, WaitlistPromotionNotice};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(5);
const POLL_ATTEMPTS: usize = 200;

/// Records every notice it is asked to send.
#[derive(Clone, Debug, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<WaitlistPromotionNotice>>>,
}

impl RecordingNotifier {
    /// Create an empty notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notices sent so far, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<WaitlistPromotionNotice> {
        self.sent.lock().unwrap().clone()
    }

    /// Notices sent so far, after waiting up to a second for `count` of them.
    ///
    /// Delivery runs on a detached task, so tests poll instead of reading
    /// straight after the engine call returns.
    pub async fn wait_for(&self, count: usize) -> Vec<WaitlistPromotionNotice> {
        for _ in 0..POLL_ATTEMPTS {
            if self.sent.lock().unwrap().len() >= count {
                break;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        self.sent()
    }
}

impl NotificationDispatcher for RecordingNotifier {
    fn notify_waitlist_promotion(
        &self,
        notice: &WaitlistPromotionNotice,
    ) -> impl Future<Output = Result<()>> + Send {
        self.sent.lock().unwrap().push(notice.clone());
        async { Ok(()) }
    }
}

/// Fails every delivery and counts the attempts.
#[derive(Clone, Debug, Default)]
pub struct FailingNotifier {
    attempts: Arc<Mutex<usize>>,
}

impl FailingNotifier {
    /// Create a notifier that always fails.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of delivery attempts.
    #[must_use]
    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }

    /// Delivery attempts, after waiting up to a second for `count` of them.
    pub async fn wait_for_attempts(&self, count: usize) -> usize {
        for _ in 0..POLL_ATTEMPTS {
            if self.attempts() >= count {
                break;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        self.attempts()
    }
}

impl NotificationDispatcher for FailingNotifier {
    fn notify_waitlist_promotion(
        &self,
        _notice: &WaitlistPromotionNotice,
    ) -> impl Future<Output = Result<()>> + Send {
        *self.attempts.lock().unwrap() += 1;
        async {
            Err(AttendanceError::Internal(
                "notification service unavailable".to_string(),
            ))
        }
    }
}

/// Never completes; exercises the notification timeout.
#[derive(Clone, Copy, Debug, Default)]
pub struct HangingNotifier;

impl NotificationDispatcher for HangingNotifier {
    fn notify_waitlist_promotion(
        &self,
        _notice: &WaitlistPromotionNotice,
    ) -> impl Future<Output = Result<()>> + Send {
        std::future::pending()
    }
}
