//! Prometheus metrics for the attendance engine.
//!
//! # Exported Metrics
//!
//! - `gathering_rsvp_transitions_total{from,to}` - Committed RSVP status changes
//! - `gathering_waitlist_promotions_total{trigger}` - Users moved off the waitlist
//! - `gathering_capacity_changes_total{outcome}` - Capacity updates by outcome
//! - `gathering_notification_failures_total` - Dropped promotion notifications
//! - `gathering_conflict_retries_total` - Transactions rerun after a conflict
//!
//! # Example
//!
//! ```rust,no_run
//! use gathering_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//! let body = server.render();
//! # Ok(())
//! # }
//! ```

use gathering_core::{AttendanceStatus, PromotionTrigger};
use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus recorder plus the address its scrape endpoint is served on.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server for `addr`.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Address the scrape endpoint should listen on.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Register metric descriptions and install the global recorder.
    ///
    /// # Errors
    ///
    /// Returns error if a recorder cannot be installed. An already installed
    /// recorder is not an error; [`MetricsServer::render`] then returns `None`.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!(addr = %self.addr, "Metrics recorder installed");
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!(
                        "Metrics recorder already initialized, skipping re-initialization"
                    );
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus text format.
    ///
    /// Returns `None` if this server did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        "gathering_rsvp_transitions_total",
        "Committed RSVP status changes by previous and new status"
    );
    describe_counter!(
        "gathering_waitlist_promotions_total",
        "Users promoted from the waitlist by trigger (cancellation, capacity_increase, manual)"
    );
    describe_counter!(
        "gathering_capacity_changes_total",
        "Capacity updates by outcome (increased, decreased, unchanged, rejected)"
    );
    describe_counter!(
        "gathering_notification_failures_total",
        "Promotion notifications that failed or timed out and were dropped"
    );
    describe_counter!(
        "gathering_conflict_retries_total",
        "Attendance transactions rerun after a serialization failure or deadlock"
    );
}

/// Attendance metrics recorder.
pub struct AttendanceMetrics;

impl AttendanceMetrics {
    /// Record a committed status change.
    pub fn record_transition(from: Option<AttendanceStatus>, to: AttendanceStatus) {
        let from = from.map_or("none", |s| s.as_str());
        counter!("gathering_rsvp_transitions_total", "from" => from, "to" => to.as_str())
            .increment(1);
    }

    /// Record promotions.
    pub fn record_promotions(trigger: PromotionTrigger, count: usize) {
        if count == 0 {
            return;
        }
        counter!("gathering_waitlist_promotions_total", "trigger" => trigger.as_str())
            .increment(u64::try_from(count).unwrap_or(u64::MAX));
    }

    /// Record a capacity change outcome.
    pub fn record_capacity_change(outcome: &'static str) {
        counter!("gathering_capacity_changes_total", "outcome" => outcome).increment(1);
    }

    /// Record a dropped notification.
    pub fn record_notification_failure() {
        counter!("gathering_notification_failures_total").increment(1);
    }

    /// Record a conflict retry.
    pub fn record_conflict_retry() {
        counter!("gathering_conflict_retries_total").increment(1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_metrics_server_creation() {
        let addr = "127.0.0.1:0".parse().unwrap();
        let server = MetricsServer::new(addr);
        assert!(server.handle().is_none());
        assert_eq!(server.addr(), addr);
    }

    #[tokio::test]
    async fn test_attendance_metrics_render() {
        let mut server = MetricsServer::new("127.0.0.1:0".parse().unwrap());
        server.start().unwrap();

        AttendanceMetrics::record_transition(None, AttendanceStatus::Attending);
        AttendanceMetrics::record_promotions(PromotionTrigger::Cancellation, 1);
        AttendanceMetrics::record_capacity_change("rejected");

        // The recorder is global; another test may have installed it first.
        if let Some(rendered) = server.render() {
            assert!(rendered.contains("gathering_rsvp_transitions_total"));
            assert!(rendered.contains("gathering_waitlist_promotions_total"));
            assert!(rendered.contains("gathering_capacity_changes_total"));
        }
    }
}
