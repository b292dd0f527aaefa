//! Engine configuration.

use crate::retry::RetryPolicy;
use gathering_core::PageLimits;
use std::time::Duration;

/// Tuning knobs for [`AttendanceEngine`](crate::AttendanceEngine).
///
/// # Default Values
///
/// - `retry`: [`RetryPolicy::default`] (3 retries, 50ms..1s)
/// - `notification_timeout`: 2 seconds
/// - `page_limits`: 20 per page, at most 100
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Backoff for transactions aborted by a concurrent writer
    pub retry: RetryPolicy,
    /// Upper bound on a single post-commit notification
    pub notification_timeout: Duration,
    /// Attendee listing page sizes
    pub page_limits: PageLimits,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            notification_timeout: Duration::from_secs(2),
            page_limits: PageLimits::default(),
        }
    }
}

impl EngineConfig {
    /// Create a new config builder.
    #[must_use]
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug, Clone)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Set the conflict retry policy.
    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    /// Set the notification timeout.
    #[must_use]
    pub const fn notification_timeout(mut self, timeout: Duration) -> Self {
        self.config.notification_timeout = timeout;
        self
    }

    /// Set the default page size for attendee listings.
    #[must_use]
    pub const fn default_page_size(mut self, size: u32) -> Self {
        self.config.page_limits.default_limit = size;
        self
    }

    /// Set the maximum page size for attendee listings.
    #[must_use]
    pub const fn max_page_size(mut self, size: u32) -> Self {
        self.config.page_limits.max_limit = size;
        self
    }

    /// Build the [`EngineConfig`].
    ///
    /// A default page size above the maximum is lowered to the maximum.
    #[must_use]
    pub fn build(mut self) -> EngineConfig {
        let limits = &mut self.config.page_limits;
        limits.max_limit = limits.max_limit.max(1);
        limits.default_limit = limits.default_limit.clamp(1, limits.max_limit);
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_defaults() {
        assert_eq!(EngineConfig::builder().build(), EngineConfig::default());
    }

    #[test]
    fn default_page_size_is_clamped_to_max() {
        let config = EngineConfig::builder()
            .default_page_size(500)
            .max_page_size(50)
            .build();
        assert_eq!(config.page_limits.default_limit, 50);
        assert_eq!(config.page_limits.max_limit, 50);
    }
}
