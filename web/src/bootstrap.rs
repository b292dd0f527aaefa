//! Wiring the `PostgreSQL` providers into an engine.

use crate::config::{Config, NotificationSink, PostgresConfig};
use gathering_core::providers::{NotificationDispatcher, WaitlistPromotionNotice};
use gathering_core::{Result, SystemClock};
use gathering_postgres::{
    PostgresAttendanceRepository, PostgresCommunityDirectory, PostgresNotificationDispatcher,
    PostgresSupportDirectory,
};
use gathering_runtime::{AttendanceEngine, AttendanceEnvironment, TracingNotifier};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;

/// Engine over the `PostgreSQL` providers.
pub type PostgresEngine = AttendanceEngine<
    PostgresAttendanceRepository,
    PostgresAttendanceRepository,
    PostgresCommunityDirectory,
    PostgresSupportDirectory,
    ServerNotifier,
>;

/// Notification dispatcher chosen by [`NotificationSink`].
#[derive(Clone, Debug)]
pub enum ServerNotifier {
    /// Store notifications in the database
    Database(PostgresNotificationDispatcher),
    /// Log them
    Log(TracingNotifier),
}

impl NotificationDispatcher for ServerNotifier {
    async fn notify_waitlist_promotion(&self, notice: &WaitlistPromotionNotice) -> Result<()> {
        match self {
            Self::Database(dispatcher) => dispatcher.notify_waitlist_promotion(notice).await,
            Self::Log(dispatcher) => dispatcher.notify_waitlist_promotion(notice).await,
        }
    }
}

/// Open a connection pool.
///
/// # Errors
///
/// Returns error if the database cannot be reached within the connect timeout.
pub async fn connect(config: &PostgresConfig) -> std::result::Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout))
        .idle_timeout(Duration::from_secs(config.idle_timeout))
        .connect(&config.url)
        .await
}

/// Build the engine over `pool`.
#[must_use]
pub fn build_engine(pool: &PgPool, config: &Config) -> PostgresEngine {
    let notifier = match config.notifications {
        NotificationSink::Database => {
            ServerNotifier::Database(PostgresNotificationDispatcher::new(pool.clone()))
        }
        NotificationSink::Log => ServerNotifier::Log(TracingNotifier),
    };

    let attendance = PostgresAttendanceRepository::new(pool.clone());
    let env = AttendanceEnvironment::new(
        attendance.clone(),
        attendance,
        PostgresCommunityDirectory::new(pool.clone()),
        PostgresSupportDirectory::new(pool.clone()),
        notifier,
        Arc::new(SystemClock),
    );

    AttendanceEngine::new(env, config.engine.clone())
}
