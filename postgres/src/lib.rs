//! `PostgreSQL` providers for the Gathering attendance engine.
//!
//! Implements every provider trait from `gathering-core` on top of a shared
//! [`PgPool`]:
//!
//! - [`PostgresAttendanceRepository`]: events, attendance records, the
//!   attendee counter, and waitlist promotion
//! - [`PostgresCommunityDirectory`]: communities, memberships, bans, join requests
//! - [`PostgresSupportDirectory`]: support subscriptions
//! - [`PostgresNotificationDispatcher`]: the `notifications` table
//!
//! Every mutating attendance call runs in one transaction that starts with
//! `SELECT ... FOR UPDATE` on the event row, so callers racing on the same
//! event are serialized. Serialization failures and deadlocks surface as
//! [`AttendanceError::Conflict`](gathering_core::AttendanceError::Conflict)
//! for the engine to retry.
//!
//! # Example
//!
//! ```no_run
//! use gathering_postgres::{PostgresAttendanceRepository, migrate};
//! use sqlx::PgPool;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = PgPool::connect("postgres://localhost/gathering").await?;
//! migrate(&pool).await?;
//! let attendance = PostgresAttendanceRepository::new(pool);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod attendance;
mod community;
mod error;
mod notification;
mod rows;
mod support;

pub use attendance::PostgresAttendanceRepository;
pub use community::PostgresCommunityDirectory;
pub use notification::{PostgresNotificationDispatcher, WAITLIST_PROMOTED};
pub use support::PostgresSupportDirectory;

use gathering_core::error::{AttendanceError, Result};
use sqlx::PgPool;

/// Run the bundled schema migrations.
///
/// # Errors
///
/// Returns [`AttendanceError::DatabaseError`] if a migration fails.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| AttendanceError::DatabaseError(format!("Migration failed: {e}")))?;
    tracing::info!("Database migrations applied");
    Ok(())
}
