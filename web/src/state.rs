//! Application state shared by all handlers.

use gathering_runtime::AttendanceEngine;
use sqlx::PgPool;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Generic over the engine's providers so the same router serves the
/// `PostgreSQL` deployment and the in-memory engine used in tests.
/// Cloning is cheap: the engine sits behind an `Arc` and the pool is
/// itself reference counted.
pub struct AppState<E, A, C, S, N> {
    /// Attendance engine
    pub engine: Arc<AttendanceEngine<E, A, C, S, N>>,

    /// Database pool pinged by the readiness probe, if there is one
    pub db: Option<PgPool>,
}

impl<E, A, C, S, N> AppState<E, A, C, S, N> {
    /// State over `engine` with no database to probe.
    #[must_use]
    pub fn new(engine: AttendanceEngine<E, A, C, S, N>) -> Self {
        Self {
            engine: Arc::new(engine),
            db: None,
        }
    }

    /// Attach the pool checked by `/ready`.
    #[must_use]
    pub fn with_database(mut self, pool: PgPool) -> Self {
        self.db = Some(pool);
        self
    }
}

impl<E, A, C, S, N> Clone for AppState<E, A, C, S, N> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            db: self.db.clone(),
        }
    }
}
