//! `sqlx` error mapping.

use gathering_core::error::AttendanceError;

/// SQLSTATE codes for aborts that are safe to retry.
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

/// Map a `sqlx` error into the domain error, prefixed with `context`.
///
/// Serialization failures and deadlocks become `Conflict`; everything else is
/// a `DatabaseError`.
pub fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> AttendanceError {
    move |err| {
        if is_retryable(&err) {
            AttendanceError::Conflict(format!("{context}: {err}"))
        } else {
            AttendanceError::DatabaseError(format!("{context}: {err}"))
        }
    }
}

fn is_retryable(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => matches!(
            db.code().as_deref(),
            Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED)
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_database_errors_are_not_conflicts() {
        let err = db_error("Failed to lock event")(sqlx::Error::RowNotFound);
        assert!(matches!(
            err,
            AttendanceError::DatabaseError(ref msg) if msg.starts_with("Failed to lock event")
        ));
    }

    #[test]
    fn pool_timeout_is_a_database_error() {
        let err = db_error("Failed to begin transaction")(sqlx::Error::PoolTimedOut);
        assert!(!err.is_retryable());
    }
}
