//! HTTP request handlers.
//!
//! Handlers are generic over the engine's providers and are instantiated
//! with turbofish in [`crate::router`].

pub mod attendance;
pub mod events;
pub mod health;
pub mod membership;

use crate::error::AppError;
use gathering_core::AttendanceError;
use std::str::FromStr;

/// Parse a path segment into a typed id.
///
/// A malformed UUID becomes a 400 `INVALID_ARGUMENT` body.
fn parse_id<T>(raw: &str) -> Result<T, AppError>
where
    T: FromStr<Err = AttendanceError>,
{
    raw.parse::<T>().map_err(AppError::from)
}
