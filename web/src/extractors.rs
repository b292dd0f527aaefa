//! Custom Axum extractors.
//!
//! - [`CallerIdentity`]: the user and role asserted by the upstream gateway
//! - [`CorrelationId`]: request correlation id, set by the middleware or generated

use crate::error::AppError;
use crate::middleware::CORRELATION_ID_HEADER;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use gathering_core::UserId;
use serde::Serialize;
use std::str::FromStr;
use uuid::Uuid;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Header carrying the caller's role.
pub const USER_ROLE_HEADER: &str = "X-User-Role";

/// Role asserted for the caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallerRole {
    /// Regular community member
    #[default]
    Member,
    /// Event organizer
    Organizer,
    /// Platform administrator
    Admin,
}

impl CallerRole {
    /// Whether the role may manage events.
    #[must_use]
    pub const fn can_organize(self) -> bool {
        matches!(self, Self::Organizer | Self::Admin)
    }
}

impl FromStr for CallerRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "member" => Ok(Self::Member),
            "organizer" => Ok(Self::Organizer),
            "admin" => Ok(Self::Admin),
            other => Err(AppError::bad_request(format!("unknown role: {other}"))),
        }
    }
}

/// Caller identity from the `X-User-Id` and `X-User-Role` headers.
///
/// A missing user id is rejected with 401, a malformed one with 400.
/// A missing role means [`CallerRole::Member`].
///
/// # Example
///
/// ```ignore
/// async fn handler(caller: CallerIdentity) -> String {
///     format!("user {} as {:?}", caller.user_id, caller.role)
/// }
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallerIdentity {
    /// Authenticated user
    pub user_id: UserId,
    /// Asserted role
    pub role: CallerRole,
}

impl CallerIdentity {
    /// Require an organizer or admin role.
    ///
    /// # Errors
    ///
    /// Returns a 403 [`AppError`] for plain members.
    pub fn require_organizer(&self) -> Result<(), AppError> {
        if self.role.can_organize() {
            Ok(())
        } else {
            Err(AppError::forbidden("Organizer or admin role required"))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header_value(parts, USER_ID_HEADER)?
            .ok_or_else(|| AppError::unauthorized("Missing caller identity"))?
            .parse::<UserId>()?;

        let role = header_value(parts, USER_ROLE_HEADER)?
            .map(str::parse::<CallerRole>)
            .transpose()?
            .unwrap_or_default();

        Ok(Self { user_id, role })
    }
}

fn header_value<'a>(parts: &'a Parts, name: &str) -> Result<Option<&'a str>, AppError> {
    parts
        .headers
        .get(name)
        .map(|value| {
            value
                .to_str()
                .map_err(|_| AppError::bad_request(format!("{name} is not valid text")))
        })
        .transpose()
}

/// Correlation ID for request tracing.
///
/// Prefers the id stored by the correlation middleware, then the
/// `X-Correlation-ID` header, and generates a UUID v4 otherwise.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let correlation_id = parts
            .extensions
            .get::<Self>()
            .map(|id| id.0)
            .or_else(|| {
                parts
                    .headers
                    .get(CORRELATION_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| Uuid::parse_str(s).ok())
            })
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}
