//! HTTP surface for the Gathering attendance engine.
//!
//! Handlers are thin: they parse the caller identity and path, call one
//! [`AttendanceEngine`](gathering_runtime::AttendanceEngine) operation, and
//! map [`AttendanceError`](gathering_core::AttendanceError) onto a status code
//! through [`AppError`].
//!
//! # Request Flow
//!
//! 1. **Correlation id** is read or generated by the middleware
//! 2. **Caller identity** comes from `X-User-Id` / `X-User-Role`
//! 3. **Engine call** runs eligibility and the atomic repository operation
//! 4. **Response** is the engine's result as JSON, or an error body
//!
//! # Example
//!
//! ```ignore
//! use gathering_web::{AppState, app_router};
//!
//! let state = AppState::new(engine).with_database(pool);
//! let app = app_router(state);
//! axum::serve(listener, app).await?;
//! ```

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use config::Config;
pub use error::AppError;
pub use extractors::{CallerIdentity, CallerRole, CorrelationId};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};
pub use router::{app_router, metrics_router};
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
