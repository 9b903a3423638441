//! # api-adapters
//!
//! The HTTP surface of LunchBox. Handlers translate requests into service
//! calls and `DomainError`s into `{ "message": ... }` responses.

#[cfg(feature = "web-axum")]
pub mod error;
#[cfg(feature = "web-axum")]
pub mod extract;
#[cfg(feature = "web-axum")]
pub mod handlers;
#[cfg(feature = "web-axum")]
pub mod metrics;
#[cfg(feature = "web-axum")]
pub mod multipart;
#[cfg(feature = "web-axum")]
mod routes;
#[cfg(feature = "web-axum")]
pub mod state;

#[cfg(feature = "web-axum")]
pub use error::{ApiError, ApiResult};
#[cfg(feature = "web-axum")]
pub use routes::{router, HttpOptions};
#[cfg(feature = "web-axum")]
pub use state::{Adapters, AppState};
