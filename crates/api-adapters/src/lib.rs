//! crates/api-adapters/src/lib.rs
//!
//! The web orchestration layer: axum handlers coordinating the core
//! services, plus the broadcast notifier consumed by chat-facing
//! collaborators.

pub mod notify;

#[cfg(feature = "web-axum")]
mod error;
#[cfg(feature = "web-axum")]
mod extract;
#[cfg(feature = "web-axum")]
pub mod handlers;
#[cfg(feature = "web-axum")]
mod state;

#[cfg(feature = "web-axum")]
pub use error::{ApiError, ApiResult};
#[cfg(feature = "web-axum")]
pub use extract::SESSION_COOKIE;
#[cfg(feature = "web-axum")]
pub use handlers::router;
#[cfg(feature = "web-axum")]
pub use state::AppState;
