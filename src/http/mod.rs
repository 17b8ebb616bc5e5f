//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID, request span)
//!     → security::rate_limit (per-address admission, /favicon only)
//!     → handlers.rs (favicon, health, fallback)
//!     → error.rs (structured JSON errors)
//!     → Send to client
//! ```

pub mod error;
pub mod handlers;
pub mod request;
pub mod server;

pub use error::{ApiError, ErrorBody};
pub use handlers::{FaviconResponse, HealthStatus};
pub use request::X_REQUEST_ID;
pub use server::HttpServer;
