//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Parse CLI → Load + validate config → Init logging/metrics → Bind → Serve
//!
//! Shutdown (shutdown.rs):
//!     SIGINT/SIGTERM → broadcast → server drains, sweeper stops → Exit
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
