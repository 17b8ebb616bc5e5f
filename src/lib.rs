//! Favicon resolver service library.
//!
//! Given a page URL, fetches the page and reports the absolute URL of its
//! favicon, refusing targets on loopback, private or link-local networks.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resolver;
pub mod security;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use resolver::FaviconResolver;
